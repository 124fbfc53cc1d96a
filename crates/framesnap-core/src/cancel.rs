use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

/// One-way "stop extracting" flag shared between the stream-stop observer
/// and the consumer loop. Once raised it stays raised.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    raised: Arc<AtomicBool>,
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    /// Raise the signal after `grace` has elapsed, from a timer thread.
    /// A zero grace raises immediately on the calling thread.
    pub fn raise_after(&self, grace: Duration) {
        if grace.is_zero() {
            self.raise();
            return;
        }
        let signal = self.clone();
        let spawned = thread::Builder::new()
            .name("framesnap-cancel".into())
            .spawn(move || {
                thread::sleep(grace);
                signal.raise();
            });
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "could not start grace timer, cancelling now");
            self.raise();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_raise_is_visible_to_clones() {
        let signal = CancellationSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_raised());
        signal.raise();
        assert!(observer.is_raised());
    }

    #[test]
    fn test_raise_after_waits_for_grace() {
        let signal = CancellationSignal::new();
        signal.raise_after(Duration::from_millis(50));
        assert!(!signal.is_raised());

        let deadline = Instant::now() + Duration::from_secs(5);
        while !signal.is_raised() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(signal.is_raised());
    }

    #[test]
    fn test_zero_grace_raises_immediately() {
        let signal = CancellationSignal::new();
        signal.raise_after(Duration::ZERO);
        assert!(signal.is_raised());
    }
}
