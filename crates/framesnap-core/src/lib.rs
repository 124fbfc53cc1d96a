pub mod buffer;
pub mod cancel;
pub mod capture;
pub mod config;
pub mod error;
pub mod geometry;
pub mod handoff;
pub mod sampler;
pub mod source;
