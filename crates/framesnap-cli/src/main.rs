use anyhow::Result;
use clap::Parser;

use framesnap_cli::{Cli, init_logging, render_outcome, run};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config(|key| std::env::var(key).ok())?;
    init_logging(&config.log_level);

    let outcome = run(config, cli.profile)
        .inspect_err(|err| tracing::error!(error = %format!("{err:#}"), "extraction failed"))?;
    let text = render_outcome(&outcome);
    if !text.is_empty() {
        println!("{text}");
    }
    Ok(())
}
