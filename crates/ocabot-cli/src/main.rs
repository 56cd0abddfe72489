use anyhow::Result;
use clap::Parser;
use ocabot_cli::{init_tracing, run_cli, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_cli(cli)
}
