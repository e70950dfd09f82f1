use anyhow::Result;
use clap::Parser;
use optrel::cli::{cmd_infer, Command, RootArgs};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    match args.command {
        Command::Infer(infer) => cmd_infer(&infer),
    }
}
