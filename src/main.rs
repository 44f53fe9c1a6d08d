use clap::Parser;
use flow_eval::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Evaluate(args) => cli::evaluate::run(args).await,
        Command::Compare(args) => cli::compare::run(args).await,
        Command::Simulate(args) => cli::simulate::run(args).await,
    }
}
