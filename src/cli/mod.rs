use clap::{Parser, Subcommand};

mod seed;
mod token;

#[derive(Debug, Parser)]
#[command(name = "poshak-app", about = "Marketplace CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Seed(seed::SeedArgs),
    Token(token::TokenCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Seed(args) => seed::run(args).await,
            Commands::Token(command) => token::run(command).await,
        }
    }
}
