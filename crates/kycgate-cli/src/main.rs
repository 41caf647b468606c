//! kycgate CLI: command-line client for a running kycgate node.
//!
//! Subcommands: start, document, liveness, face, compare, status, terminate.

mod client;
mod commands;

use clap::{Parser, Subcommand};

/// kycgate: identity verification orchestration.
#[derive(Parser, Debug)]
#[command(name = "kycgate", version, about, long_about = None)]
struct Cli {
    /// API endpoint of the node.
    #[arg(short, long, global = true, default_value = "http://127.0.0.1:8088")]
    endpoint: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a verification for a new subject.
    Start(commands::start::StartArgs),
    /// Submit identity document images.
    Document(commands::document::DocumentArgs),
    /// Evaluate liveness on a selfie image.
    Liveness(commands::liveness::LivenessArgs),
    /// Detect a face in an image.
    Face(commands::face::FaceArgs),
    /// Compare a detected face against a reference.
    Compare(commands::compare::CompareArgs),
    /// Show a subject's workflow status.
    Status(commands::status::StatusArgs),
    /// Delete a subject's verification data.
    Terminate(commands::terminate::TerminateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = client::ApiClient::new(&cli.endpoint);

    match &cli.command {
        Commands::Start(args) => commands::start::run(&client, args).await,
        Commands::Document(args) => commands::document::run(&client, args).await,
        Commands::Liveness(args) => commands::liveness::run(&client, args).await,
        Commands::Face(args) => commands::face::run(&client, args).await,
        Commands::Compare(args) => commands::compare::run(&client, args).await,
        Commands::Status(args) => commands::status::run(&client, args).await,
        Commands::Terminate(args) => commands::terminate::run(&client, args).await,
    }
}
