use crate::demo::{
    run_demo, run_evaluate, run_pack_verify, run_transcript, DemoArgs, EvaluateArgs, RulesArgs,
    TranscriptArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use otc_flow::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "otc-flow-api",
    about = "Run and exercise the OTC Flow pharmacy decision support service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate an intake file against one rule pack
    Evaluate(EvaluateArgs),
    /// Extract intake suggestions from a consultation transcript
    Transcript(TranscriptArgs),
    /// Inspect the signed rule bundle
    Packs {
        #[command(subcommand)]
        command: PacksCommand,
    },
    /// Run the bundled sample transcripts through extraction and evaluation
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum PacksCommand {
    /// Verify the manifest signature and checksums, then list the packs
    Verify(RulesArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the rule bundle directory or URL
    #[arg(long)]
    pub(crate) rules: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Evaluate(args) => run_evaluate(args).await,
        Command::Transcript(args) => run_transcript(args).await,
        Command::Packs {
            command: PacksCommand::Verify(args),
        } => run_pack_verify(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
