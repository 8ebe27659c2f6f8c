use crate::demo::{run_decide, run_demo, DecideArgs, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use loan_engine::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Loan Decision Engine",
    about = "Serve, exercise, and demonstrate automated loan decisions from the command line",
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
    /// Decide a single request read from JSON and print the decision
    Decide(DecideArgs),
    /// Run an end-to-end CLI demo covering decisions, review, and lifecycle transitions
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Decide(args) => run_decide(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["loan-engine-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn decide_accepts_inline_json() {
        let cli = Cli::try_parse_from(["loan-engine-api", "decide", "--request", "{}"])
            .expect("parses");
        match cli.command {
            Some(Command::Decide(args)) => assert_eq!(args.request.as_deref(), Some("{}")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn decide_requires_a_request_source() {
        assert!(Cli::try_parse_from(["loan-engine-api", "decide"]).is_err());
    }
}
