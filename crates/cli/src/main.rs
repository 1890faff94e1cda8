use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use namematch_model::LogReporter;
use std::path::PathBuf;
use std::process::ExitCode;

mod app;

use app::App;

#[derive(Parser)]
#[command(name = "namematch")]
#[command(about = "Swipe baby names and match likes with a partner", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory for this device's local state (seen names, preferences)
    #[arg(long, global = true, default_value = ".namematch")]
    data_dir: PathBuf,

    /// Directory holding the shared connection collection. Point two
    /// data-dirs at the same remote-dir to pair two devices on one machine.
    #[arg(long, global = true)]
    remote_dir: Option<PathBuf>,

    /// Directory with the yob{year}.txt corpus files
    #[arg(long, global = true, default_value = "corpus")]
    corpus_dir: PathBuf,

    /// Use the testing collection instead of the production one
    #[arg(long, global = true)]
    testing: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show filtered name candidates you have not decided on yet
    Suggest(SuggestArgs),

    /// Record a like or pass for a name
    Swipe(SwipeArgs),

    /// Reverse a previous decision
    Reverse(NameArgs),

    /// Show your decision history and matches
    Seen,

    /// Show or change candidate filters
    #[command(subcommand)]
    Filters(FiltersCommand),

    /// Manage the connection with your partner
    #[command(subcommand)]
    Connection(ConnectionCommand),
}

#[derive(Args)]
struct SuggestArgs {
    /// Maximum number of candidates to print
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Args)]
struct SwipeArgs {
    /// The name being decided
    name: String,

    /// Gender code, M or F
    #[arg(value_parser = parse_gender_code)]
    gender: String,

    /// Like the name
    #[arg(long, conflicts_with = "pass")]
    like: bool,

    /// Pass on the name
    #[arg(long)]
    pass: bool,
}

#[derive(Args)]
struct NameArgs {
    name: String,

    /// Gender code, M or F
    #[arg(value_parser = parse_gender_code)]
    gender: String,
}

#[derive(Subcommand)]
enum FiltersCommand {
    /// Print the current filter selections
    Show,

    /// Change filter selections
    Set(SetFiltersArgs),
}

#[derive(Args)]
struct SetFiltersArgs {
    /// Gender filter: M, F, or both
    #[arg(long)]
    gender: Option<String>,

    /// Required name prefix (case-insensitive); pass an empty string to clear
    #[arg(long)]
    starts_with: Option<String>,

    /// Maximum name length; pass "none" to clear
    #[arg(long)]
    max_length: Option<String>,

    /// Year-range preset: current-year, 1800s, 1900s, 2000s, or a year
    #[arg(long)]
    period: Option<String>,

    /// Candidate ordering: random or popular
    #[arg(long)]
    sort: Option<String>,
}

#[derive(Subcommand)]
enum ConnectionCommand {
    /// Create a connection and print the code to share
    Create {
        /// Family name shown alongside matches
        #[arg(long)]
        family_name: Option<String>,
    },

    /// Join a partner's connection by code
    Join {
        code: String,

        /// Family name shown alongside matches
        #[arg(long)]
        family_name: Option<String>,
    },

    /// Show the current connection state
    Status,

    /// Follow connection updates until interrupted
    Watch,

    /// Delete the connection for both sides
    Delete,

    /// Mark all matches as read for this device
    MarkRead,
}

fn parse_gender_code(raw: &str) -> std::result::Result<String, String> {
    match raw {
        "M" | "m" | "male" => Ok("M".to_string()),
        "F" | "f" | "female" => Ok("F".to_string()),
        _ => Err(format!("unknown gender code '{raw}', expected M or F")),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else if quiet {
        log::LevelFilter::Warn
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            use namematch_model::FailureReporter;
            LogReporter.record("namematch", &format!("{err:#}"));
            eprintln!("Something went wrong. Re-run with --verbose for details.");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let remote_dir = cli
        .remote_dir
        .clone()
        .unwrap_or_else(|| cli.data_dir.join("remote"));
    let app = App::open(&cli.data_dir, &remote_dir, &cli.corpus_dir, cli.testing).await?;

    match cli.command {
        Commands::Suggest(args) => app.suggest(args.limit).await,
        Commands::Swipe(args) => {
            if !args.like && !args.pass {
                anyhow::bail!("pass --like or --pass");
            }
            app.swipe(&args.name, &args.gender, args.like).await
        }
        Commands::Reverse(args) => app.reverse(&args.name, &args.gender).await,
        Commands::Seen => app.seen_overview().await,
        Commands::Filters(FiltersCommand::Show) => app.show_filters().await,
        Commands::Filters(FiltersCommand::Set(args)) => {
            app.set_filters(
                args.gender.as_deref(),
                args.starts_with.as_deref(),
                args.max_length.as_deref(),
                args.period.as_deref(),
                args.sort.as_deref(),
            )
            .await
        }
        Commands::Connection(ConnectionCommand::Create { family_name }) => {
            app.create_connection(family_name.as_deref()).await
        }
        Commands::Connection(ConnectionCommand::Join { code, family_name }) => {
            app.join_connection(&code, family_name.as_deref()).await
        }
        Commands::Connection(ConnectionCommand::Status) => app.connection_status().await,
        Commands::Connection(ConnectionCommand::Watch) => app.watch_connection().await,
        Commands::Connection(ConnectionCommand::Delete) => app.delete_connection().await,
        Commands::Connection(ConnectionCommand::MarkRead) => app.mark_matched_read().await,
    }
}
