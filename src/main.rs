use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use framescribe::cli::commands::{self, RunOverrides, describe::DescribeOptions};
use framescribe::export::ExportFormat;
use framescribe::{DetailLevel, TreatmentMode};

#[derive(Parser)]
#[command(name = "framescribe")]
#[command(
    version,
    about = "Describe directories of images with a vision model, one by one or as overlapping sequences"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

/// Run settings shared by describe, estimate and plan
#[derive(Args, Clone)]
struct RunArgs {
    #[arg(help = "Directory of images (defaults to the last one used)")]
    source: Option<PathBuf>,
    #[arg(long, short, help = "Treatment mode: independent, sequential")]
    mode: Option<TreatmentMode>,
    #[arg(long, short, help = "Detail level: low, high, auto")]
    detail: Option<DetailLevel>,
    #[arg(long, short = 'l', help = "Images per window in sequential mode")]
    sequence_length: Option<usize>,
    #[arg(long, short = 'o', help = "Images shared by consecutive windows")]
    overlap: Option<usize>,
    #[arg(long, short, conflicts_with = "prompt_name", help = "Prompt text")]
    prompt: Option<String>,
    #[arg(long, short = 'n', help = "Name of a saved prompt")]
    prompt_name: Option<String>,
}

impl From<RunArgs> for RunOverrides {
    fn from(args: RunArgs) -> Self {
        Self {
            source: args.source,
            mode: args.mode,
            detail: args.detail,
            sequence_length: args.sequence_length,
            overlap: args.overlap,
            prompt: args.prompt,
            prompt_name: args.prompt_name,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Describe every image in a directory
    Describe {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long, short, help = "Skip the approval prompt")]
        yes: bool,
        #[arg(long, short, help = "Export format: json, markdown")]
        format: Option<ExportFormat>,
        #[arg(long, help = "Directory for the export file")]
        output: Option<PathBuf>,
    },

    /// Estimate token cost without sending anything
    Estimate {
        #[command(flatten)]
        run: RunArgs,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Show the units of work a run would dispatch
    Plan {
        #[command(flatten)]
        run: RunArgs,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Manage saved prompts
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum PromptsAction {
    /// List saved prompts
    List,
    /// Print a saved prompt
    Show { name: String },
    /// Save a prompt (named after its first sentence unless --name is given)
    Add {
        text: String,
        #[arg(long, short)]
        name: Option<String>,
    },
    /// Delete a saved prompt
    Remove { name: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'g', long, help = "Show global config file only")]
        global: bool,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Initialize configuration
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mframescribe encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Describe {
            run,
            yes,
            format,
            output,
        } => {
            commands::describe::run(DescribeOptions {
                run: run.into(),
                yes,
                format,
                output,
                quiet: cli.quiet,
            })?;
        }
        Commands::Estimate { run, format } => {
            commands::estimate::run(run.into(), &format)?;
        }
        Commands::Plan { run, format } => {
            commands::plan::run(run.into(), &format)?;
        }
        Commands::Prompts { action } => match action {
            PromptsAction::List => commands::prompts::list()?,
            PromptsAction::Show { name } => commands::prompts::show(&name)?,
            PromptsAction::Add { text, name } => commands::prompts::add(&text, name.as_deref())?,
            PromptsAction::Remove { name } => commands::prompts::remove(&name)?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { global, format } => {
                commands::config::show(global, &format)?;
            }
            ConfigAction::Path => {
                commands::config::path()?;
            }
            ConfigAction::Init { global, force } => {
                if global {
                    commands::config::init_global(force)?;
                } else {
                    commands::config::init_project(force)?;
                }
            }
        },
    }

    Ok(())
}
