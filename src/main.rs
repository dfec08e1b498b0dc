use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lessonaudit::cli::Overrides;
use lessonaudit::cli::commands::{analyze, config, detect, transcribe};
use lessonaudit::pipeline::LessonMetadata;

#[derive(Parser)]
#[command(name = "lessonaudit")]
#[command(
    version,
    about = "Pedagogical quality and anti-bullying compliance analysis for lesson transcripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the rule-based checks only (no network)
    Detect {
        #[arg(help = "Transcript file (plain text)")]
        file: PathBuf,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
    },

    /// Run the full analysis pipeline
    Analyze {
        #[arg(help = "Transcript file (plain text)")]
        file: PathBuf,
        #[arg(long, help = "LLM provider (openai, ollama)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(long, help = "Self-consistency samples for scoring (1-5, >1 enables it)")]
        samples: Option<usize>,
        #[arg(long = "no-enrichment", help = "Skip the best-effort enrichment outputs")]
        no_enrichment: bool,
        #[arg(long, help = "Competency list (JSON) for curriculum matching")]
        curriculum: Option<PathBuf>,
        #[arg(long, help = "Lesson title")]
        title: Option<String>,
        #[arg(long, help = "Lesson subject")]
        subject: Option<String>,
        #[arg(long, help = "Grade level")]
        grade: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
        #[arg(long, short, help = "Write the JSON report to a file")]
        output: Option<PathBuf>,
    },

    /// Transcribe a lesson recording
    Transcribe {
        #[arg(help = "Audio file (mp3, wav, m4a, ogg, webm, flac)")]
        audio: PathBuf,
        #[arg(long, short, help = "Spoken language hint (ISO-639-1)")]
        language: Option<String>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
        #[arg(long, short, help = "Write the transcript to a file")]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
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
        eprintln!("\x1b[31mlessonaudit encountered an unexpected error:\x1b[0m");
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

        // Backtrace when RUST_BACKTRACE=1
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
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Detect { file, format } => {
            detect::run(&file, &format)?;
        }
        Commands::Analyze {
            file,
            provider,
            model,
            samples,
            no_enrichment,
            curriculum,
            title,
            subject,
            grade,
            format,
            output,
        } => {
            analyze::run(analyze::AnalyzeOptions {
                path: file,
                overrides: Overrides {
                    provider,
                    model,
                    samples,
                    no_enrichment,
                },
                metadata: LessonMetadata {
                    title,
                    subject,
                    grade,
                },
                curriculum,
                format,
                output,
            })?;
        }
        Commands::Transcribe {
            audio,
            language,
            format,
            output,
        } => {
            transcribe::run(&audio, language.as_deref(), &format, output)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => config::show(&format)?,
            ConfigAction::Path => config::path()?,
            ConfigAction::Init { global, force } => config::init(global, force)?,
        },
    }

    Ok(())
}
