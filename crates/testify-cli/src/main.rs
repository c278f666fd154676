//! testify CLI — take, score, validate, and build multiple-choice exams.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use testify_core::model::Mode;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "testify", version, about = "Timed multiple-choice exam runner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take an exam interactively (reads commands from stdin)
    Take {
        /// Path to the exam JSON document
        #[arg(long)]
        exam: PathBuf,

        /// Session mode: exam or practice (default from config)
        #[arg(long)]
        mode: Option<Mode>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Report output directory (default from config)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Score a recorded answers file against an exam
    Score {
        /// Path to the exam JSON document
        #[arg(long)]
        exam: PathBuf,

        /// Answers JSON: {"<section>": ["A", null, ...]}
        #[arg(long)]
        answers: PathBuf,

        /// Report output directory (default from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: text, json, all
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate an exam document
    Validate {
        /// Path to the exam JSON document
        #[arg(long)]
        exam: PathBuf,
    },

    /// Build or edit an exam document (reads commands from stdin)
    Build {
        /// Existing exam to start from
        #[arg(long)]
        from: Option<PathBuf>,

        /// Where `save` writes the exam
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example exam
    Init,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("testify=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            exam,
            mode,
            config,
            output,
        } => commands::take::execute(exam, mode, config, output),
        Commands::Score {
            exam,
            answers,
            output,
            format,
            config,
        } => commands::score::execute(exam, answers, output, format, config),
        Commands::Validate { exam } => commands::validate::execute(exam),
        Commands::Build {
            from,
            output,
            config,
        } => commands::build::execute(from, output, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
