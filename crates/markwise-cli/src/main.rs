//! markwise CLI — grade answers and report student progress.

use std::path::PathBuf;
use std::process;

use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "markwise",
    version,
    about = "Answer grading and progress analytics engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade one answer against a reference answer
    Grade {
        /// The question that was asked
        #[arg(long)]
        question: String,

        /// The student's answer
        #[arg(long)]
        answer: String,

        /// The model answer to grade against
        #[arg(long)]
        reference: String,

        /// Subject the question belongs to
        #[arg(long)]
        subject: String,

        /// Student identifier
        #[arg(long)]
        student: String,

        /// Question identifier
        #[arg(long)]
        question_id: String,

        /// Optional topic within the subject
        #[arg(long)]
        topic: Option<String>,

        /// Seconds the student spent answering
        #[arg(long, default_value = "0")]
        time_spent: u64,

        /// Judge to use (a key under [judges] in the config)
        #[arg(long)]
        judge: Option<String>,

        /// Model the judge should use
        #[arg(long)]
        model: Option<String>,

        /// History file to append the graded answer to
        #[arg(long)]
        history: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show a student's progress dashboard
    Progress {
        /// History file to read, defaults to `history_path` from the config
        #[arg(long)]
        history: Option<PathBuf>,

        /// Student identifier
        #[arg(long)]
        student: String,

        /// Maximum number of recommendations
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Reference instant (RFC 3339), defaults to now
        #[arg(long)]
        as_of: Option<DateTime<Utc>>,

        /// Student's local offset from UTC (e.g. +05:30, -08:00) for weeks,
        /// days and time-of-day windows
        #[arg(long, allow_hyphen_values = true)]
        utc_offset: Option<FixedOffset>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List configured judges
    ListJudges {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("markwise=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Grade {
            question,
            answer,
            reference,
            subject,
            student,
            question_id,
            topic,
            time_spent,
            judge,
            model,
            history,
            config,
            format,
        } => {
            commands::grade::execute(commands::grade::GradeArgs {
                question,
                answer,
                reference,
                subject,
                student,
                question_id,
                topic,
                time_spent,
                judge,
                model,
                history,
                config,
                format,
            })
            .await
        }
        Commands::Progress {
            history,
            student,
            limit,
            as_of,
            utc_offset,
            config,
            format,
        } => commands::progress::execute(commands::progress::ProgressArgs {
            history,
            student,
            limit,
            as_of,
            utc_offset,
            config,
            format,
        }),
        Commands::ListJudges { config } => commands::list_judges::execute(config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
