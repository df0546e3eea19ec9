use anyhow::Context;
use clap::{Parser, Subcommand};
use course_ta::Result;
use course_ta::commands::{
    DEFAULT_FORUM_URL, DEFAULT_NOTES_BASE_URL, MergeInput, ask, build_corpus_file, grep_corpus,
    merge_corpus_files, migrate_corpus_file, migrated_path, show_status,
};
use course_ta::config::{Config, run_interactive_config, show_config};
use course_ta::corpus::Source;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "course-ta")]
#[command(about = "Answer course questions from forum posts and course notes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Chunk and embed forum posts and course notes into a corpus file
    Build {
        /// Scraped forum posts JSON file
        #[arg(long)]
        posts: Vec<PathBuf>,
        /// Course notes text file
        #[arg(long)]
        notes: Vec<PathBuf>,
        /// URL the course notes are published under
        #[arg(long, default_value = DEFAULT_NOTES_BASE_URL)]
        base_url: String,
        /// Output corpus file, defaults to the configured corpus path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Convert a corpus file with legacy `chunk` records to the current format
    Migrate {
        input: PathBuf,
        /// Output file, defaults to `<input>_fixed.json`
        #[arg(long)]
        output: Option<PathBuf>,
        /// URL for records without one
        #[arg(long, default_value = DEFAULT_FORUM_URL)]
        default_url: String,
    },
    /// Concatenate corpus files
    Merge {
        /// Corpus files merged as they are
        inputs: Vec<PathBuf>,
        /// Corpus files whose untagged records come from the course notes.
        /// Records already tagged keep their tag.
        #[arg(long)]
        course: Vec<PathBuf>,
        /// Corpus files whose untagged records come from the forum. Records
        /// already tagged `course` or `discourse` keep their tag.
        #[arg(long)]
        discourse: Vec<PathBuf>,
        #[arg(long)]
        output: PathBuf,
    },
    /// Ask a question
    Ask {
        question: String,
        /// Screenshot of the question
        #[arg(long)]
        image: Option<PathBuf>,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// List corpus chunks containing a term
    Grep {
        term: String,
        /// Corpus file, defaults to the configured corpus path
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Show configuration, Ollama health and corpus statistics
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Build {
            posts,
            notes,
            base_url,
            output,
        } => {
            let config = Config::load_default()?;
            build_corpus_file(&config, &posts, &notes, &base_url, output.as_deref())?;
        }
        Commands::Migrate {
            input,
            output,
            default_url,
        } => {
            let output = output.unwrap_or_else(|| migrated_path(&input));
            migrate_corpus_file(&input, &output, &default_url)?;
        }
        Commands::Merge {
            inputs,
            course,
            discourse,
            output,
        } => {
            let inputs = merge_inputs(course, discourse, inputs);
            if inputs.is_empty() {
                println!("No corpus files to merge.");
                return Ok(());
            }
            merge_corpus_files(&inputs, &output)?;
        }
        Commands::Ask {
            question,
            image,
            json,
        } => {
            let config = Config::load_default()?;
            ask(&config, &question, image.as_deref(), json)?;
        }
        Commands::Grep { term, corpus } => {
            let path = match corpus {
                Some(path) => path,
                None => Config::load_default()
                    .context("Failed to load configuration")?
                    .corpus_path(),
            };
            grep_corpus(&path, &term)?;
        }
        Commands::Status => {
            let config = Config::load_default()?;
            show_status(&config)?;
        }
    }

    Ok(())
}

/// Course files first, then forum files, then untagged files
fn merge_inputs(
    course: Vec<PathBuf>,
    discourse: Vec<PathBuf>,
    untagged: Vec<PathBuf>,
) -> Vec<MergeInput> {
    let tagged = |paths: Vec<PathBuf>, source: Option<Source>| {
        paths
            .into_iter()
            .map(move |path| MergeInput { path, source })
    };

    tagged(course, Some(Source::Course))
        .chain(tagged(discourse, Some(Source::Discourse)))
        .chain(tagged(untagged, None))
        .collect()
}
