use anyhow::Result;
use clap::{Parser, Subcommand};
use ragdash::commands::{CorpusKind, ask, clinic, load, show_status};
use ragdash::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "ragdash")]
#[command(about = "Retrieval-augmented question answering over local corpora")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama and chat service settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Answer a question against the article corpus
    Ask {
        /// The question to answer
        question: String,
        /// How many similar articles to retrieve
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate doctor notes from similar patient cases
    Clinic {
        /// Free-text description of the presenting case
        question: String,
        /// How many similar cases to retrieve
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Load a JSON corpus file into the stores
    Load {
        /// Which corpus the file belongs to
        #[arg(value_enum)]
        corpus: CorpusKind,
        /// Path to the JSON corpus file
        file: String,
    },
    /// Show store sizes and service reachability
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
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
        Commands::Ask { question, limit } => {
            ask(&question, limit).await?;
        }
        Commands::Clinic { question, limit } => {
            clinic(&question, limit).await?;
        }
        Commands::Load { corpus, file } => {
            load(corpus, &file).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn cli_parsing() {
        let cli = Cli::try_parse_from(["ragdash", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            matches!(parsed.command, Commands::Status);
        }
    }

    #[test]
    fn ask_command_with_question() {
        let cli = Cli::try_parse_from(["ragdash", "ask", "What is diabetes?"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question, limit } = parsed.command {
                assert_eq!(question, "What is diabetes?");
                assert_eq!(limit, None);
            }
        }
    }

    #[test]
    fn clinic_command_with_limit() {
        let cli = Cli::try_parse_from(["ragdash", "clinic", "fever and cough", "--limit", "8"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Clinic { question, limit } = parsed.command {
                assert_eq!(question, "fever and cough");
                assert_eq!(limit, Some(8));
            }
        }
    }

    #[test]
    fn load_command_requires_a_known_corpus() {
        let cli = Cli::try_parse_from(["ragdash", "load", "articles", "corpus.json"]);
        assert!(cli.is_ok());

        let cli = Cli::try_parse_from(["ragdash", "load", "recipes", "corpus.json"]);
        assert!(cli.is_err());
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["ragdash", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["ragdash", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["ragdash", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
