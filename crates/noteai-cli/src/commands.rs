use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "noteai",
    author,
    version,
    about = "Probe the NoteAI generation client",
    long_about = None
)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Push usage records to this Redis instance
    #[cfg(feature = "redis")]
    #[arg(long, env = "NOTEAI_REDIS_URL", global = true)]
    pub redis_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the provider answers a trivial prompt
    Health,

    /// Generate text for a prompt
    Generate {
        prompt: String,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Stream generated text to stdout as it arrives
    Stream {
        prompt: String,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Summarize a note read from a file or stdin
    Summarize(NoteInput),

    /// Suggest tags for a note read from a file or stdin
    Tags(NoteInput),
}

#[derive(Args, Debug, Clone, Copy, Default)]
pub struct ParamArgs {
    /// Maximum output tokens (defaults to GEMINI_MAX_TOKENS)
    #[arg(long)]
    pub max_tokens: Option<u32>,

    #[arg(long)]
    pub temperature: Option<f64>,

    #[arg(long)]
    pub top_p: Option<f64>,

    #[arg(long)]
    pub top_k: Option<u32>,
}

#[derive(Args, Debug)]
pub struct NoteInput {
    /// Read the note from this file instead of stdin
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate_params() {
        let cli = Cli::parse_from([
            "noteai",
            "generate",
            "Hello",
            "--max-tokens",
            "500",
            "--temperature",
            "0.2",
            "--top-k",
            "10",
        ]);
        match cli.command {
            Commands::Generate { prompt, params } => {
                assert_eq!(prompt, "Hello");
                assert_eq!(params.max_tokens, Some(500));
                assert_eq!(params.temperature, Some(0.2));
                assert_eq!(params.top_p, None);
                assert_eq!(params.top_k, Some(10));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_note_input() {
        let cli = Cli::parse_from(["noteai", "-v", "tags", "--file", "note.md"]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Tags(input) => assert_eq!(input.file, Some(PathBuf::from("note.md"))),
            other => panic!("unexpected {:?}", other),
        }

        let cli = Cli::parse_from(["noteai", "summarize"]);
        assert!(matches!(cli.command, Commands::Summarize(NoteInput { file: None })));
    }
}
