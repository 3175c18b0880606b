use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use noteai_client::{GenerationClient, NoteAiError, NoteAssistant};
use noteai_core::{GenerationConfig, GenerationError, GenerationRequest};
use serde_json::Value;
use std::io::Write;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{Cli, Commands, NoteInput, ParamArgs};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = GenerationConfig::from_env().context("failed to load configuration")?;
    info!(config = ?config, "starting noteai");

    let client = GenerationClient::gemini(config).context("failed to create client")?;
    #[cfg(feature = "redis")]
    let client = match &cli.redis_url {
        Some(url) => {
            let sink = noteai_client::RedisUsageSink::new(url).await;
            client.with_usage_sink(std::sync::Arc::new(sink))
        }
        None => client,
    };

    let (value, ok) = match cli.command {
        Commands::Health => {
            let result = client.health_check().await;
            let ok = result.is_healthy;
            let mut value = output::success(&result)?;
            value["success"] = Value::Bool(ok);
            (value, ok)
        }
        Commands::Generate { prompt, params } => {
            match client.generate_text(&request(prompt, params)).await {
                Ok(response) => (output::success(&response)?, true),
                Err(e) => (generation_failure(&e), false),
            }
        }
        Commands::Stream { prompt, params } => return stream(&client, prompt, params).await,
        Commands::Summarize(input) => {
            let content = read_note(&input)?;
            match NoteAssistant::new(client).summarize(&content).await {
                Ok(summary) => (output::success(&summary)?, true),
                Err(e) => (note_failure(&e), false),
            }
        }
        Commands::Tags(input) => {
            let content = read_note(&input)?;
            match NoteAssistant::new(client).generate_tags(&content).await {
                Ok(tags) => (output::success(&tags)?, true),
                Err(e) => (note_failure(&e), false),
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn request(prompt: String, params: ParamArgs) -> GenerationRequest {
    let mut request = GenerationRequest::new(prompt);
    request.max_tokens = params.max_tokens;
    request.temperature = params.temperature;
    request.top_p = params.top_p;
    request.top_k = params.top_k;
    request
}

/// Chunks go to stdout as they arrive; a failure is reported as JSON on stderr.
async fn stream(
    client: &GenerationClient,
    prompt: String,
    params: ParamArgs,
) -> anyhow::Result<ExitCode> {
    let mut chunks = match client.generate_text_stream(&request(prompt, params)).await {
        Ok(chunks) => chunks,
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&generation_failure(&e))?);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut stdout = std::io::stdout();
    while let Some(chunk) = chunks.next().await {
        match chunk {
            Ok(text) => {
                stdout.write_all(text.as_bytes())?;
                stdout.flush()?;
            }
            Err(e) => {
                writeln!(stdout)?;
                eprintln!("{}", serde_json::to_string_pretty(&generation_failure(&e))?);
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    writeln!(stdout)?;
    Ok(ExitCode::SUCCESS)
}

fn read_note(input: &NoteInput) -> anyhow::Result<String> {
    match &input.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => std::io::read_to_string(std::io::stdin()).context("failed to read stdin"),
    }
}

fn generation_failure(e: &GenerationError) -> Value {
    output::failure(e.message(), e.kind().code())
}

fn note_failure(e: &NoteAiError) -> Value {
    match e {
        NoteAiError::Generation(e) => generation_failure(e),
        other => output::failure(&other.to_string(), other.code()),
    }
}
