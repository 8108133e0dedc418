//! docbuddy - CLI entry point
//!
//! Loads one document, indexes it, then answers questions in a
//! readline loop until exit/quit.

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;
use std::time::Duration;

use docbuddy::config::RagConfig;
use docbuddy::document::{DocumentSource, PlainTextLoader};
use docbuddy::embedding::{Embedder, OllamaEmbedder};
use docbuddy::generation::{GeminiGenerator, Generator, OllamaGenerator};
use docbuddy::index::ScoringMode;
use docbuddy::session::RagSession;

/// docbuddy - Ask questions about any document from your terminal
#[derive(Parser, Debug)]
#[command(name = "docbuddy")]
#[command(version)]
#[command(about = "Ask questions about any document from your terminal", long_about = None)]
struct Args {
    /// Path to the document (UTF-8 text)
    #[arg(value_name = "DOCUMENT")]
    document: std::path::PathBuf,

    /// Ollama base URL (embeddings and local generation); overrides the
    /// config file
    #[arg(long)]
    ollama_url: Option<String>,

    /// Embedding model served by Ollama; overrides the config file
    #[arg(long)]
    embed_model: Option<String>,

    /// Generation model (Ollama model name, or Gemini model with --gemini-key)
    #[arg(short, long)]
    model: Option<String>,

    /// Gemini API key; uses the Gemini API instead of local Ollama
    /// (falls back to the GEMINI_API_KEY environment variable)
    #[arg(long)]
    gemini_key: Option<String>,

    /// Skip embeddings and rank chunks by lexical overlap instead
    #[arg(long)]
    lexical: bool,

    /// Number of chunks retrieved per question; overrides the config file
    #[arg(short = 'k', long)]
    top_k: Option<usize>,
}

/// Fold CLI flags into the loaded config; flags win, absent flags keep
/// the config file's values
fn apply_cli_overrides(config: &mut RagConfig, args: &Args) {
    if let Some(url) = &args.ollama_url {
        config.services.ollama_url = url.clone();
    }
    if let Some(model) = &args.embed_model {
        config.services.embed_model = model.clone();
    }
    if let Some(model) = &args.model {
        config.services.generate_model = model.clone();
    }
    if let Some(k) = args.top_k {
        config.retrieval.top_k = k;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = RagConfig::load().unwrap_or_default();
    apply_cli_overrides(&mut config, &args);

    let generator: Arc<dyn Generator> = match args
        .gemini_key
        .clone()
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
    {
        // The configured generate_model names a local Ollama model, so
        // Gemini takes only an explicit --model (else its own default)
        Some(key) => Arc::new(GeminiGenerator::new(
            key,
            args.model.clone(),
            config.generate_timeout(),
        )?),
        None => Arc::new(OllamaGenerator::new(
            Some(config.services.ollama_url.clone()),
            Some(config.services.generate_model.clone()),
            config.generate_timeout(),
        )?),
    };

    let embedder: Option<Arc<dyn Embedder>> = if args.lexical {
        None
    } else {
        Some(Arc::new(OllamaEmbedder::new(
            Some(config.services.ollama_url.clone()),
            Some(config.services.embed_model.clone()),
        )?))
    };

    println!(
        "{} {}",
        "Loading document:".cyan().bold(),
        args.document.display()
    );

    let session = RagSession::new(
        DocumentSource::path(&args.document),
        Arc::new(PlainTextLoader),
        embedder,
        generator,
        config,
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Chunking and embedding...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    match session.load().await {
        Ok(chunks) => {
            spinner.finish_and_clear();
            println!("{} {} chunks indexed.", "Ready:".green().bold(), chunks);
        }
        Err(err) => {
            spinner.finish_and_clear();
            eprintln!("{} {}", "Failed to index document:".red().bold(), err);
            std::process::exit(1);
        }
    }

    println!("\nAsk questions about the document (type 'exit' to quit):");

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline(">> ") {
            Ok(line) => {
                let question = line.trim();
                if question.is_empty() {
                    continue;
                }
                if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
                    break;
                }
                let _ = editor.add_history_entry(question);

                match session.ask(question).await {
                    Ok(answer) => {
                        println!("\n{}", "Answer:".green().bold());
                        println!("{}\n", answer.text);
                        if answer.mode == ScoringMode::LexicalOverlap {
                            println!(
                                "{}\n",
                                "(ranked by lexical overlap; no embedder configured)".dimmed()
                            );
                        }
                    }
                    Err(err) => {
                        eprintln!("\n{} {}\n", "Error:".red().bold(), err);
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} {}", "Input error:".red().bold(), err);
                break;
            }
        }
    }

    Ok(())
}
