//! Clausewise — contract analysis server and one-shot CLI.

use std::path::PathBuf;
use std::sync::Arc;

use clausewise_chat::LLMConfig;
use clausewise_core::{ExcerptConfig, ServerConfig};
use clausewise_runtime::{ContractAnalyzer, ResolvedInput};
use clausewise_server::{build_router, AppState};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn print_usage() {
    println!("Clausewise — contract analysis over a budgeted excerpt");
    println!();
    println!("Usage: clausewise [command]");
    println!();
    println!("Commands:");
    println!("  (none)                       Start the server");
    println!("  analyze <file> [question]    Analyze a PDF or text contract and print the result");
    println!("  help                         Show this help message");
}

fn build_analyzer(llm_config: &LLMConfig) -> anyhow::Result<ContractAnalyzer> {
    let excerpt_config = ExcerptConfig::from_env()?;
    Ok(ContractAnalyzer::from_config(excerpt_config, llm_config)?)
}

async fn analyze_file(path: PathBuf, question: Option<String>) -> anyhow::Result<()> {
    let llm_config = LLMConfig::from_env();
    let analyzer = build_analyzer(&llm_config)?;

    let document = clausewise_ingest::extract_file(&path)?;
    let outcome = analyzer
        .run(ResolvedInput {
            document,
            question,
            extracted: true,
        })
        .await?;

    println!("{}", outcome.result.formatted());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "analyze" => {
                if args.len() < 3 {
                    eprintln!("Usage: clausewise analyze <file> [question]");
                    std::process::exit(1);
                }
                let question = (args.len() > 3).then(|| args[3..].join(" "));
                return analyze_file(PathBuf::from(&args[2]), question).await;
            }
            "--help" | "-h" | "help" => {
                print_usage();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'clausewise help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    // Fail before binding when no provider is usable.
    let llm_config = LLMConfig::from_env();
    let analyzer = build_analyzer(&llm_config)?;
    let port = ServerConfig::from_env().port;

    let state = Arc::new(AppState::new(analyzer, llm_config));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Clausewise server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
