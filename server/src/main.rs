use anyhow::Result;
use axum::Router;
use clap::Parser;
use invidx_core::{Normalizer, Stopwords};
use server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Batch directory path
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Stopword list, one term per line (defaults to the built-in English list)
    #[arg(long)]
    stopwords: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let stopwords = match &args.stopwords {
        Some(path) => Stopwords::from_file(path)?,
        None => Stopwords::english(),
    };
    let app: Router = build_app(args.index.clone(), Normalizer::new(stopwords))?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
