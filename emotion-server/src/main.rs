use clap::Parser;
use emotion_core::EmotionConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use emotion_server::http;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML config file; environment variables override it
    #[arg(short, long, default_value = "emotion.toml")]
    config: String,

    /// Probe the record store and exit
    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match EmotionConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let store = match emotion_core::build_store(&config).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        let ok = match store.ping().await {
            Ok(v) => {
                println!("✅ Record store reachable: {}", v);
                true
            }
            Err(e) => {
                println!("❌ Record store check failed: {}", e);
                false
            }
        };
        store.close().await;
        std::process::exit(if ok { 0 } else { 1 });
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        emotion_server::shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    let result = http::start_http_server(store.clone(), config, tx.subscribe()).await;
    if let Err(e) = &result {
        tracing::error!("HTTP server error: {}", e);
    }

    store.close().await;
    tracing::info!("Record store closed");

    result
}
