use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod engine;
mod engines;
mod error;
mod ocr;
mod preprocessing;
mod server;
mod translation;

#[derive(Parser, Debug)]
#[command(name = "ocr-translate-server")]
#[command(about = "OCR server with image cleanup and optional translation to English")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "OCR_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "OCR_PORT", default_value = "5000")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 16MB)
    #[arg(long, env = "OCR_MAX_FILE_SIZE", default_value = "16777216")]
    pub max_file_size: usize,

    /// OCR engine to use ("tesseract", or "tesseract-static" when built with that feature)
    #[arg(long, env = "OCR_ENGINE", default_value = config::DEFAULT_ENGINE)]
    pub engine: String,

    /// Tesseract language models, joined with '+'
    #[arg(long, env = "OCR_LANGUAGES", default_value = config::DEFAULT_LANGUAGES)]
    pub languages: String,

    /// Tesseract executable used by the "tesseract" engine
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    pub tesseract_cmd: String,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Fixed binarization threshold, used when Otsu is disabled
    #[arg(long, env = "OCR_BINARY_THRESHOLD", default_value = "150")]
    pub binary_threshold: u8,

    /// Disable Otsu's automatic threshold selection
    #[arg(long, env = "OCR_NO_OTSU")]
    pub no_otsu: bool,

    /// Non-local-means filter strength (h)
    #[arg(long, env = "OCR_DENOISE_STRENGTH", default_value = "10")]
    pub denoise_strength: f32,

    /// Non-local-means template (patch) window size, odd
    #[arg(long, env = "OCR_TEMPLATE_WINDOW", default_value = "7")]
    pub template_window: u32,

    /// Non-local-means search window size, odd
    #[arg(long, env = "OCR_SEARCH_WINDOW", default_value = "21")]
    pub search_window: u32,

    /// Translation endpoint
    #[arg(long, env = "TRANSLATE_ENDPOINT", default_value = config::DEFAULT_TRANSLATE_ENDPOINT)]
    pub translate_endpoint: String,

    /// Client identifier sent to the translation endpoint
    #[arg(long, env = "TRANSLATE_CLIENT", default_value = "gtx")]
    pub translate_client: String,

    /// Timeout for the translation request in seconds
    #[arg(long, env = "TRANSLATE_TIMEOUT_SECS", default_value = "10")]
    pub translate_timeout_secs: u64,

    /// Language recognized text is translated into
    #[arg(long, env = "TRANSLATE_TARGET", default_value = "en")]
    pub target_language: String,

    /// Never call the translation endpoint
    #[arg(long, env = "TRANSLATE_DISABLED")]
    pub disable_translation: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from(args);
    config.validate()?;

    tracing::info!(
        "Starting ocr-translate-server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!("Binding to {}:{}", config.host, config.port);

    server::run(config).await
}
