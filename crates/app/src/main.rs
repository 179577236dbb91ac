use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

use brovox_app::runtime;
use brovox_app::settings::Settings;
use brovox_wake::Language;

#[derive(Parser, Debug)]
#[command(name = "brovox", about = "Voice assistant core: wake word, commands, speech")]
struct Cli {
    /// Path to the settings file
    #[arg(long, default_value = "brovox.toml")]
    config: PathBuf,

    /// Override the language preference for this run
    #[arg(long, value_enum)]
    language: Option<CliLanguage>,

    /// Start with responses muted
    #[arg(long)]
    muted: bool,

    /// Disable the espeak backend even when available
    #[arg(long)]
    no_espeak: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CliLanguage {
    English,
    Hinglish,
}

fn init_logging() -> Result<()> {
    std::fs::create_dir_all("logs")?;
    let file_appender = RollingFileAppender::new(Rotation::DAILY, "logs", "brovox.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_writer(std::io::stdout.and(non_blocking_file))
        .with_env_filter(log_level)
        .init();
    std::mem::forget(guard);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config)?;
    if let Some(language) = cli.language {
        settings.language = match language {
            CliLanguage::English => Language::English,
            CliLanguage::Hinglish => Language::Hinglish,
        };
    }
    if cli.muted {
        settings.start_muted = true;
    }
    if cli.no_espeak {
        settings.espeak = false;
    }

    tracing::info!("Starting BroVox (type transcripts on stdin, Ctrl+C to quit)");
    let handle = runtime::start(settings).await?;

    runtime::AppHandle::wait_for_shutdown_signal().await;
    handle.shutdown().await;
    Ok(())
}
