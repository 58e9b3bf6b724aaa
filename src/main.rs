use anyhow::Result;
use clap::Parser;
use midjourney_plugin::app::App;
use midjourney_plugin::chat::{ChannelService, ConsoleChannel, MessageContext};
use midjourney_plugin::models::Config;
use midjourney_plugin::poller::BackgroundLoop;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Console host: every stdin line is treated as a chat message.
#[derive(Debug, Parser)]
#[command(name = "midjourney-plugin")]
#[command(about = "Drive the Midjourney chat plugin from a terminal")]
struct CliArgs {
    /// Session id attached to every message.
    #[arg(long, default_value = "console")]
    session_id: String,

    /// Enable the plugin regardless of MJ_ENABLED.
    #[arg(long)]
    enable: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "midjourney_plugin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let mut config = Config::from_env()?;
    if args.enable {
        config.enabled = true;
    }

    let background = BackgroundLoop::start()?;
    let channel = Arc::new(ConsoleChannel::new());
    let app = App::new(&config, channel.clone(), background.handle())?;

    info!("Reading messages from stdin as session {}", args.session_id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let ctx = MessageContext::text(line, args.session_id.clone());
        match app.handle(&ctx).await.reply {
            Some(reply) => channel.send(reply, &ctx).await?,
            None => info!("Not a plugin command: {}", line),
        }
    }

    info!(
        "stdin closed with {} tracked tasks, shutting down",
        app.registry().len()
    );
    Ok(())
}
