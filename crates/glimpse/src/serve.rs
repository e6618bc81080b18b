// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `glimpse serve` command implementation.
//!
//! Wires the whole service together: SQLite ledger, Instagram session,
//! Telegram bot, the shared pipeline, and the periodic poll loop. Supports
//! graceful shutdown via signal handlers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use glimpse_config::GlimpseConfig;
use glimpse_core::{DeliveryChannel, GlimpseError};
use glimpse_instagram::InstagramClient;
use glimpse_pipeline::{Pipeline, PollLoop};
use glimpse_storage::{Database, queries};
use glimpse_telegram::StoryBot;
use glimpse_telegram::dispatcher::{BotState, run_dispatcher};
use tracing::{info, warn};

use crate::shutdown;

/// Runs the `glimpse serve` command.
pub async fn run_serve(config: GlimpseConfig) -> Result<(), GlimpseError> {
    init_tracing(&config.app.log_level, &config.app.log_path)?;

    info!(name = %config.app.name, "starting glimpse serve");

    let db = Database::open(&config.storage.database_path).await?;

    // Tracked accounts come from configuration; register them up front so
    // the ledger rows exist before the first cycle.
    for handle in &config.instagram.accounts {
        queries::accounts::ensure_account(&db, handle).await?;
    }

    let ig_username = config
        .instagram
        .username
        .clone()
        .ok_or_else(|| GlimpseError::Config("instagram.username is required for serve".into()))?;
    let ig_password = config
        .instagram
        .password
        .clone()
        .ok_or_else(|| GlimpseError::Config("instagram.password is required for serve".into()))?;

    let fetcher = Arc::new(InstagramClient::new(ig_username, ig_password)?);
    fetcher.login().await?;

    let bot_token = config
        .telegram
        .bot_token
        .as_deref()
        .ok_or_else(|| GlimpseError::Config("telegram.bot_token is required for serve".into()))?;
    let access_password = config
        .telegram
        .password
        .clone()
        .ok_or_else(|| GlimpseError::Config("telegram.password is required for serve".into()))?;

    let media_dir = PathBuf::from(&config.storage.media_dir);
    let story_bot = Arc::new(StoryBot::new(
        bot_token,
        media_dir.clone(),
        config.storage.temp_limit_mb,
    )?);
    let bot = story_bot.bot().clone();
    let channel: Arc<dyn DeliveryChannel> = story_bot;
    let pipeline = Arc::new(Pipeline::new(
        fetcher,
        db.clone(),
        config.instagram.accounts.clone(),
        media_dir.clone(),
    ));

    let shutdown = shutdown::install_signal_handler();

    let state = Arc::new(BotState::new(
        pipeline.clone(),
        channel.clone(),
        access_password,
        PathBuf::from(&config.app.log_path),
        media_dir,
        config.storage.temp_limit_mb,
    ));
    let dispatcher = tokio::spawn(run_dispatcher(bot, state, shutdown.clone()));

    let poll = PollLoop::new(
        pipeline,
        channel,
        Duration::from_secs(config.poll.interval_secs),
        shutdown.clone(),
    );
    info!(
        interval_secs = config.poll.interval_secs,
        accounts = config.instagram.accounts.len(),
        "poll loop starting"
    );
    poll.run().await;

    // The poll loop only returns once the shutdown token fired; wait for
    // the dispatcher to drain its long-polling connection too.
    if let Err(e) = dispatcher.await {
        warn!(error = %e, "dispatcher task did not exit cleanly");
    }

    db.close().await?;
    info!("glimpse stopped");
    Ok(())
}

/// Initializes tracing with a console layer and a plain-text file layer.
///
/// `RUST_LOG` overrides the configured level when set. The file layer feeds
/// the `/log` bot command, so it stays ANSI-free.
fn init_tracing(log_level: &str, log_path: &str) -> Result<(), GlimpseError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("glimpse={log_level},warn")));

    let path = Path::new(log_path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| GlimpseError::Config(format!("cannot create log directory: {e}")))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| GlimpseError::Config(format!("cannot open log file {log_path}: {e}")))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_names(false))
        .with(fmt::layer().with_ansi(false).with_writer(file))
        .init();

    Ok(())
}
