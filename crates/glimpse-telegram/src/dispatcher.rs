// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatcher for the Glimpse bot.
//!
//! Routes messages through a three-branch dptree handler: commands,
//! plain messages (only meaningful during the password handshake), and
//! inline keyboard callbacks. All ledger access goes through the shared
//! [`Pipeline`] so manual polls and the poll loop never double-deliver.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use glimpse_core::DeliveryChannel;
use glimpse_pipeline::{Pipeline, deliver_all};
use glimpse_storage::queries::recipients;
use metrics::counter;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use teloxide::utils::command::BotCommands;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::commands::{
    ALREADY_SUBSCRIBED, ASK_PASSWORD, Callback, Command, GREETING, NOT_SUBSCRIBED, SUBSCRIBED,
    WRONG_PASSWORD,
};

/// Shared state for all dispatcher endpoints.
pub struct BotState {
    pub pipeline: Arc<Pipeline>,
    pub channel: Arc<dyn DeliveryChannel>,
    pub password: String,
    pub log_path: PathBuf,
    pub media_dir: PathBuf,
    pub temp_limit_mb: u64,
    /// Chats that sent /subscribe and owe us a password next.
    pending_auth: Mutex<HashSet<i64>>,
}

impl BotState {
    pub fn new(
        pipeline: Arc<Pipeline>,
        channel: Arc<dyn DeliveryChannel>,
        password: String,
        log_path: PathBuf,
        media_dir: PathBuf,
        temp_limit_mb: u64,
    ) -> Self {
        Self {
            pipeline,
            channel,
            password,
            log_path,
            media_dir,
            temp_limit_mb,
            pending_auth: Mutex::new(HashSet::new()),
        }
    }
}

/// Runs long polling until the shutdown token fires.
///
/// Registers the command menu with Telegram first; a failure there is
/// logged and ignored since it only affects client-side autocompletion.
pub async fn run_dispatcher(bot: Bot, state: Arc<BotState>, shutdown: CancellationToken) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!(error = %e, "failed to register command menu");
    }

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .default_handler(|_| async {})
        .build();

    let token = dispatcher.shutdown_token();
    tokio::spawn(async move {
        shutdown.cancelled().await;
        if let Ok(stopped) = token.shutdown() {
            stopped.await;
        }
    });

    info!("starting Telegram long polling");
    dispatcher.dispatch().await;
    info!("Telegram dispatcher stopped");
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    counter!("glimpse_commands_total").increment(1);

    let subscribed = match recipients::is_recipient(state.pipeline.db(), chat_id).await {
        Ok(v) => v,
        Err(e) => {
            error!(chat_id, error = %e, "recipient lookup failed");
            false
        }
    };

    if !subscribed && !matches!(cmd, Command::Start | Command::Help | Command::Subscribe) {
        bot.send_message(msg.chat.id, NOT_SUBSCRIBED).await?;
        return Ok(());
    }

    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, GREETING).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
        Command::Subscribe => {
            if subscribed {
                bot.send_message(msg.chat.id, ALREADY_SUBSCRIBED).await?;
            } else {
                state.pending_auth.lock().await.insert(chat_id);
                bot.send_message(msg.chat.id, ASK_PASSWORD).await?;
            }
        }
        Command::Check => {
            let keyboard = handle_keyboard(state.pipeline.handles(), |h| Callback::Check {
                handle: h.to_string(),
            });
            bot.send_message(msg.chat.id, "Which account should I poll?")
                .reply_markup(keyboard)
                .await?;
        }
        Command::All => {
            let keyboard = handle_keyboard(state.pipeline.handles(), |h| Callback::All {
                handle: h.to_string(),
            });
            bot.send_message(msg.chat.id, "Whose stored stories should I resend?")
                .reply_markup(keyboard)
                .await?;
        }
        Command::Log => {
            let file = InputFile::file(state.log_path.clone());
            if let Err(e) = bot.send_document(msg.chat.id, file).await {
                warn!(error = %e, "could not send log file");
                bot.send_message(msg.chat.id, "The log file is not available right now.")
                    .await?;
            }
        }
        Command::Size => {
            let text = media_size_report(&state).await;
            bot.send_message(msg.chat.id, text).await?;
        }
    }

    Ok(())
}

/// Non-command messages only matter while a chat owes us a password.
async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    if !state.pending_auth.lock().await.remove(&chat_id) {
        let subscribed = recipients::is_recipient(state.pipeline.db(), chat_id)
            .await
            .unwrap_or(false);
        if !subscribed {
            bot.send_message(msg.chat.id, NOT_SUBSCRIBED).await?;
        }
        return Ok(());
    }

    let Some(attempt) = msg.text().map(|t| t.trim().to_string()) else {
        bot.send_message(msg.chat.id, WRONG_PASSWORD).await?;
        return Ok(());
    };

    // The password should not linger in the chat history.
    if let Err(e) = bot.delete_message(msg.chat.id, msg.id).await {
        warn!(chat_id, error = %e, "could not delete password message");
    }

    if attempt != state.password {
        debug!(chat_id, "password rejected");
        bot.send_message(msg.chat.id, WRONG_PASSWORD).await?;
        return Ok(());
    }

    match recipients::ensure_recipient(state.pipeline.db(), chat_id).await {
        Ok((_, created)) => {
            if created {
                counter!("glimpse_subscriptions_total").increment(1);
                info!(chat_id, "new recipient subscribed");
            }
            bot.send_message(msg.chat.id, SUBSCRIBED).await?;
            spawn_backfill(state.clone(), chat_id);
        }
        Err(e) => {
            error!(chat_id, error = %e, "failed to register recipient");
            bot.send_message(msg.chat.id, "Something went wrong, please try again later.")
                .await?;
        }
    }

    Ok(())
}

async fn handle_callback(bot: Bot, q: CallbackQuery, state: Arc<BotState>) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(chat) = q.message.as_ref().map(|m| m.chat().id) else {
        debug!("callback without an originating message");
        return Ok(());
    };
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let callback: Callback = match serde_json::from_str(data) {
        Ok(c) => c,
        Err(e) => {
            warn!(data, error = %e, "unparseable callback payload");
            return Ok(());
        }
    };

    match callback {
        Callback::Check { handle } => {
            match state.pipeline.check_account(&handle).await {
                Ok(tasks) if tasks.is_empty() => {
                    bot.send_message(chat, format!("No new stories from @{handle}."))
                        .await?;
                }
                Ok(tasks) => {
                    let new_count = tasks.first().map(|t| t.stories.len()).unwrap_or(0);
                    // Fans out to every recipient, same as the poll loop.
                    deliver_all(state.channel.as_ref(), &tasks).await;
                    bot.send_message(
                        chat,
                        format!("Delivered {new_count} new stories from @{handle}."),
                    )
                    .await?;
                }
                Err(e) => {
                    warn!(handle, error = %e, "manual poll failed");
                    bot.send_message(chat, format!("Could not poll @{handle}: {e}"))
                        .await?;
                }
            }
        }
        Callback::All { handle } => match state.pipeline.backlog(&handle).await {
            Ok(stories) if stories.is_empty() => {
                bot.send_message(chat, format!("Nothing stored for @{handle} yet."))
                    .await?;
            }
            Ok(stories) => {
                if let Err(e) = state.channel.send_group(chat.0, &handle, &stories).await {
                    warn!(handle, error = %e, "backlog delivery failed");
                }
            }
            Err(e) => {
                error!(handle, error = %e, "backlog read failed");
                bot.send_message(chat, format!("Could not read stored stories for @{handle}."))
                    .await?;
            }
        },
    }

    Ok(())
}

/// Sends the full stored history to a freshly subscribed chat.
fn spawn_backfill(state: Arc<BotState>, chat_id: i64) {
    tokio::spawn(async move {
        for handle in state.pipeline.handles().to_vec() {
            match state.pipeline.backlog(&handle).await {
                Ok(stories) if stories.is_empty() => {}
                Ok(stories) => {
                    if let Err(e) = state.channel.send_group(chat_id, &handle, &stories).await {
                        warn!(chat_id, handle = %handle, error = %e, "backfill delivery failed");
                    }
                }
                Err(e) => {
                    error!(handle = %handle, error = %e, "backfill read failed");
                }
            }
        }
        debug!(chat_id, "backfill finished");
    });
}

fn handle_keyboard(
    handles: &[String],
    payload: impl Fn(&str) -> Callback,
) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = handles
        .iter()
        .filter_map(|h| {
            let data = serde_json::to_string(&payload(h)).ok()?;
            Some(vec![InlineKeyboardButton::callback(format!("@{h}"), data)])
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

async fn media_size_report(state: &BotState) -> String {
    let dir = state.media_dir.clone();
    let size = tokio::task::spawn_blocking(move || glimpse_instagram::dir_size_mb(&dir)).await;

    match size {
        Ok(Ok(mb)) => {
            if mb > state.temp_limit_mb {
                format!(
                    "Media cache uses {mb} MB, over the {} MB limit. Consider clearing it.",
                    state.temp_limit_mb
                )
            } else {
                format!(
                    "Media cache uses {mb} MB of the {} MB limit.",
                    state.temp_limit_mb
                )
            }
        }
        Ok(Err(e)) => format!("Could not measure the media cache: {e}"),
        Err(e) => format!("Could not measure the media cache: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_has_one_row_per_handle() {
        let handles = vec!["alice".to_string(), "bob".to_string()];
        let keyboard = handle_keyboard(&handles, |h| Callback::All {
            handle: h.to_string(),
        });
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[0][0].text, "@alice");
    }
}
