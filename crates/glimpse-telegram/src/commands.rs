// SPDX-FileCopyrightText: 2026 Glimpse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot command surface and reply texts.

use serde::{Deserialize, Serialize};
use teloxide::utils::command::BotCommands;

/// Commands the bot understands.
///
/// `start`, `help`, and `subscribe` work for any chat; everything else
/// requires the chat to be a subscribed recipient.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "greet and show what this bot does.")]
    Start,
    #[command(description = "show this help text.")]
    Help,
    #[command(description = "subscribe this chat to story updates.")]
    Subscribe,
    #[command(description = "poll one account for new stories right now.")]
    Check,
    #[command(description = "resend every stored story for an account.")]
    All,
    #[command(description = "show the tail of the service log.")]
    Log,
    #[command(description = "show how much disk the media cache uses.")]
    Size,
}

/// Payload carried in inline keyboard callback data.
///
/// Serialized as compact JSON; Telegram caps callback data at 64 bytes,
/// which fits the tag plus an Instagram handle.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Callback {
    Check { handle: String },
    All { handle: String },
}

pub const GREETING: &str = "Hi! I watch Instagram accounts and forward their \
stories here. Send /subscribe to receive updates, or /help for the full \
command list.";

pub const NOT_SUBSCRIBED: &str =
    "This chat is not subscribed yet. Send /subscribe to get access.";

pub const ALREADY_SUBSCRIBED: &str = "This chat is already subscribed.";

pub const ASK_PASSWORD: &str =
    "Send the access password as your next message. It will be deleted right away.";

pub const WRONG_PASSWORD: &str = "That password is not correct. Send /subscribe to try again.";

pub const SUBSCRIBED: &str =
    "Subscribed. You will now receive new stories, starting with the stored backlog.";
