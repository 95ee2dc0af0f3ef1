//! Concrete channel clients for the polling entrypoints.

mod telegram;
mod twitter;

pub use telegram::{TelegramAdapter, TelegramClient};
pub use twitter::{TwitterAdapter, TwitterClient};

use agentry_core::channel::ChannelError;

/// Timeout applied to every outbound channel HTTP call.
pub(crate) const CHANNEL_TIMEOUT_SECS: u64 = 30;

pub(crate) fn channel_http_error(e: reqwest::Error) -> ChannelError {
    if e.is_timeout() {
        ChannelError::Timeout(CHANNEL_TIMEOUT_SECS)
    } else {
        ChannelError::Transport(e.to_string())
    }
}

pub(crate) fn channel_client() -> Result<reqwest::Client, ChannelError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(CHANNEL_TIMEOUT_SECS))
        .build()
        .map_err(|e| ChannelError::Transport(e.to_string()))
}
