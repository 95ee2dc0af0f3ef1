//! Polling channel entrypoints (Twitter mentions, Telegram updates).
//!
//! Concrete clients live in agentry-infra; this module defines the client
//! seam and the generic sweep loop both channels share.

mod poller;

pub use poller::ChannelPoller;

use thiserror::Error;

use agentry_types::agent::Agent;
use agentry_types::chat::Entrypoint;

/// Errors from a channel client.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel transport error: {0}")]
    Transport(String),

    #[error("channel request timed out after {0}s")]
    Timeout(u64),

    #[error("channel credential rejected: {0}")]
    Credential(String),
}

/// One inbound message fetched from a channel.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Channel-native message id, persisted as the poll cursor.
    pub id: String,
    /// Channel-native author identifier.
    pub author_id: String,
    /// Channel-native conversation/thread identifier.
    pub chat_id: String,
    pub text: String,
}

/// A per-agent channel connection.
pub trait ChannelClient: Send + Sync {
    /// Fetch messages newer than `cursor`, oldest first.
    fn poll(
        &self,
        cursor: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Vec<InboundMessage>, ChannelError>> + Send;

    /// Send a reply into the channel conversation.
    fn reply(
        &self,
        chat_id: &str,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), ChannelError>> + Send;
}

/// Builds per-agent clients for one channel.
///
/// Credentials live in the agent's skills configuration and are validated
/// at create/update time, so `client_for` only answers whether the agent
/// has this channel's entrypoint enabled.
pub trait ChannelAdapter: Send + Sync {
    type Client: ChannelClient;

    fn entrypoint(&self) -> Entrypoint;

    /// A client for this agent, or None when the agent does not enable this
    /// channel.
    fn client_for(&self, agent: &Agent) -> Option<Self::Client>;
}
