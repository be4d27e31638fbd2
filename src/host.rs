//! Collaborators supplied by the chat application hosting the lookup pipeline.
//!
//! The pipeline never owns messages or accounts. It asks the host for a
//! message's backing data when a queued lookup is processed (the message may
//! have been deleted in the meantime) and, in account color mode, for the
//! host's own color of the account behind a proxied message.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Application id of the relay bot that posts proxied messages.
pub const PLURALKIT_APP_ID: &str = "466378653216014359";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    pub avatar: Option<String>,
}

/// The subset of a host message the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author: Author,
    pub content: String,
    pub application_id: Option<String>,
    pub webhook_id: Option<String>,
}

/// A message is proxied when the relay application posted it through a webhook.
pub fn is_proxied_message(message: &Message) -> bool {
    message.application_id.as_deref() == Some(PLURALKIT_APP_ID) && message.webhook_id.is_some()
}

/// Host message store.
pub trait MessageStore: Send + Sync {
    /// Backing data for a message, or `None` once it has been deleted.
    fn message(&self, channel_id: &str, message_id: &str) -> Option<Message>;

    fn is_proxied_message(&self, message: &Message) -> bool {
        is_proxied_message(message)
    }
}

/// Host role colors, consulted only in account color mode.
pub trait AccountColors: Send + Sync {
    fn local_color_for_sender(&self, channel_id: &str, sender_id: &str) -> Option<String>;
}

/// Map-backed host used by the command line tool and tests.
#[derive(Default)]
pub struct InMemoryHost {
    messages: DashMap<(String, String), Message>,
    account_colors: DashMap<(String, String), String>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_message(&self, message: Message) {
        self.messages
            .insert((message.channel_id.clone(), message.id.clone()), message);
    }

    pub fn remove_message(&self, channel_id: &str, message_id: &str) -> Option<Message> {
        self.messages
            .remove(&(channel_id.to_string(), message_id.to_string()))
            .map(|(_, message)| message)
    }

    pub fn set_account_color(&self, channel_id: &str, sender_id: &str, color: impl Into<String>) {
        self.account_colors
            .insert((channel_id.to_string(), sender_id.to_string()), color.into());
    }
}

impl MessageStore for InMemoryHost {
    fn message(&self, channel_id: &str, message_id: &str) -> Option<Message> {
        self.messages
            .get(&(channel_id.to_string(), message_id.to_string()))
            .map(|entry| entry.value().clone())
    }
}

impl AccountColors for InMemoryHost {
    fn local_color_for_sender(&self, channel_id: &str, sender_id: &str) -> Option<String> {
        self.account_colors
            .get(&(channel_id.to_string(), sender_id.to_string()))
            .map(|entry| entry.value().clone())
    }
}
