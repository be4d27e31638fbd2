//! Local identities for the apparent authors of proxied messages.
//!
//! Proxied messages are posted by a webhook, so the host account id says
//! nothing about who sent them. The visible handle and avatar do, and they can
//! be read without asking the remote service. Keys are structured rather than
//! concatenated strings so that handles containing any character, spaces
//! included, never collide or split wrongly.

use crate::host::{Message, MessageStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Points at a message that may or may not still exist in the host store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

impl MessageRef {
    pub fn new(channel_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            message_id: message_id.into(),
        }
    }
}

impl From<&Message> for MessageRef {
    fn from(message: &Message) -> Self {
        Self::new(message.channel_id.clone(), message.id.clone())
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel_id, self.message_id)
    }
}

/// Handle + avatar + channel of a message author.
///
/// The channel is part of the key because account role colors differ per
/// channel for what is otherwise the same sender.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthorKey {
    pub handle: String,
    pub avatar: Option<String>,
    pub channel_id: String,
}

/// Handle + avatar of a message author, independent of channel.
///
/// An ordinary user with the same handle and avatar as a proxied member maps
/// to the same `MemberKey`. Callers must check that a message is proxied
/// before trusting anything looked up by this key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberKey {
    pub handle: String,
    pub avatar: Option<String>,
}

impl AuthorKey {
    pub fn member_key(&self) -> MemberKey {
        MemberKey {
            handle: self.handle.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

impl MemberKey {
    pub fn in_channel(&self, channel_id: impl Into<String>) -> AuthorKey {
        AuthorKey {
            handle: self.handle.clone(),
            avatar: self.avatar.clone(),
            channel_id: channel_id.into(),
        }
    }
}

impl From<&Message> for MemberKey {
    fn from(message: &Message) -> Self {
        Self {
            handle: message.author.username.clone(),
            avatar: message.author.avatar.clone(),
        }
    }
}

impl fmt::Display for AuthorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{}@{}",
            self.handle,
            self.avatar.as_deref().unwrap_or("-"),
            self.channel_id
        )
    }
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{}", self.handle, self.avatar.as_deref().unwrap_or("-"))
    }
}

/// The message backing a lookup could not be found, usually because it was
/// deleted between being rendered and being processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("message {0} is no longer available")]
pub struct Unresolvable(pub MessageRef);

/// Key for a message whose backing data is already at hand.
pub fn derive_author_key(message: &Message) -> AuthorKey {
    AuthorKey {
        handle: message.author.username.clone(),
        avatar: message.author.avatar.clone(),
        channel_id: message.channel_id.clone(),
    }
}

/// Key for a referenced message, looking its backing data up in the host store.
pub fn resolve_author_key(
    store: &dyn MessageStore,
    message: &MessageRef,
) -> Result<(Message, AuthorKey), Unresolvable> {
    let found = store
        .message(&message.channel_id, &message.message_id)
        .ok_or_else(|| Unresolvable(message.clone()))?;
    let key = derive_author_key(&found);
    Ok((found, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::InMemoryHost;
    use crate::host::test_support::proxied;

    #[test]
    fn same_author_same_channel_same_key() {
        let first = proxied("1", "c1", "Ash", Some("a1"));
        let second = proxied("2", "c1", "Ash", Some("a1"));

        assert_eq!(derive_author_key(&first), derive_author_key(&second));
    }

    #[test]
    fn different_channel_different_key() {
        let first = proxied("1", "c1", "Ash", Some("a1"));
        let second = proxied("2", "c2", "Ash", Some("a1"));

        assert_ne!(derive_author_key(&first), derive_author_key(&second));
    }

    #[test]
    fn member_key_ignores_channel() {
        let first = derive_author_key(&proxied("1", "c1", "Ash (she/her)", Some("a1")));
        let second = derive_author_key(&proxied("2", "c2", "Ash (she/her)", Some("a1")));

        assert_eq!(first.member_key(), second.member_key());
        assert_eq!(first.member_key().in_channel("c1"), first);
    }

    #[test]
    fn handles_with_separators_do_not_collide() {
        // "a b" + "c" and "a" + "b c" would be equal under a naive concatenation.
        let first = derive_author_key(&proxied("1", "c", "a b", Some("c")));
        let second = derive_author_key(&proxied("2", "c", "a", Some("b c")));

        assert_ne!(first, second);
        assert_ne!(first.member_key(), second.member_key());
    }

    #[test]
    fn deleted_message_is_unresolvable() {
        let host = InMemoryHost::new();
        host.insert_message(proxied("1", "c1", "Ash", None));

        let (_, key) = resolve_author_key(&host, &MessageRef::new("c1", "1")).unwrap();
        assert_eq!(key.handle, "Ash");

        let missing = MessageRef::new("c1", "2");
        assert_eq!(
            resolve_author_key(&host, &missing).unwrap_err(),
            Unresolvable(missing)
        );
    }
}
