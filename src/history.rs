//! Chat history persistence.
//!
//! Entries are stored as a JSON array with one record per bubble under
//! [`HISTORY_KEY`]. Records written by older clients may carry both an image
//! and text without any of the `*Only` flags; those expand into an image
//! bubble followed by a text bubble.

use crate::format::{render_markdown, render_user_text};
use crate::storage::{KeyValueStore, StorageError};
use crate::types::{Bubble, ChatEntry, FileInfo, Sender};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub const HISTORY_KEY: &str = "calavera_chat_history";

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to encode chat history: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub sender: Sender,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_info: Option<FileInfo>,
    #[serde(default)]
    pub is_formatted: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_text_only: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_image_only: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_file_only: bool,
    #[serde(default)]
    pub timestamp: String,
}

impl ChatMessage {
    fn base(sender: Sender, created_at: OffsetDateTime) -> Self {
        Self {
            sender,
            content: String::new(),
            image_url: None,
            file_info: None,
            is_formatted: true,
            is_text_only: false,
            is_image_only: false,
            is_file_only: false,
            timestamp: created_at.format(&Rfc3339).unwrap_or_default(),
        }
    }

    fn created_at(&self) -> OffsetDateTime {
        OffsetDateTime::parse(&self.timestamp, &Rfc3339).unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

impl From<&ChatEntry> for ChatMessage {
    fn from(entry: &ChatEntry) -> Self {
        let mut message = ChatMessage::base(entry.sender, entry.created_at);
        match &entry.bubble {
            Bubble::Text { html } => {
                message.content = html.trim().to_string();
                message.is_text_only = true;
            }
            Bubble::Image { url } => {
                message.image_url = Some(url.clone());
                message.is_image_only = true;
            }
            Bubble::File(info) => {
                message.file_info = Some(info.clone());
                message.is_file_only = true;
            }
        }
        message
    }
}

/// One record per bubble; empty text bubbles are not worth keeping.
pub fn to_messages(entries: &[ChatEntry]) -> Vec<ChatMessage> {
    entries
        .iter()
        .filter(|entry| !matches!(&entry.bubble, Bubble::Text { html } if html.trim().is_empty()))
        .map(ChatMessage::from)
        .collect()
}

/// Rebuilds entries in stored order, assigning ids from `next_id`.
pub fn to_entries(messages: Vec<ChatMessage>, next_id: &mut u64) -> Vec<ChatEntry> {
    let mut entries = Vec::with_capacity(messages.len());
    let mut push = |sender: Sender, bubble: Bubble, created_at: OffsetDateTime| {
        entries.push(ChatEntry {
            id: *next_id,
            sender,
            bubble,
            created_at,
        });
        *next_id += 1;
    };

    for message in messages {
        let created_at = message.created_at();
        if message.is_file_only {
            if let Some(info) = message.file_info {
                push(message.sender, Bubble::File(info), created_at);
            }
        } else if message.is_image_only {
            if let Some(url) = message.image_url {
                push(message.sender, Bubble::Image { url }, created_at);
            }
        } else if message.is_text_only {
            if !message.content.trim().is_empty() {
                push(message.sender, Bubble::Text { html: message.content }, created_at);
            }
        } else {
            if let Some(url) = message.image_url.filter(|url| !url.is_empty()) {
                push(message.sender, Bubble::Image { url }, created_at);
            }
            if !message.content.trim().is_empty() {
                let html = match (message.is_formatted, message.sender) {
                    (true, _) => message.content,
                    (false, Sender::User) => render_user_text(&message.content),
                    (false, Sender::Bot) => render_markdown(&message.content),
                };
                push(message.sender, Bubble::Text { html }, created_at);
            }
        }
    }
    entries
}

pub fn save(store: &dyn KeyValueStore, entries: &[ChatEntry]) -> Result<usize, HistoryError> {
    let messages = to_messages(entries);
    let json = serde_json::to_string(&messages)?;
    store.set(HISTORY_KEY, &json)?;
    tracing::debug!(count = messages.len(), "chat history saved");
    Ok(messages.len())
}

/// Loads stored messages. Unparsable history is removed and treated as empty.
pub fn load(store: &dyn KeyValueStore) -> Vec<ChatMessage> {
    let Some(raw) = store.get(HISTORY_KEY) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<ChatMessage>>(&raw) {
        Ok(messages) => messages,
        Err(err) => {
            tracing::warn!(%err, "discarding malformed chat history");
            if let Err(err) = store.remove(HISTORY_KEY) {
                tracing::error!(%err, "failed to remove malformed chat history");
            }
            Vec::new()
        }
    }
}

pub fn clear(store: &dyn KeyValueStore) -> Result<(), HistoryError> {
    store.remove(HISTORY_KEY)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn entry(id: u64, sender: Sender, bubble: Bubble) -> ChatEntry {
        ChatEntry {
            id,
            sender,
            bubble,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_wire_format_uses_camel_case_flags() {
        let file = entry(
            1,
            Sender::User,
            Bubble::File(FileInfo {
                name: "a.pdf".to_string(),
                size: "1 KB".to_string(),
                icon: "fas fa-file-pdf".to_string(),
            }),
        );
        let json = serde_json::to_value(ChatMessage::from(&file)).unwrap();
        assert_eq!(json["sender"], "user");
        assert_eq!(json["isFileOnly"], true);
        assert_eq!(json["fileInfo"]["name"], "a.pdf");
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00Z");
        assert!(json.get("isTextOnly").is_none());
    }

    #[test]
    fn test_legacy_record_expands_to_two_bubbles() {
        let raw = r#"[{"sender":"user","content":"look <here>","imageUrl":"data:image/png;base64,AA","isFormatted":false}]"#;
        let messages: Vec<ChatMessage> = serde_json::from_str(raw).unwrap();
        let mut next_id = 10;
        let entries = to_entries(messages, &mut next_id);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].image_url(), Some("data:image/png;base64,AA"));
        assert_eq!(entries[1].text_html(), Some("look &lt;here&gt;"));
        assert_eq!(next_id, 12);
    }

    #[test]
    fn test_malformed_history_is_discarded() {
        let store = MemoryStore::new();
        store.set(HISTORY_KEY, "{not json").unwrap();
        assert!(load(&store).is_empty());
        assert_eq!(store.get(HISTORY_KEY), None);
    }

    #[test]
    fn test_empty_text_bubbles_are_not_saved() {
        let store = MemoryStore::new();
        let entries = vec![
            entry(1, Sender::Bot, Bubble::Text { html: "  ".to_string() }),
            entry(2, Sender::Bot, Bubble::Text { html: "<p>hi</p>".to_string() }),
        ];
        assert_eq!(save(&store, &entries).unwrap(), 1);
        assert_eq!(load(&store).len(), 1);
    }
}
