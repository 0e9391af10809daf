use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    pub fn css_class(self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    /// Human readable size, e.g. `1.5 KB`.
    pub size: String,
    /// Font Awesome icon class.
    pub icon: String,
}

impl FileInfo {
    pub fn extension(&self) -> String {
        crate::attachment::file_extension(&self.name)
    }
}

/// One rendered content block.
#[derive(Clone, Debug, PartialEq)]
pub enum Bubble {
    /// Already rendered HTML.
    Text { html: String },
    Image { url: String },
    File(FileInfo),
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatEntry {
    pub id: u64,
    pub sender: Sender,
    pub bubble: Bubble,
    pub created_at: OffsetDateTime,
}

impl ChatEntry {
    pub fn text_html(&self) -> Option<&str> {
        match &self.bubble {
            Bubble::Text { html } => Some(html),
            _ => None,
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.bubble {
            Bubble::Image { url } => Some(url),
            _ => None,
        }
    }
}
