use crate::session::ReplyPhase;
use crate::types::{Bubble, ChatEntry, FileInfo, Sender};
use crate::ui::ChatHandle;
use crate::views::lightbox::open_gallery;
use crate::views::{ChatHeader, Composer};
use dioxus::document::eval;
use dioxus::prelude::*;
use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};

const MESSAGE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[hour repr:12 padding:zero]:[minute padding:zero] [period case:upper]");

fn format_message_timestamp(timestamp: OffsetDateTime) -> Option<String> {
    let mut datetime = timestamp;
    if let Ok(offset) = UtcOffset::current_local_offset() {
        datetime = datetime.to_offset(offset);
    }
    datetime.format(MESSAGE_TIME_FORMAT).ok()
}

/// Distance from the bottom, in pixels, past which the jump button shows.
const SCROLL_BUTTON_THRESHOLD: f64 = 200.0;

fn shows_scroll_button(distance_from_bottom: f64) -> bool {
    distance_from_bottom > SCROLL_BUTTON_THRESHOLD
}

async fn scroll_chat_to_bottom() {
    let _ = eval("const el = document.getElementById('chat-list'); if (el) { el.scrollTop = el.scrollHeight; }").await;
}

async fn smooth_scroll_chat_to_bottom() {
    let _ = eval("const el = document.getElementById('chat-list'); if (el) { el.scrollTo({ top: el.scrollHeight, behavior: 'smooth' }); }").await;
}

async fn chat_distance_from_bottom() -> Option<f64> {
    let value = eval(
        "const el = document.getElementById('chat-list'); return el ? el.scrollHeight - el.scrollTop - el.clientHeight : 0;",
    )
    .await
    .ok()?;
    value.as_f64()
}

#[component]
pub fn ChatView() -> Element {
    let input = use_signal(String::new);

    rsx! {
        div { class: "main-container",
            ChatHeader { input }
            MessageList {}
            Composer { input }
        }
    }
}

#[component]
fn MessageList() -> Element {
    let handle = use_context::<ChatHandle>();
    let mut scrolled_up = use_signal(|| false);
    let session = handle.session.read();
    let entries = session.entries().to_vec();
    let awaiting = session.is_awaiting_reply();
    let streaming = match session.phase() {
        ReplyPhase::Animating { entry } => Some(entry),
        _ => None,
    };
    let regenerate_target = if session.is_busy() {
        None
    } else {
        entries
            .iter()
            .rev()
            .find(|entry| entry.sender == Sender::Bot && entry.text_html().is_some())
            .map(|entry| entry.id)
    };
    drop(session);

    // Follow new bubbles and every typing frame.
    use_effect(move || {
        let _ = handle.session.read().entries().len();
        spawn(scroll_chat_to_bottom());
    });

    rsx! {
        div {
            id: "chat-list",
            class: "chat-list",
            onscroll: move |_| async move {
                if let Some(distance) = chat_distance_from_bottom().await {
                    let show = shows_scroll_button(distance);
                    if *scrolled_up.peek() != show {
                        scrolled_up.set(show);
                    }
                }
            },
            if entries.is_empty() && !awaiting {
                WelcomeCard {}
            }
            for entry in entries {
                MessageRow {
                    key: "{entry.id}",
                    streaming: streaming == Some(entry.id),
                    can_regenerate: regenerate_target == Some(entry.id),
                    entry: entry.clone(),
                }
            }
            if awaiting {
                TypingIndicator {}
            }
        }
        if scrolled_up() {
            button {
                class: "scroll-to-bottom",
                r#type: "button",
                title: "Scroll to latest message",
                onclick: move |_| {
                    scrolled_up.set(false);
                    spawn(smooth_scroll_chat_to_bottom());
                },
                i { class: "fas fa-arrow-down" }
            }
        }
    }
}

#[component]
fn WelcomeCard() -> Element {
    rsx! {
        div { class: "welcome-card",
            div { class: "avatar bot large", "💀" }
            h2 { "Hi, I'm Calavera AI" }
            p { class: "text-muted",
                "Ask me anything, attach an image or a document, or turn on search for fresh results."
            }
        }
    }
}

#[component]
fn TypingIndicator() -> Element {
    rsx! {
        div { class: "message-row bot",
            div { class: "avatar bot", "💀" }
            div { class: "typing-indicator", aria_label: "Calavera is typing",
                span { class: "dot" }
                span { class: "dot" }
                span { class: "dot" }
            }
        }
    }
}

#[component]
fn MessageRow(entry: ChatEntry, streaming: bool, can_regenerate: bool) -> Element {
    let sender = entry.sender.css_class();
    let is_bot = entry.sender == Sender::Bot;
    let timestamp = format_message_timestamp(entry.created_at);
    let id = entry.id;

    rsx! {
        div { class: "message-row {sender}",
            if is_bot {
                div { class: "avatar bot", "💀" }
            }
            div { class: "message-stack",
                {match entry.bubble {
                    Bubble::Text { html } => rsx! {
                        TextBubble { id, html, is_bot, streaming, can_regenerate }
                    },
                    Bubble::Image { url } => rsx! {
                        ImageBubble { id, url }
                    },
                    Bubble::File(info) => rsx! {
                        FileCard { info }
                    },
                }}
                if let Some(ts) = timestamp {
                    div { class: "message-meta {sender}",
                        span { class: "message-timestamp", "{ts}" }
                    }
                }
            }
        }
    }
}

#[component]
fn TextBubble(id: u64, html: String, is_bot: bool, streaming: bool, can_regenerate: bool) -> Element {
    let handle = use_context::<ChatHandle>();
    let show_actions = is_bot && !streaming && !html.is_empty();
    let bubble_class = if is_bot { "bubble bot" } else { "bubble user" };

    rsx! {
        div { class: bubble_class,
            div { class: "md", dangerous_inner_html: "{html}" }
            if streaming {
                span { class: "typing-cursor" }
            }
        }
        if show_actions {
            div { class: "bubble-controls",
                button {
                    class: "action-btn",
                    title: "Copy text",
                    onclick: move |_| handle.copy(id),
                    i { class: "fas fa-copy" }
                    " Copy"
                }
                if can_regenerate {
                    button {
                        class: "action-btn",
                        title: "Regenerate response",
                        onclick: move |_| handle.regenerate(),
                        i { class: "fas fa-redo" }
                        " Regenerate"
                    }
                }
            }
        }
    }
}

#[component]
fn ImageBubble(id: u64, url: String) -> Element {
    let handle = use_context::<ChatHandle>();
    let open = move |_: MouseEvent| {
        let (images, index) = {
            let session = handle.session.peek();
            (session.lightbox_images(), session.gallery_index(id))
        };
        if let Some(index) = index {
            open_gallery(handle.lightbox, images, index);
        }
    };

    rsx! {
        div { class: "bubble image",
            img { class: "chat-image", src: "{url}", alt: "Attached image", onclick: open }
        }
    }
}

#[component]
pub fn FileCard(info: FileInfo) -> Element {
    let ext = info.extension().to_uppercase();
    let FileInfo { name, size, icon } = info;
    rsx! {
        div { class: "file-card",
            i { class: "file-icon {icon}" }
            div { class: "file-details",
                span { class: "file-name", title: "{name}", "{name}" }
                span { class: "file-meta", "{ext} · {size}" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_button_threshold() {
        assert!(!shows_scroll_button(0.0));
        assert!(!shows_scroll_button(SCROLL_BUTTON_THRESHOLD));
        assert!(shows_scroll_button(SCROLL_BUTTON_THRESHOLD + 1.0));
    }

    #[test]
    fn test_message_timestamp_format() {
        let stamp = time::macros::datetime!(2024-03-05 14:07 UTC);
        let formatted = format_message_timestamp(stamp).expect("timestamp should format");
        assert!(formatted.ends_with("AM") || formatted.ends_with("PM"));
        assert_eq!(formatted.len(), "02:07 PM".len());
    }
}
