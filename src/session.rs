//! Chat controller: send pipeline, reply rendering, stop, regenerate and
//! the preference switches that depend on reply state.
//!
//! The session owns no timers or network handles. The view starts a request
//! with [`ChatSession::begin_send`], awaits the [`ChatApi`](crate::api::ChatApi)
//! call itself and hands the result back through [`ChatSession::resolve_reply`].
//! Toast requests pile up in an outbox drained by [`ChatSession::take_notices`].

use crate::api::{ApiError, ApiReply, ApiResult, ChatMode, ChatRequest, RegenerateRequest, Upload};
use crate::attachment::{AttachmentError, AttachmentSlot, PickedFile, StagedAttachment};
use crate::format::{plain_text, render_markdown, render_user_text};
use crate::history;
use crate::lightbox::LightboxImage;
use crate::settings::{CUSTOM_PERSONALITY_LABEL, Preferences, find_model};
use crate::storage::KeyValueStore;
use crate::toast::Notice;
use crate::types::{Bubble, ChatEntry, Sender};
use crate::typing::{CancelToken, mark_stopped};
use std::sync::Arc;
use time::OffsetDateTime;

pub const MAX_INPUT_CHARS: usize = 5000;

pub const BUSY_MESSAGE: &str = "Wait for the previous response to finish!";
pub const STOPPED_MESSAGE: &str = "Response stopped!";
pub const CONNECTIVITY_MESSAGE: &str =
    "Sorry, I can't reach the server right now. Check your connection and try again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyPhase {
    Idle,
    /// Request sent, typing indicator visible.
    AwaitingReply,
    /// Answer is being revealed into `entry`.
    Animating { entry: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyKind {
    Text,
    Search,
    Image,
    Document,
    Regenerate,
}

impl ReplyKind {
    fn fallback_error(self) -> &'static str {
        match self {
            ReplyKind::Text | ReplyKind::Search => {
                "Sorry, something went wrong while generating a response."
            }
            ReplyKind::Image => "Sorry, the image could not be analyzed.",
            ReplyKind::Document => "Sorry, the file could not be processed.",
            ReplyKind::Regenerate => "Sorry, the response could not be regenerated.",
        }
    }
}

/// Identifies one request; replies carrying a stale ticket are dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplyTicket(u64);

#[derive(Debug)]
pub struct OutgoingChat {
    pub ticket: ReplyTicket,
    pub request: ChatRequest,
}

#[derive(Debug)]
pub struct OutgoingRegenerate {
    pub ticket: ReplyTicket,
    pub request: RegenerateRequest,
}

/// What the view needs to run the typing animation for a fresh answer.
#[derive(Clone, Debug)]
pub struct ReplyAnimation {
    pub entry: u64,
    pub text: String,
    pub cancel: CancelToken,
}

#[derive(Debug)]
struct InFlight {
    ticket: ReplyTicket,
    kind: ReplyKind,
    cancel: CancelToken,
    /// Bot entry a regenerate will overwrite.
    replaces: Option<u64>,
}

pub struct ChatSession {
    store: Arc<dyn KeyValueStore>,
    entries: Vec<ChatEntry>,
    attachment: AttachmentSlot,
    prefs: Preferences,
    phase: ReplyPhase,
    in_flight: Option<InFlight>,
    search_mode: bool,
    next_entry_id: u64,
    next_ticket: u64,
    notices: Vec<Notice>,
}

impl ChatSession {
    /// Loads preferences and saved history from `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let prefs = Preferences::load(store.as_ref());
        let mut session = Self {
            store,
            entries: Vec::new(),
            attachment: AttachmentSlot::default(),
            prefs,
            phase: ReplyPhase::Idle,
            in_flight: None,
            search_mode: false,
            next_entry_id: 1,
            next_ticket: 1,
            notices: Vec::new(),
        };
        session.load_history();
        session
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn attachment(&self) -> Option<&StagedAttachment> {
        self.attachment.staged()
    }

    pub fn phase(&self) -> ReplyPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase != ReplyPhase::Idle
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.phase == ReplyPhase::AwaitingReply
    }

    pub fn search_mode(&self) -> bool {
        self.search_mode
    }

    /// Search can only be toggled with nothing staged.
    pub fn search_available(&self) -> bool {
        self.attachment.is_empty()
    }

    pub fn can_send(&self, input: &str) -> bool {
        !self.is_busy() && (!input.trim().is_empty() || !self.attachment.is_empty())
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    fn push_entry(&mut self, sender: Sender, bubble: Bubble) -> u64 {
        let id = self.next_entry_id;
        self.next_entry_id += 1;
        self.entries.push(ChatEntry {
            id,
            sender,
            bubble,
            created_at: OffsetDateTime::now_utc(),
        });
        id
    }

    fn entry_mut(&mut self, id: u64) -> Option<&mut ChatEntry> {
        self.entries.iter_mut().find(|entry| entry.id == id)
    }

    fn start_request(&mut self, kind: ReplyKind, replaces: Option<u64>) -> ReplyTicket {
        let ticket = ReplyTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight = Some(InFlight {
            ticket,
            kind,
            cancel: CancelToken::new(),
            replaces,
        });
        self.phase = ReplyPhase::AwaitingReply;
        ticket
    }

    /// Validates the composer and records the user's bubbles.
    ///
    /// A staged document wins over a staged image, which wins over plain text.
    /// Returns `None` when nothing should be sent.
    pub fn begin_send(&mut self, input: &str) -> Option<OutgoingChat> {
        let text = input.trim();
        if text.is_empty() && self.attachment.is_empty() {
            return None;
        }
        if self.is_busy() {
            self.notify(Notice::error(BUSY_MESSAGE));
            return None;
        }
        let length = text.chars().count();
        if length > MAX_INPUT_CHARS {
            self.notify(Notice::error(format!(
                "Message is too long ({length} characters)! Maximum is {MAX_INPUT_CHARS}"
            )));
            return None;
        }

        let (kind, upload) = match self.attachment.clear() {
            Some(StagedAttachment::Document { file }) => {
                self.push_entry(Sender::User, Bubble::File(file.file_info()));
                (ReplyKind::Document, Some(Upload::File(file)))
            }
            Some(StagedAttachment::Image { file, data_url }) => {
                self.push_entry(Sender::User, Bubble::Image { url: data_url });
                (ReplyKind::Image, Some(Upload::Image(file)))
            }
            None if self.search_mode => {
                self.search_mode = false;
                (ReplyKind::Search, None)
            }
            None => (ReplyKind::Text, None),
        };
        if !text.is_empty() {
            self.push_entry(
                Sender::User,
                Bubble::Text {
                    html: render_user_text(text),
                },
            );
        }

        let mode = match kind {
            ReplyKind::Document => ChatMode::File,
            ReplyKind::Image => ChatMode::Image,
            ReplyKind::Search => ChatMode::Search,
            ReplyKind::Text | ReplyKind::Regenerate => ChatMode::Text,
        };
        tracing::debug!(mode = mode.as_str(), chars = length, "sending chat message");

        let ticket = self.start_request(kind, None);
        Some(OutgoingChat {
            ticket,
            request: ChatRequest {
                message: text.to_string(),
                personality: self.prefs.personality.clone(),
                model: self.prefs.model.clone(),
                mode,
                upload,
            },
        })
    }

    /// Asks for a new answer to replace the latest bot text.
    pub fn begin_regenerate(&mut self) -> Option<OutgoingRegenerate> {
        if self.is_busy() {
            self.notify(Notice::error(BUSY_MESSAGE));
            return None;
        }
        let target = self
            .entries
            .iter()
            .rev()
            .find(|entry| entry.sender == Sender::Bot && entry.text_html().is_some())
            .map(|entry| entry.id)?;

        let ticket = self.start_request(ReplyKind::Regenerate, Some(target));
        Some(OutgoingRegenerate {
            ticket,
            request: RegenerateRequest {
                personality: self.prefs.personality.clone(),
                model: self.prefs.model.clone(),
            },
        })
    }

    /// Applies the backend result of the request identified by `ticket`.
    ///
    /// Returns the animation to run when there is an answer to reveal.
    pub fn resolve_reply(
        &mut self,
        ticket: ReplyTicket,
        result: ApiResult<ApiReply>,
    ) -> Option<ReplyAnimation> {
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.ticket == ticket && self.phase == ReplyPhase::AwaitingReply);
        if !current {
            tracing::debug!("reply arrived after stop, not rendering");
            self.save_history();
            return None;
        }
        let flight = self.in_flight.take()?;

        match result {
            Ok(ApiReply::Answer(text)) => {
                let entry = match flight.replaces.and_then(|id| self.entry_mut(id)) {
                    Some(existing) => {
                        existing.bubble = Bubble::Text {
                            html: String::new(),
                        };
                        existing.created_at = OffsetDateTime::now_utc();
                        existing.id
                    }
                    None => self.push_entry(
                        Sender::Bot,
                        Bubble::Text {
                            html: String::new(),
                        },
                    ),
                };
                if flight.kind == ReplyKind::Document {
                    self.notify(Notice::success("File processed successfully!"));
                }
                self.phase = ReplyPhase::Animating { entry };
                let cancel = flight.cancel.clone();
                self.in_flight = Some(flight);
                Some(ReplyAnimation {
                    entry,
                    text,
                    cancel,
                })
            }
            Ok(ApiReply::Rejected(error)) => {
                let message = error.unwrap_or_else(|| flight.kind.fallback_error().to_string());
                tracing::warn!(kind = ?flight.kind, %message, "backend rejected request");
                self.fail_reply(flight.kind, &message);
                None
            }
            Err(err) => {
                log_transport_error(flight.kind, &err);
                self.fail_reply(flight.kind, CONNECTIVITY_MESSAGE);
                None
            }
        }
    }

    fn fail_reply(&mut self, kind: ReplyKind, message: &str) {
        self.phase = ReplyPhase::Idle;
        if kind == ReplyKind::Regenerate {
            // The previous answer stays in place.
            self.notify(Notice::error(message));
        } else {
            self.push_entry(
                Sender::Bot,
                Bubble::Text {
                    html: render_user_text(message),
                },
            );
        }
        self.save_history();
    }

    /// Renders one animation frame. Frames for an entry that is no longer
    /// animating are ignored and `false` is returned.
    pub fn typing_frame(&mut self, entry: u64, partial: &str) -> bool {
        if self.phase != (ReplyPhase::Animating { entry }) {
            return false;
        }
        match self.entry_mut(entry) {
            Some(target) => {
                target.bubble = Bubble::Text {
                    html: render_markdown(partial),
                };
                true
            }
            None => false,
        }
    }

    /// Ends a completed animation. No-op when it was already stopped.
    pub fn finish_typing(&mut self, entry: u64) {
        if self.phase != (ReplyPhase::Animating { entry }) {
            return;
        }
        self.phase = ReplyPhase::Idle;
        self.in_flight = None;
        self.save_history();
    }

    /// Stops the outstanding reply. Returns `false` when nothing was in flight.
    pub fn stop(&mut self) -> bool {
        let phase = self.phase;
        match phase {
            ReplyPhase::Idle => return false,
            ReplyPhase::AwaitingReply => {
                tracing::info!("stopped while waiting for reply");
            }
            ReplyPhase::Animating { entry } => {
                if let Some(target) = self.entry_mut(entry) {
                    let partial = target.text_html().unwrap_or_default();
                    target.bubble = Bubble::Text {
                        html: mark_stopped(partial),
                    };
                }
                tracing::info!(entry, "typing animation stopped");
            }
        }
        if let Some(flight) = self.in_flight.take() {
            flight.cancel.cancel();
        }
        self.phase = ReplyPhase::Idle;
        self.notify(Notice::info(STOPPED_MESSAGE));
        self.save_history();
        true
    }

    pub fn toggle_search_mode(&mut self) -> bool {
        if !self.search_available() {
            self.notify(Notice::info("Search is unavailable while a file is attached"));
            return false;
        }
        self.search_mode = !self.search_mode;
        self.search_mode
    }

    pub fn stage_image(&mut self, file: PickedFile) -> bool {
        if !self.prefs.supports_images() {
            let err = AttachmentError::ImagesUnsupported {
                model: self.prefs.model_label.clone(),
            };
            self.notify(Notice::warning(err.to_string()));
            return false;
        }
        match self.attachment.stage_image(file) {
            Ok(()) => {
                self.search_mode = false;
                true
            }
            Err(err) => {
                self.notify(Notice::error(err.to_string()));
                false
            }
        }
    }

    pub fn stage_document(&mut self, file: PickedFile) -> bool {
        match self.attachment.stage_document(file) {
            Ok(heads_up) => {
                if let Some(notice) = heads_up {
                    self.notify(notice);
                }
                self.search_mode = false;
                true
            }
            Err(err) => {
                self.notify(Notice::error(err.to_string()));
                false
            }
        }
    }

    pub fn remove_attachment(&mut self) {
        self.attachment.clear();
    }

    /// Switches model. `composer_text` is the unsent input, which is kept.
    pub fn select_model(&mut self, id: &str, composer_text: &str) -> bool {
        if self.is_busy() {
            self.notify(Notice::warning(
                "Wait for the response to finish before switching models!",
            ));
            return false;
        }
        let Some(model) = find_model(id) else {
            tracing::warn!(id, "unknown model requested");
            return false;
        };
        if model.id == self.prefs.model {
            return false;
        }
        if !composer_text.trim().is_empty() {
            self.notify(Notice::info("Your unsent message is kept"));
        }

        self.prefs.model = model.id.to_string();
        self.prefs.model_label = model.label.to_string();
        if let Err(err) = self.prefs.save_model(self.store.as_ref()) {
            tracing::error!(%err, "failed to persist model choice");
        }

        if !model.supports_images && self.attachment.clear_image().is_some() {
            self.notify(Notice::warning(format!(
                "{} does not support image analysis. The attached image was removed.",
                model.label
            )));
        }

        tracing::info!(model = model.id, "model switched");
        self.notify(Notice::success(format!("Model switched to {}!", model.label)));
        true
    }

    /// Sets the personality; the custom option carries free text as `value`.
    pub fn select_personality(&mut self, value: &str, label: &str) -> bool {
        let value = value.trim();
        if label == CUSTOM_PERSONALITY_LABEL && value.is_empty() {
            self.notify(Notice::warning("Describe the custom personality first!"));
            return false;
        }
        self.prefs.personality = value.to_string();
        self.prefs.personality_label = label.to_string();
        if let Err(err) = self.prefs.save_personality(self.store.as_ref()) {
            tracing::error!(%err, "failed to persist personality");
        }
        tracing::info!(label, "personality changed");
        self.notify(Notice::success(format!("Personality set to {label}!")));
        true
    }

    pub fn set_auto_clear(&mut self, enabled: bool) {
        self.prefs.auto_clear = enabled;
        if let Err(err) = self.prefs.save_auto_clear(self.store.as_ref()) {
            tracing::error!(%err, "failed to persist auto-clear flag");
        }
        let message = if enabled {
            "Auto-clear at midnight enabled"
        } else {
            "Auto-clear at midnight disabled"
        };
        self.notify(Notice::info(message));
    }

    /// Drops every entry and the stored history, cancelling any reply.
    pub fn clear_local(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            flight.cancel.cancel();
        }
        self.phase = ReplyPhase::Idle;
        self.entries.clear();
        if let Err(err) = history::clear(self.store.as_ref()) {
            tracing::error!(%err, "failed to clear stored history");
        }
    }

    /// Result of a user-triggered `/api/clear`. Local history goes either way.
    pub fn clear_all_finished(&mut self, result: ApiResult<()>) {
        if let Err(err) = result {
            tracing::warn!(%err, "server-side clear failed, clearing locally");
        }
        self.clear_local();
        tracing::info!("chat history cleared");
        self.notify(Notice::success("Chat history cleared!"));
    }

    /// Result of the midnight `/api/clear`.
    pub fn auto_clear_finished(&mut self, result: ApiResult<()>) {
        match result {
            Ok(()) => {
                self.clear_local();
                tracing::info!("chat history cleared automatically");
                self.notify(Notice::success("Chat history cleared automatically"));
            }
            Err(err) => tracing::warn!(%err, "auto-clear failed"),
        }
    }

    pub fn load_history(&mut self) {
        let messages = history::load(self.store.as_ref());
        self.entries = history::to_entries(messages, &mut self.next_entry_id);
        tracing::debug!(count = self.entries.len(), "chat history loaded");
    }

    pub fn save_history(&self) {
        if let Err(err) = history::save(self.store.as_ref(), &self.entries) {
            tracing::error!(%err, "failed to save chat history");
        }
    }

    /// Every image bubble in conversation order, for the gallery.
    pub fn lightbox_images(&self) -> Vec<LightboxImage> {
        self.entries
            .iter()
            .filter_map(ChatEntry::image_url)
            .enumerate()
            .map(|(idx, url)| LightboxImage::new(url, format!("Image {}", idx + 1)))
            .collect()
    }

    /// Position of `entry` within [`lightbox_images`](Self::lightbox_images).
    pub fn gallery_index(&self, entry: u64) -> Option<usize> {
        self.entries
            .iter()
            .filter(|candidate| candidate.image_url().is_some())
            .position(|candidate| candidate.id == entry)
    }

    /// Plain text of a bot bubble, ready for the clipboard.
    pub fn copy_text(&self, entry: u64) -> Option<String> {
        self.entries
            .iter()
            .find(|candidate| candidate.id == entry && candidate.sender == Sender::Bot)
            .and_then(ChatEntry::text_html)
            .map(plain_text)
            .filter(|text| !text.trim().is_empty())
    }

    pub fn copy_finished(&mut self, copied: bool) {
        if copied {
            self.notify(Notice::success("Text copied!"));
        } else {
            self.notify(Notice::error("Copy failed"));
        }
    }
}

fn log_transport_error(kind: ReplyKind, err: &ApiError) {
    match err {
        ApiError::Decode(_) => tracing::error!(?kind, %err, "backend answered with unreadable body"),
        _ => tracing::error!(?kind, %err, "chat request failed"),
    }
}
