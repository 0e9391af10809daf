//! Transient notifications with per-message cooldown dedup.
//!
//! At most one toast is visible. Showing a new one force-closes the current
//! toast without the exit phase. A `(kind, message)` pair that was shown less
//! than [`COOLDOWN`] ago is dropped.

use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const COOLDOWN: Duration = Duration::from_secs(3);
pub const DEFAULT_DURATION: Duration = Duration::from_millis(4000);
/// Length of the hide animation before a closed toast is removed.
pub const EXIT_DURATION: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    pub fn icon(self) -> &'static str {
        match self {
            ToastKind::Success => "✓",
            ToastKind::Error => "✕",
            ToastKind::Warning => "⚠",
            ToastKind::Info => "ℹ",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ToastKind::Success => "Success",
            ToastKind::Error => "Error",
            ToastKind::Warning => "Warning",
            ToastKind::Info => "Info",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Warning => "warning",
            ToastKind::Info => "info",
        }
    }
}

/// A toast request raised by app logic, before dedup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub kind: ToastKind,
}

impl Notice {
    pub fn new(message: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(message, ToastKind::Success)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, ToastKind::Error)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, ToastKind::Warning)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, ToastKind::Info)
    }
}

pub type ToastId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastPhase {
    Showing,
    Hiding,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub kind: ToastKind,
    pub shown_at: Instant,
    pub duration: Duration,
    pub phase: ToastPhase,
}

#[derive(Debug)]
pub struct ToastManager {
    current: Option<Toast>,
    cooldowns: HashMap<String, Instant>,
    cooldown: Duration,
    next_id: ToastId,
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new(COOLDOWN)
    }
}

fn cooldown_key(kind: ToastKind, message: &str) -> String {
    format!("{}:{}", kind.css_class(), message)
}

impl ToastManager {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            current: None,
            cooldowns: HashMap::new(),
            cooldown,
            next_id: 1,
        }
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    pub fn show(&mut self, message: &str, kind: ToastKind, duration: Duration) -> Option<ToastId> {
        self.show_at(message, kind, duration, Instant::now())
    }

    pub fn show_notice(&mut self, notice: &Notice, duration: Duration) -> Option<ToastId> {
        self.show(&notice.message, notice.kind, duration)
    }

    /// Returns the new toast's id, or `None` when the pair is still cooling down.
    pub fn show_at(
        &mut self,
        message: &str,
        kind: ToastKind,
        duration: Duration,
        now: Instant,
    ) -> Option<ToastId> {
        self.prune(now);
        let key = cooldown_key(kind, message);
        if let Some(last_shown) = self.cooldowns.get(&key) {
            let remaining = self.cooldown.saturating_sub(now.duration_since(*last_shown));
            tracing::debug!(
                message,
                remaining_ms = remaining.as_millis() as u64,
                "toast skipped during cooldown"
            );
            return None;
        }
        self.cooldowns.insert(key, now);

        if let Some(previous) = self.current.take() {
            tracing::trace!(id = previous.id, "toast force-closed");
        }

        let id = self.next_id;
        self.next_id += 1;
        self.current = Some(Toast {
            id,
            message: message.to_string(),
            kind,
            shown_at: now,
            duration,
            phase: ToastPhase::Showing,
        });
        Some(id)
    }

    /// Drops cooldown entries older than the window.
    pub fn prune(&mut self, now: Instant) {
        let window = self.cooldown;
        self.cooldowns
            .retain(|_, shown| now.duration_since(*shown) < window);
    }

    /// Starts the exit phase. Ignored if `id` was already replaced.
    pub fn begin_close(&mut self, id: ToastId) -> bool {
        match self.current.as_mut() {
            Some(toast) if toast.id == id && toast.phase == ToastPhase::Showing => {
                toast.phase = ToastPhase::Hiding;
                true
            }
            _ => false,
        }
    }

    /// Removes the toast once its exit phase is over.
    pub fn finish_close(&mut self, id: ToastId) {
        if self.current.as_ref().is_some_and(|toast| toast.id == id) {
            self.current = None;
        }
    }

    /// Whether the auto-dismiss timer of `id` has run out.
    pub fn is_expired(&self, id: ToastId, now: Instant) -> bool {
        self.current
            .as_ref()
            .is_some_and(|toast| toast.id == id && now >= toast.shown_at + toast.duration)
    }
}
