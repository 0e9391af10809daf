use crate::api::ChatApi;
use crate::context::AppContext;
use crate::lightbox::Lightbox;
use crate::schedule::run_at_midnight;
use crate::session::{ChatSession, ReplyAnimation};
use crate::toast::{EXIT_DURATION, Notice, ToastId, ToastManager};
use crate::typing::{self, START_DELAY, TypingOutcome};
use crate::views::{ChatView, LightboxView, ToastHost};
use dioxus::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

const CALAVERA_CSS: Asset = asset!("/assets/calavera.css");
const FONT_AWESOME_CSS: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css";

/// Copyable handle to the app state, provided as context by [`App`].
///
/// Work started through the handle runs on the root scope, so it outlives
/// the picker or menu that triggered it.
#[derive(Clone, Copy)]
pub struct ChatHandle {
    pub session: Signal<ChatSession>,
    pub toasts: Signal<ToastManager>,
    pub lightbox: Signal<Lightbox>,
    api: CopyValue<Arc<dyn ChatApi>>,
    typing_interval: Duration,
    toast_duration: Duration,
}

impl ChatHandle {
    /// Runs `f` against the session, then raises whatever toasts it queued.
    pub fn update<R>(self, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        let mut session = self.session;
        let (out, notices) = {
            let mut guard = session.write();
            let out = f(&mut guard);
            (out, guard.take_notices())
        };
        for notice in &notices {
            self.notify(notice);
        }
        out
    }

    pub fn notify(self, notice: &Notice) {
        let mut toasts = self.toasts;
        let Some(id) = toasts.write().show_notice(notice, self.toast_duration) else {
            return;
        };
        let duration = self.toast_duration;
        spawn_forever(async move {
            tokio::time::sleep(duration).await;
            if toasts.peek().is_expired(id, Instant::now()) {
                dismiss_toast(toasts, id).await;
            }
        });
    }

    /// Sends the composer text. Returns `true` when a request went out.
    pub fn send(self, text: &str) -> bool {
        let Some(outgoing) = self.update(|session| session.begin_send(text)) else {
            return false;
        };
        let api = self.api.cloned();
        spawn_forever(async move {
            let result = api.chat(outgoing.request).await;
            let animation = self.update(|session| session.resolve_reply(outgoing.ticket, result));
            if let Some(animation) = animation {
                self.reveal(animation).await;
            }
        });
        true
    }

    pub fn regenerate(self) {
        let Some(outgoing) = self.update(ChatSession::begin_regenerate) else {
            return;
        };
        let api = self.api.cloned();
        spawn_forever(async move {
            let result = api.regenerate(outgoing.request).await;
            let animation = self.update(|session| session.resolve_reply(outgoing.ticket, result));
            if let Some(animation) = animation {
                self.reveal(animation).await;
            }
        });
    }

    pub fn stop(self) {
        self.update(ChatSession::stop);
    }

    pub fn clear_all(self) {
        let api = self.api.cloned();
        spawn_forever(async move {
            let result = api.clear().await;
            self.update(|session| session.clear_all_finished(result));
        });
    }

    pub fn copy(self, entry: u64) {
        let Some(text) = self.session.peek().copy_text(entry) else {
            return;
        };
        spawn_forever(async move {
            let copied = write_clipboard(text).await;
            self.update(|session| session.copy_finished(copied));
        });
    }

    async fn reveal(self, animation: ReplyAnimation) {
        let ReplyAnimation {
            entry,
            text,
            cancel,
        } = animation;
        let mut session = self.session;
        let outcome = typing::animate(&text, START_DELAY, self.typing_interval, &cancel, |partial| {
            session.write().typing_frame(entry, partial);
        })
        .await;
        if outcome == TypingOutcome::Completed {
            self.update(|session| session.finish_typing(entry));
        }
    }

    async fn auto_clear(self) {
        if !self.session.peek().prefs().auto_clear {
            return;
        }
        let api = self.api.cloned();
        let result = api.clear().await;
        self.update(|session| session.auto_clear_finished(result));
    }
}

/// Hides toast `id`, removing it once the exit animation is over.
pub async fn dismiss_toast(mut toasts: Signal<ToastManager>, id: ToastId) {
    if toasts.write().begin_close(id) {
        tokio::time::sleep(EXIT_DURATION).await;
        toasts.write().finish_close(id);
    }
}

async fn write_clipboard(text: String) -> bool {
    #[cfg(any(feature = "desktop", feature = "mobile"))]
    {
        match arboard::Clipboard::new().and_then(|mut board| board.set_text(text)) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%err, "clipboard write failed");
                false
            }
        }
    }
    #[cfg(not(any(feature = "desktop", feature = "mobile")))]
    {
        let literal = serde_json::Value::String(text).to_string();
        let script = format!("await navigator.clipboard.writeText({literal}); return true;");
        match document::eval(&script).await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(?err, "clipboard write failed");
                false
            }
        }
    }
}

/// Builds the app state from the [`AppContext`] and provides a [`ChatHandle`].
pub fn use_chat_handle() -> ChatHandle {
    let ctx = use_context::<AppContext>();
    let session = use_signal(|| ChatSession::new(ctx.store.clone()));
    let toasts = use_signal(ToastManager::default);
    let lightbox = use_signal(Lightbox::default);
    use_context_provider(|| ChatHandle {
        session,
        toasts,
        lightbox,
        api: CopyValue::new(ctx.api.clone()),
        typing_interval: ctx.config.typing_interval,
        toast_duration: ctx.config.toast_duration,
    })
}

#[component]
pub fn App() -> Element {
    let handle = use_chat_handle();

    use_future(move || run_at_midnight(move || handle.auto_clear()));

    rsx! {
        document::Link { rel: "stylesheet", href: CALAVERA_CSS }
        document::Link { rel: "stylesheet", href: FONT_AWESOME_CSS }
        ChatView {}
        LightboxView {}
        ToastHost {}
    }
}
