//! End-to-end tests of the chat pipeline against a scripted backend.
//!
//! These drive `ChatSession` the same way the Dioxus views do: begin a
//! request, await the `ChatApi`, resolve, then run the typing animation.

use async_trait::async_trait;
use calavera::api::{
    ApiError, ApiReply, ApiResult, ChatApi, ChatMode, ChatRequest, RegenerateRequest, Upload,
};
use calavera::attachment::PickedFile;
use calavera::config::Config;
use calavera::context::AppContext;
use calavera::history::HISTORY_KEY;
use calavera::session::{BUSY_MESSAGE, ChatSession, ReplyAnimation, ReplyPhase};
use calavera::storage::{KeyValueStore, MemoryStore};
use calavera::toast::{DEFAULT_DURATION, Notice, ToastKind, ToastManager};
use calavera::typing::{self, STOP_MARKER, TypingOutcome};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct ScriptedApi {
    replies: Mutex<VecDeque<ApiResult<ApiReply>>>,
    chats: Mutex<Vec<ChatRequest>>,
    regenerations: Mutex<Vec<RegenerateRequest>>,
    clear_fails: bool,
}

impl ScriptedApi {
    fn replying(replies: Vec<ApiResult<ApiReply>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    fn next_reply(&self) -> ApiResult<ApiReply> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiReply::Answer("ok".to_string())))
    }
}

#[async_trait]
impl ChatApi for ScriptedApi {
    async fn chat(&self, request: ChatRequest) -> ApiResult<ApiReply> {
        self.chats.lock().unwrap().push(request);
        self.next_reply()
    }

    async fn regenerate(&self, request: RegenerateRequest) -> ApiResult<ApiReply> {
        self.regenerations.lock().unwrap().push(request);
        self.next_reply()
    }

    async fn clear(&self) -> ApiResult<()> {
        if self.clear_fails {
            Err(ApiError::Status(500))
        } else {
            Ok(())
        }
    }
}

fn answer(text: &str) -> ApiResult<ApiReply> {
    Ok(ApiReply::Answer(text.to_string()))
}

/// Runs the reveal loop to the end with no delays.
async fn reveal(session: &mut ChatSession, animation: ReplyAnimation) -> TypingOutcome {
    let ReplyAnimation {
        entry,
        text,
        cancel,
    } = animation;
    let outcome = typing::animate(&text, Duration::ZERO, Duration::from_millis(1), &cancel, |partial| {
        session.typing_frame(entry, partial);
    })
    .await;
    if outcome == TypingOutcome::Completed {
        session.finish_typing(entry);
    }
    outcome
}

async fn send(session: &mut ChatSession, api: &dyn ChatApi, text: &str) -> Option<TypingOutcome> {
    let outgoing = session.begin_send(text)?;
    let result = api.chat(outgoing.request).await;
    let animation = session.resolve_reply(outgoing.ticket, result)?;
    Some(reveal(session, animation).await)
}

#[tokio::test]
async fn test_text_message_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let api = ScriptedApi::replying(vec![answer("Hello **there**, friend")]);
    let mut session = ChatSession::new(store.clone());

    let outcome = send(&mut session, &api, "  hi calavera  ").await;
    assert_eq!(outcome, Some(TypingOutcome::Completed));

    let request = api.chats.lock().unwrap().remove(0);
    assert_eq!(request.message, "hi calavera");
    assert_eq!(request.mode, ChatMode::Text);
    assert_eq!(request.model, "gemini");
    assert!(request.upload.is_none());

    let entries = session.entries();
    assert_eq!(entries.len(), 2);
    let bot_html = entries[1].text_html().unwrap();
    assert!(bot_html.contains("<strong>there</strong>"));
    assert_eq!(session.phase(), ReplyPhase::Idle);

    let saved = store.get(HISTORY_KEY).expect("history should be saved");
    assert!(saved.contains("hi calavera"));
    assert!(saved.contains("friend"));
}

#[tokio::test]
async fn test_stop_during_typing_keeps_only_revealed_text() {
    let store = Arc::new(MemoryStore::new());
    let long_answer = (1..=50).map(|n| format!("word{n}")).collect::<Vec<_>>().join(" ");
    let api = ScriptedApi::replying(vec![answer(&long_answer)]);
    let mut session = ChatSession::new(store.clone());

    let outgoing = session.begin_send("talk a lot").unwrap();
    let result = api.chat(outgoing.request).await;
    let ReplyAnimation {
        entry,
        text,
        cancel,
    } = session.resolve_reply(outgoing.ticket, result).unwrap();

    let mut frames = 0;
    let outcome = typing::animate(&text, Duration::ZERO, Duration::from_millis(1), &cancel, |partial| {
        session.typing_frame(entry, partial);
        frames += 1;
        if frames == 3 {
            assert!(session.stop());
        }
    })
    .await;

    assert!(matches!(outcome, TypingOutcome::Stopped(_)));
    let html = session.entries()[1].text_html().unwrap().to_string();
    assert!(html.ends_with(STOP_MARKER));
    assert!(html.contains("word1 word2"));
    assert!(!html.contains("word50"));

    let saved = store.get(HISTORY_KEY).unwrap();
    assert!(saved.contains(STOP_MARKER));
    assert!(!saved.contains("word50"));

    let notices = session.take_notices();
    assert_eq!(notices, vec![Notice::info("Response stopped!")]);
    assert!(session.can_send("next"));
}

#[tokio::test]
async fn test_transport_failure_renders_connectivity_notice() {
    let store = Arc::new(MemoryStore::new());
    let api = ScriptedApi::replying(vec![Err(ApiError::Status(502))]);
    let mut session = ChatSession::new(store);

    assert_eq!(send(&mut session, &api, "hello?").await, None);
    let last = session.entries().last().unwrap();
    assert!(last.text_html().unwrap().contains("reach the server"));
    assert!(!session.is_busy());
}

#[tokio::test]
async fn test_image_upload_and_model_capabilities() {
    let store = Arc::new(MemoryStore::new());
    let api = ScriptedApi::replying(vec![answer("A cat.")]);
    let mut session = ChatSession::new(store);

    assert!(session.stage_image(PickedFile::new("cat.png", vec![137, 80, 78, 71])));
    assert!(session.select_model("groq", ""));
    assert!(session.attachment().is_some());
    session.take_notices();

    send(&mut session, &api, "what is this").await;
    let request = api.chats.lock().unwrap().remove(0);
    assert_eq!(request.mode, ChatMode::Image);
    assert_eq!(request.model, "groq");
    match request.upload {
        Some(Upload::Image(file)) => assert_eq!(file.mime, "image/png"),
        other => panic!("expected image upload, got {other:?}"),
    }
    assert_eq!(session.lightbox_images().len(), 1);

    assert!(session.stage_image(PickedFile::new("dog.jpg", vec![1, 2, 3])));
    assert!(session.select_model("deepseek", ""));
    let warnings: Vec<_> = session
        .take_notices()
        .into_iter()
        .filter(|notice| notice.kind == ToastKind::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(session.attachment().is_none());
}

#[tokio::test]
async fn test_regenerate_replaces_previous_answer() {
    let store = Arc::new(MemoryStore::new());
    let api = ScriptedApi::replying(vec![answer("first try"), answer("second try")]);
    let mut session = ChatSession::new(store.clone());

    send(&mut session, &api, "write a haiku").await;
    let outgoing = session.begin_regenerate().unwrap();
    let result = api.regenerate(outgoing.request).await;
    let animation = session.resolve_reply(outgoing.ticket, result).unwrap();
    reveal(&mut session, animation).await;

    assert_eq!(api.regenerations.lock().unwrap().len(), 1);
    assert_eq!(session.entries().len(), 2);
    let html = session.entries()[1].text_html().unwrap();
    assert!(html.contains("second try"));
    assert!(!store.get(HISTORY_KEY).unwrap().contains("first try"));
}

#[tokio::test]
async fn test_clear_all_when_backend_fails() {
    let api = ScriptedApi {
        clear_fails: true,
        ..ScriptedApi::default()
    };
    let ctx = AppContext::new(Config::default(), Arc::new(api), Arc::new(MemoryStore::new()));
    let mut session = ChatSession::new(ctx.store.clone());
    send(&mut session, ctx.api.as_ref(), "remember this").await;
    assert!(ctx.store.get(HISTORY_KEY).is_some());

    let result = ctx.api.clear().await;
    assert!(result.is_err());
    session.clear_all_finished(result);

    assert!(session.entries().is_empty());
    assert!(ctx.store.get(HISTORY_KEY).is_none());
    assert!(ChatSession::new(ctx.store.clone()).entries().is_empty());
    assert_eq!(
        session.take_notices(),
        vec![Notice::success("Chat history cleared!")]
    );
}

#[tokio::test]
async fn test_busy_toasts_are_deduplicated() {
    let store = Arc::new(MemoryStore::new());
    let mut session = ChatSession::new(store);
    let mut toasts = ToastManager::default();
    let start = Instant::now();

    session.begin_send("first").unwrap();
    assert!(session.begin_send("second").is_none());
    assert!(session.begin_send("third").is_none());

    let shown: Vec<_> = session
        .take_notices()
        .iter()
        .filter_map(|notice| {
            toasts.show_at(&notice.message, notice.kind, DEFAULT_DURATION, start)
        })
        .collect();
    assert_eq!(shown.len(), 1);
    assert_eq!(toasts.current().unwrap().message, BUSY_MESSAGE);
}
