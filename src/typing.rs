//! Word-by-word reveal of bot answers.
//!
//! The answer is split into alternating word and whitespace tokens and one
//! token is appended per tick. A [`CancelToken`] ends the loop early; the
//! caller keeps whatever was revealed so far.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const STOP_MARKER: &str = "[stopped]";
pub const START_DELAY: Duration = Duration::from_millis(300);

/// Splits on whitespace runs, keeping the runs as their own tokens.
pub fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (idx, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                tokens.push(&text[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Appends the stop marker to partially revealed HTML.
pub fn mark_stopped(partial_html: &str) -> String {
    let trimmed = partial_html.trim_end();
    if trimmed.is_empty() {
        STOP_MARKER.to_string()
    } else {
        format!("{trimmed} {STOP_MARKER}")
    }
}

#[derive(Debug)]
pub struct TypingReveal<'a> {
    tokens: Vec<&'a str>,
    next: usize,
    shown: String,
}

impl<'a> TypingReveal<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            tokens: tokenize(text),
            next: 0,
            shown: String::with_capacity(text.len()),
        }
    }

    /// Reveals one more token; `None` once everything is shown.
    pub fn advance(&mut self) -> Option<&str> {
        let token = self.tokens.get(self.next)?;
        self.shown.push_str(token);
        self.next += 1;
        Some(&self.shown)
    }

    pub fn shown(&self) -> &str {
        &self.shown
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.tokens.len()
    }
}

/// One-shot cancellation signal shared between a stop request and a running loop.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so `wait_for` can only end by seeing `true`.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypingOutcome {
    Completed,
    /// Holds the text revealed before the stop.
    Stopped(String),
}

/// Runs the reveal loop, calling `on_frame` with the revealed prefix after each tick.
pub async fn animate(
    text: &str,
    start_delay: Duration,
    interval: Duration,
    cancel: &CancelToken,
    mut on_frame: impl FnMut(&str),
) -> TypingOutcome {
    let mut reveal = TypingReveal::new(text);
    let mut delay = start_delay;
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(shown = reveal.shown().len(), "typing stopped");
                return TypingOutcome::Stopped(reveal.shown().to_string());
            }
            _ = tokio::time::sleep(delay) => {}
        }
        delay = interval;
        match reveal.advance() {
            Some(shown) => on_frame(shown),
            None => return TypingOutcome::Completed,
        }
        if reveal.is_done() {
            return TypingOutcome::Completed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_keeps_whitespace_runs() {
        assert_eq!(
            tokenize("Hello  world\nagain"),
            vec!["Hello", "  ", "world", "\n", "again"]
        );
        assert_eq!(tokenize(" lead"), vec![" ", "lead"]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_reveal_rebuilds_full_text() {
        let text = "one two  three";
        let mut reveal = TypingReveal::new(text);
        let mut last = String::new();
        while let Some(shown) = reveal.advance() {
            last = shown.to_string();
        }
        assert_eq!(last, text);
        assert!(reveal.is_done());
    }

    #[test]
    fn test_mark_stopped() {
        assert_eq!(mark_stopped("<p>partial</p>\n"), "<p>partial</p> [stopped]");
        assert_eq!(mark_stopped(""), STOP_MARKER);
    }

    #[tokio::test]
    async fn test_animate_completes_with_all_frames() {
        let token = CancelToken::new();
        let mut frames = Vec::new();
        let outcome = animate("a b c", Duration::ZERO, Duration::from_millis(1), &token, |f| {
            frames.push(f.to_string())
        })
        .await;

        assert_eq!(outcome, TypingOutcome::Completed);
        assert_eq!(frames.last().map(String::as_str), Some("a b c"));
        assert_eq!(frames.len(), 5);
    }

    #[tokio::test]
    async fn test_cancel_before_start_reveals_nothing() {
        let token = CancelToken::new();
        token.cancel();
        assert!(token.is_cancelled());
        let outcome = animate("never shown", Duration::from_millis(50), Duration::from_millis(1), &token, |_| {
            panic!("no frame expected")
        })
        .await;
        assert_eq!(outcome, TypingOutcome::Stopped(String::new()));
    }

    #[tokio::test]
    async fn test_cancel_mid_stream_keeps_prefix() {
        let token = CancelToken::new();
        let text = "w ".repeat(200);
        let canceller = token.clone();
        let mut seen = 0;
        let outcome = animate(&text, Duration::ZERO, Duration::from_millis(1), &token, |_| {
            seen += 1;
            if seen == 3 {
                canceller.cancel();
            }
        })
        .await;

        match outcome {
            TypingOutcome::Stopped(shown) => {
                assert_eq!(shown, "w w");
                assert!(shown.len() < text.len());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
