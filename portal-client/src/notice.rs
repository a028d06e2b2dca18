//! Transient status messages with owned, cancellable dismissal timers.

use std::{fmt, time::Duration};

use tokio_util::sync::CancellationToken;

/// Tone of a transient message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A completed action.
    Success,
    /// A failed or refused action.
    Error,
    /// Neutral information, e.g. a logout confirmation.
    Info,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        })
    }
}

/// A message shown for a fixed duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransientMessage {
    /// Text shown to the user.
    pub text: String,
    /// Tone of the message.
    pub kind: MessageKind,
}

impl TransientMessage {
    /// A success message.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Success,
        }
    }

    /// An error message.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Error,
        }
    }

    /// An informational message.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: MessageKind::Info,
        }
    }
}

/// Holds at most one visible message and the timer that will clear it.
///
/// Showing a message cancels the previous timer before arming a new one.
/// Each message gets a generation number; a dismissal is honoured only if
/// it names the current generation, so an expiry that was already queued
/// when it got superseded cannot clear the newer message.
#[derive(Debug, Default)]
pub struct MessageSlot {
    current: Option<TransientMessage>,
    generation: u64,
    timer: Option<CancellationToken>,
}

impl MessageSlot {
    /// The message currently on screen.
    #[must_use]
    pub fn current(&self) -> Option<&TransientMessage> {
        self.current.as_ref()
    }

    /// Generation of the most recently shown message.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replaces the visible message and arms its expiry.
    ///
    /// `on_expire` runs with the message's generation once `ttl` elapses,
    /// unless another message replaced this one first. Must be called from
    /// within a tokio runtime.
    pub fn show<F>(&mut self, message: TransientMessage, ttl: Duration, on_expire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel_timer();
        self.generation += 1;
        let generation = self.generation;

        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(ttl) => on_expire(generation),
            }
        });

        self.current = Some(message);
        self.timer = Some(token);
        generation
    }

    /// Clears the message if `generation` is still the visible one.
    ///
    /// Returns `true` if something was cleared.
    pub fn dismiss(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.current.is_none() {
            return false;
        }
        self.current = None;
        self.timer = None;
        true
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }
}

impl Drop for MessageSlot {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
