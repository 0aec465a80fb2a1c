use super::scroll::ScrollFollow;
use super::toast::Toasts;
use super::transcript::{Message, Transcript};
use super::transport::{ChatError, ChatTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub(crate) const ERROR_REPLY: &str = "Error: Failed to connect to the server.";
pub(crate) const ERROR_TOAST_TITLE: &str = "Connection Error";
pub(crate) const ERROR_TOAST_BODY: &str = "Failed to reach the AI assistant. Please try again later.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Idle,
    Sending,
}

#[derive(Debug)]
struct Settled {
    exchange: u64,
    result: Result<String, ChatError>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct ControllerOptions {
    pub(crate) request_timeout: Duration,
    pub(crate) scroll_threshold: usize,
    pub(crate) toast_ttl: Duration,
}

/// Owns the transcript and at most one outstanding exchange. Results come
/// back over a channel and are applied by [`ChatController::poll`], so the
/// transcript is only touched from the caller's task.
pub(crate) struct ChatController<T: ChatTransport> {
    transport: Arc<T>,
    opts: ControllerOptions,
    transcript: Transcript,
    input: String,
    phase: Phase,
    exchange: u64,
    in_flight: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Settled>,
    rx: mpsc::UnboundedReceiver<Settled>,
    scroll: ScrollFollow,
    toasts: Toasts,
}

impl<T: ChatTransport> ChatController<T> {
    pub(crate) fn new(transport: T, opts: ControllerOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            transport: Arc::new(transport),
            opts,
            transcript: Transcript::default(),
            input: String::new(),
            phase: Phase::Idle,
            exchange: 0,
            in_flight: None,
            tx,
            rx,
            scroll: ScrollFollow::new(opts.scroll_threshold),
            toasts: Toasts::new(opts.toast_ttl),
        }
    }

    pub(crate) fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub(crate) fn input(&self) -> &str {
        &self.input
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.phase == Phase::Sending
    }

    pub(crate) fn can_submit(&self) -> bool {
        !self.is_busy() && !self.input.trim().is_empty()
    }

    pub(crate) fn scroll(&self) -> &ScrollFollow {
        &self.scroll
    }

    pub(crate) fn scroll_mut(&mut self) -> &mut ScrollFollow {
        &mut self.scroll
    }

    pub(crate) fn toasts(&self) -> &Toasts {
        &self.toasts
    }

    pub(crate) fn toasts_mut(&mut self) -> &mut Toasts {
        &mut self.toasts
    }

    // input is read-only while a reply is pending
    pub(crate) fn insert_char(&mut self, ch: char) {
        if !self.is_busy() {
            self.input.push(ch);
        }
    }

    pub(crate) fn backspace(&mut self) {
        if !self.is_busy() {
            self.input.pop();
        }
    }

    #[cfg(test)]
    pub(crate) fn set_input(&mut self, text: &str) {
        if !self.is_busy() {
            self.input = text.to_string();
        }
    }

    /// Sends the current input. Returns false (and changes nothing) when a
    /// reply is still pending or the input is blank.
    pub(crate) fn submit(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return false;
        }

        if !self.transcript.push(Message::user(text.clone())) || !self.transcript.push_placeholder() {
            warn!("transcript still awaiting a reply; not sending");
            return false;
        }
        self.input.clear();
        self.phase = Phase::Sending;
        self.exchange += 1;

        let exchange = self.exchange;
        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        let timeout = self.opts.request_timeout;
        info!(exchange, chars = text.chars().count(), "sending chat message");
        self.in_flight = Some(tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, transport.send(text)).await {
                Ok(r) => r,
                Err(_) => Err(ChatError::Timeout(timeout)),
            };
            // receiver gone means the controller was dropped; nothing to do
            let _ = tx.send(Settled { exchange, result });
        }));
        true
    }

    /// Applies any settled exchange. Returns true if the transcript changed.
    pub(crate) fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(settled) = self.rx.try_recv() {
            changed |= self.apply(settled);
        }
        changed
    }

    /// Waits for the pending exchange to settle and applies it.
    #[cfg(test)]
    pub(crate) async fn wait_settled(&mut self) {
        while self.is_busy() {
            match self.rx.recv().await {
                Some(settled) => {
                    self.apply(settled);
                }
                None => break,
            }
        }
    }

    fn apply(&mut self, settled: Settled) -> bool {
        if !self.is_busy() || settled.exchange != self.exchange {
            warn!(exchange = settled.exchange, "dropping reply for a stale exchange");
            return false;
        }
        self.in_flight = None;
        self.phase = Phase::Idle;
        match settled.result {
            Ok(reply) => {
                info!(exchange = settled.exchange, chars = reply.chars().count(), "reply received");
                self.transcript.settle(Message::bot(reply));
            }
            Err(err) => {
                warn!(exchange = settled.exchange, error = %err, "chat exchange failed");
                self.transcript.settle(Message::bot(ERROR_REPLY));
                self.toasts.raise(ERROR_TOAST_TITLE, ERROR_TOAST_BODY);
            }
        }
        true
    }

    /// Aborts the pending exchange, if any, and removes its placeholder.
    /// Used on teardown.
    pub(crate) fn shutdown(&mut self) {
        if let Some(task) = self.in_flight.take() {
            info!(exchange = self.exchange, "aborting in-flight exchange");
            task.abort();
        }
        self.transcript.discard_placeholder();
        self.phase = Phase::Idle;
        self.exchange += 1;
    }
}
