use super::super::history::{Exchange, ExchangeId, History};
use crate::api::stream::DecoderCarry;
use crate::api::{ApiClient, ByteStream, CompletionError};
use crate::context::AssembledContext;
use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Incremental notifications for a presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started {
        exchange: ExchangeId,
    },
    Delta {
        exchange: ExchangeId,
        text: String,
    },
    Sealed {
        exchange: ExchangeId,
    },
    /// The exchange was removed. `error` is `None` for cancellation.
    Discarded {
        exchange: ExchangeId,
        error: Option<String>,
    },
    /// The submission never started a session.
    PreconditionFailed {
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Requesting,
    Streaming,
}

/// Read-only snapshot republished after every change to the history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub exchanges: Vec<Exchange>,
    pub loading: bool,
    pub last_error: Option<String>,
}

pub enum SessionCommand {
    Submit {
        question: String,
        context: AssembledContext,
    },
    Cancel,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Completion(#[from] CompletionError),
    #[error("exchange {0} is still open")]
    ExchangeStillOpen(ExchangeId),
}

pub(super) type PendingRequest = BoxFuture<'static, Result<ByteStream, CompletionError>>;

pub(super) enum Phase {
    Requesting(PendingRequest),
    Streaming {
        body: ByteStream,
        carry: DecoderCarry,
    },
}

/// The one in-flight request. Dropping it closes the transport.
pub(super) struct ActiveSession {
    pub(super) generation: u64,
    pub(super) exchange: ExchangeId,
    pub(super) cancel: CancellationToken,
    pub(super) phase: Phase,
}

pub struct SessionController {
    pub(super) client: ApiClient,
    pub(super) history: History,
    pub(super) active: Option<ActiveSession>,
    pub(super) shutdown: CancellationToken,
    pub(super) last_error: Option<String>,
    pub(super) generation: u64,
    pub(super) view_tx: watch::Sender<SessionView>,
    pub(super) event_tx: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl SessionController {
    pub fn new(client: ApiClient) -> Self {
        let (view_tx, _view_rx) = watch::channel(SessionView::default());
        Self {
            client,
            history: History::new(),
            active: None,
            shutdown: CancellationToken::new(),
            last_error: None,
            generation: 0,
            view_tx,
            event_tx: None,
        }
    }

    /// Sessions are cancelled when `shutdown` is.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_events(mut self, event_tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.active.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        match self.active.as_ref().map(|active| &active.phase) {
            None => SessionPhase::Idle,
            Some(Phase::Requesting(_)) => SessionPhase::Requesting,
            Some(Phase::Streaming { .. }) => SessionPhase::Streaming,
        }
    }

    pub(super) fn publish(&self) {
        self.view_tx.send_replace(SessionView {
            exchanges: self.history.exchanges().to_vec(),
            loading: self.is_loading(),
            last_error: self.last_error.clone(),
        });
    }

    pub(super) fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

/// Cloneable front for a controller running on its own task.
#[derive(Clone)]
pub struct ControllerHandle {
    pub(super) commands: mpsc::UnboundedSender<SessionCommand>,
    pub(super) view_rx: watch::Receiver<SessionView>,
}

impl ControllerHandle {
    pub fn submit(&self, question: impl Into<String>, context: AssembledContext) -> bool {
        self.commands
            .send(SessionCommand::Submit {
                question: question.into(),
                context,
            })
            .is_ok()
    }

    pub fn cancel(&self) -> bool {
        self.commands.send(SessionCommand::Cancel).is_ok()
    }

    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }
}
