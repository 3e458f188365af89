use super::super::history::ExchangeId;
use super::state::{ActiveSession, PendingRequest, Phase, SessionError, SessionEvent};
use super::SessionController;
use crate::api::request::build_messages;
use crate::api::CompletionError;
use crate::context::AssembledContext;

impl SessionController {
    /// Start a new request for `question` over `context`.
    ///
    /// Empty input is ignored (`Ok(None)`); whitespace counts as content. A
    /// missing credential fails before anything changes. Otherwise the
    /// in-flight request, if any, is cancelled and its exchange discarded
    /// before the new exchange is appended.
    pub fn submit(
        &mut self,
        question: impl Into<String>,
        context: AssembledContext,
    ) -> Result<Option<ExchangeId>, SessionError> {
        let question = question.into();
        if question.is_empty() || context.text.is_empty() {
            tracing::debug!("ignoring submission with empty question or context");
            return Ok(None);
        }

        let api_key = match self.client.api_key() {
            Ok(api_key) => api_key,
            Err(error) => {
                tracing::warn!(%error, "session precondition failed");
                let message = error.to_string();
                self.last_error = Some(message.clone());
                self.publish();
                self.emit(SessionEvent::PreconditionFailed { error: message });
                return Err(error.into());
            }
        };

        self.supersede_active();

        let messages = build_messages(&self.history, &question, &context.text);
        let exchange = self
            .history
            .open_exchange(question, context.text, context.labels)
            .map_err(SessionError::ExchangeStillOpen)?;

        self.generation += 1;
        let cancel = self.shutdown.child_token();
        let request_cancel = cancel.clone();
        let client = self.client.clone();
        let request: PendingRequest = Box::pin(async move {
            client
                .create_stream(&messages, &api_key, &request_cancel)
                .await
        });

        self.active = Some(ActiveSession {
            generation: self.generation,
            exchange,
            cancel,
            phase: Phase::Requesting(request),
        });
        self.last_error = None;
        tracing::debug!(generation = self.generation, %exchange, "session requesting");
        self.publish();
        self.emit(SessionEvent::Started { exchange });
        Ok(Some(exchange))
    }

    /// Abort the in-flight request without surfacing an error.
    pub fn cancel(&mut self) -> bool {
        self.supersede_active().is_some()
    }

    fn supersede_active(&mut self) -> Option<ExchangeId> {
        let active = self.active.take()?;
        active.cancel.cancel();
        let exchange = active.exchange;
        self.history.discard(exchange);
        tracing::debug!(generation = active.generation, %exchange, "session cancelled");
        drop(active);

        self.publish();
        self.emit(SessionEvent::Discarded {
            exchange,
            error: None,
        });
        Some(exchange)
    }

    pub(super) fn append_deltas(
        &mut self,
        exchange: ExchangeId,
        deltas: Vec<String>,
    ) -> Option<SessionEvent> {
        let text = deltas.concat();
        if text.is_empty() || !self.history.append_answer(exchange, &text) {
            return None;
        }

        self.publish();
        let event = SessionEvent::Delta { exchange, text };
        self.emit(event.clone());
        Some(event)
    }

    pub(super) fn seal_active(&mut self) -> Option<SessionEvent> {
        let active = self.active.take()?;
        let exchange = active.exchange;
        self.history.seal(exchange);
        tracing::debug!(generation = active.generation, %exchange, "session sealed");

        self.publish();
        let event = SessionEvent::Sealed { exchange };
        self.emit(event.clone());
        Some(event)
    }

    /// Roll back the open exchange. Cancellation leaves the error slot alone.
    pub(super) fn discard_active(&mut self, error: CompletionError) -> Option<SessionEvent> {
        let active = self.active.take()?;
        let exchange = active.exchange;
        self.history.discard(exchange);

        let error = if error.is_cancelled() {
            tracing::debug!(generation = active.generation, %exchange, "session cancelled");
            None
        } else {
            tracing::warn!(generation = active.generation, %exchange, %error, "session discarded");
            let message = error.to_string();
            self.last_error = Some(message.clone());
            Some(message)
        };

        self.publish();
        let event = SessionEvent::Discarded { exchange, error };
        self.emit(event.clone());
        Some(event)
    }
}
