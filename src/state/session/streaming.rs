use super::state::{ActiveSession, ControllerHandle, Phase, SessionCommand, SessionEvent};
use super::SessionController;
use crate::api::stream::{decode_chunk, finish};
use crate::api::{ByteStream, CompletionError};
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub(super) enum Step {
    Opened(ByteStream),
    Chunk(Bytes),
    Finished,
    Failed(CompletionError),
    Cancelled,
}

enum Wake {
    Command(Option<SessionCommand>),
    Step(Step),
    Shutdown,
}

/// Wait for the next thing the active session does. Cancellation is checked
/// before every suspension.
pub(super) async fn next_step(active: &mut ActiveSession) -> Step {
    let cancel = active.cancel.clone();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Step::Cancelled,
        step = advance(&mut active.phase) => step,
    }
}

async fn advance(phase: &mut Phase) -> Step {
    match phase {
        Phase::Requesting(request) => match request.await {
            Ok(body) => Step::Opened(body),
            Err(error) if error.is_cancelled() => Step::Cancelled,
            Err(error) => Step::Failed(error),
        },
        Phase::Streaming { body, .. } => match body.next().await {
            Some(Ok(chunk)) => Step::Chunk(chunk),
            Some(Err(error)) => Step::Failed(error),
            None => Step::Finished,
        },
    }
}

impl SessionController {
    pub(super) fn apply_step(&mut self, step: Step) -> Option<SessionEvent> {
        match step {
            Step::Opened(body) => {
                let active = self.active.as_mut()?;
                tracing::debug!(generation = active.generation, "session streaming");
                active.phase = Phase::Streaming {
                    body,
                    carry: Default::default(),
                };
                None
            }
            Step::Chunk(chunk) => {
                let active = self.active.as_mut()?;
                let Phase::Streaming { carry, .. } = &mut active.phase else {
                    return None;
                };
                let (deltas, next_carry) = decode_chunk(&chunk, std::mem::take(carry));
                *carry = next_carry;
                let exchange = active.exchange;
                self.append_deltas(exchange, deltas)
            }
            Step::Finished => {
                let active = self.active.as_mut()?;
                if let Phase::Streaming { carry, .. } = &mut active.phase {
                    let tail = finish(std::mem::take(carry));
                    let exchange = active.exchange;
                    self.append_deltas(exchange, tail);
                }
                self.seal_active()
            }
            Step::Failed(error) => self.discard_active(error),
            Step::Cancelled => self.discard_active(CompletionError::Cancelled),
        }
    }

    /// Drive the active session until it produces an event. Returns `None`
    /// when nothing is in flight.
    pub async fn pump(&mut self) -> Option<SessionEvent> {
        loop {
            let step = next_step(self.active.as_mut()?).await;
            if let Some(event) = self.apply_step(step) {
                return Some(event);
            }
        }
    }

    /// Own the history on this task until every handle is dropped or the
    /// shutdown token fires. Commands win over stream progress, so a new
    /// submission always supersedes before another chunk is applied.
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        let shutdown = self.shutdown.clone();
        loop {
            let wake = {
                let step = async {
                    match self.active.as_mut() {
                        Some(active) => next_step(active).await,
                        None => std::future::pending().await,
                    }
                };
                tokio::select! {
                    biased;
                    command = commands.recv() => Wake::Command(command),
                    step = step => Wake::Step(step),
                    _ = shutdown.cancelled() => Wake::Shutdown,
                }
            };

            match wake {
                Wake::Command(Some(command)) => self.handle_command(command),
                Wake::Command(None) | Wake::Shutdown => {
                    self.cancel();
                    break;
                }
                Wake::Step(step) => {
                    self.apply_step(step);
                }
            }
        }
        tracing::debug!("session controller stopped");
    }

    pub fn spawn(self) -> (ControllerHandle, JoinHandle<()>) {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let handle = ControllerHandle {
            commands,
            view_rx: self.subscribe(),
        };
        (handle, tokio::spawn(self.run(commands_rx)))
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Submit { question, context } => {
                if let Err(error) = self.submit(question, context) {
                    tracing::warn!(%error, "submission rejected");
                }
            }
            SessionCommand::Cancel => {
                self.cancel();
            }
        }
    }
}
