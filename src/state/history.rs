use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ExchangeId(u64);

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus {
    /// The answer is still being appended by the owning session.
    Open,
    /// The answer is complete and immutable.
    Sealed,
}

/// One question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exchange {
    id: ExchangeId,
    created_at: DateTime<Utc>,
    context: String,
    context_labels: Vec<String>,
    question: String,
    answer: String,
    status: ExchangeStatus,
}

impl Exchange {
    pub fn id(&self) -> ExchangeId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn context_labels(&self) -> &[String] {
        &self.context_labels
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn status(&self) -> ExchangeStatus {
        self.status
    }

    pub fn is_sealed(&self) -> bool {
        self.status == ExchangeStatus::Sealed
    }
}

/// Chronological sequence of exchanges with at most one open slot.
#[derive(Debug, Clone, Default)]
pub struct History {
    exchanges: Vec<Exchange>,
    open: Option<ExchangeId>,
    next_id: u64,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new exchange with an empty answer and make it the open one.
    ///
    /// Returns the id of the exchange that is still open if there is one.
    pub fn open_exchange(
        &mut self,
        question: String,
        context: String,
        context_labels: Vec<String>,
    ) -> Result<ExchangeId, ExchangeId> {
        if let Some(open) = self.open {
            return Err(open);
        }

        self.next_id += 1;
        let id = ExchangeId(self.next_id);
        self.exchanges.push(Exchange {
            id,
            created_at: Utc::now(),
            context,
            context_labels,
            question,
            answer: String::new(),
            status: ExchangeStatus::Open,
        });
        self.open = Some(id);
        Ok(id)
    }

    /// Append to the answer of `id`. Only the open exchange accepts text.
    pub fn append_answer(&mut self, id: ExchangeId, delta: &str) -> bool {
        if self.open != Some(id) {
            return false;
        }
        match self.exchanges.last_mut() {
            Some(exchange) if exchange.id == id => {
                exchange.answer.push_str(delta);
                true
            }
            _ => false,
        }
    }

    pub fn seal(&mut self, id: ExchangeId) -> bool {
        if self.open != Some(id) {
            return false;
        }
        self.open = None;
        match self.exchanges.iter_mut().rev().find(|e| e.id == id) {
            Some(exchange) => {
                exchange.status = ExchangeStatus::Sealed;
                true
            }
            None => false,
        }
    }

    /// Remove `id` entirely, dropping any partial answer.
    pub fn discard(&mut self, id: ExchangeId) -> Option<Exchange> {
        if self.open == Some(id) {
            self.open = None;
        }
        let index = self.exchanges.iter().rposition(|e| e.id == id)?;
        Some(self.exchanges.remove(index))
    }

    pub fn get(&self, id: ExchangeId) -> Option<&Exchange> {
        self.exchanges.iter().find(|e| e.id == id)
    }

    pub fn sealed(&self) -> impl Iterator<Item = &Exchange> {
        self.exchanges.iter().filter(|e| e.is_sealed())
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}
