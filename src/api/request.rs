use crate::state::History;
use crate::types::{ChatMessage, Role};

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant analyzing code and logs.";

pub fn format_user_turn(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}")
}

/// Ordered message list for a new turn: primer, every sealed exchange, then
/// the new question.
pub fn build_messages(history: &History, question: &str, context: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 2);
    messages.push(ChatMessage::new(Role::System, SYSTEM_PROMPT));

    for exchange in history.sealed() {
        messages.push(ChatMessage::new(
            Role::User,
            format_user_turn(exchange.context(), exchange.question()),
        ));
        messages.push(ChatMessage::new(Role::Assistant, exchange.answer()));
    }

    messages.push(ChatMessage::new(
        Role::User,
        format_user_turn(context, question),
    ));
    messages
}
