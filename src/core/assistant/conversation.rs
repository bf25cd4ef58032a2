//! In-memory transcript for one chat session.
//!
//! The assistant itself is stateless per question; this is what the chat
//! surface keeps so it can render the conversation and the contact actions.

use super::models::AssistantReply;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const GREETING: &str = "Hello! I'm here to help you with any questions about our window tinting services. How can I assist you today?";

/// Suggested openers shown before the first question.
pub const QUICK_QUESTIONS: &[&str] = &[
    "What types of tint do you offer?",
    "How long does installation take?",
    "What's included in the warranty?",
    "I'd like to get a quote for my vehicle",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationMessage {
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Only ever true on assistant messages.
    pub show_contact_buttons: bool,
}

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ConversationMessage>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Starts a transcript with the assistant's greeting.
    pub fn new() -> Self {
        let mut conversation = Self {
            messages: Vec::new(),
        };
        conversation.push(Sender::Assistant, GREETING.to_string(), false);
        conversation
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    /// Records a user message. Blank input is ignored and returns `None`.
    pub fn push_user(&mut self, text: &str) -> Option<&ConversationMessage> {
        if text.trim().is_empty() {
            return None;
        }
        Some(self.push(Sender::User, text.to_string(), false))
    }

    pub fn push_reply(&mut self, reply: &AssistantReply) -> &ConversationMessage {
        self.push(Sender::Assistant, reply.answer.clone(), reply.suggest_contact)
    }

    fn push(&mut self, sender: Sender, text: String, show_contact_buttons: bool) -> &ConversationMessage {
        let id = self.messages.len() as u64 + 1;
        self.messages.push(ConversationMessage {
            id,
            sender,
            text,
            timestamp: Utc::now(),
            show_contact_buttons,
        });
        &self.messages[self.messages.len() - 1]
    }
}
