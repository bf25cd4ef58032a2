// Canned question battery for checking, by eye, whether the assistant answers
// from the knowledge base or drops to the fallback.

use super::assistant_service::AssistantService;
use super::models::AssistantReply;
use serde::Serialize;
use std::time::Instant;

pub struct QuestionCategory {
    pub name: &'static str,
    pub questions: &'static [&'static str],
}

pub const DIAGNOSTIC_QUESTIONS: &[QuestionCategory] = &[
    QuestionCategory {
        name: "Knowledge Base Test",
        questions: &[
            "What's the difference between CXP and Ceramic IR film?",
            "Do you offer nation-wide warranty coverage?",
            "What's your exact address in Fredericksburg?",
            "How many years of experience do you have?",
            "What SunTek films do you use?",
            "What's included in your lifetime warranty?",
        ],
    },
    QuestionCategory {
        name: "Fallback Test",
        questions: &[
            "What's the weather like today?",
            "How do I cook pasta?",
            "What's the capital of France?",
        ],
    },
    QuestionCategory {
        name: "Business Questions",
        questions: &[
            "How long does installation take?",
            "What are your business hours?",
            "How much does ceramic tinting cost?",
            "Do you tint commercial buildings?",
        ],
    },
];

/// Answers shorter than this that mention the phone number read as fallbacks.
const FALLBACK_MAX_CHARS: usize = 200;

/// Text-only guess at how an answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Rag,
    Fallback,
}

impl ReplyKind {
    pub fn classify(answer: &str, phone: &str) -> Self {
        if answer.contains(phone) && answer.chars().count() < FALLBACK_MAX_CHARS {
            ReplyKind::Fallback
        } else {
            ReplyKind::Rag
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticResult {
    pub category: &'static str,
    pub question: &'static str,
    pub kind: ReplyKind,
    pub elapsed_ms: u64,
    pub reply: AssistantReply,
}

/// Runs every diagnostic question through `service`, one at a time.
pub async fn run_diagnostics(service: &AssistantService, phone: &str) -> Vec<DiagnosticResult> {
    let mut results = Vec::new();

    for category in DIAGNOSTIC_QUESTIONS {
        for &question in category.questions {
            let started = Instant::now();
            let reply = service.get_response(question).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            tracing::debug!(question, elapsed_ms, "Diagnostic question answered");
            results.push(DiagnosticResult {
                category: category.name,
                question,
                kind: ReplyKind::classify(&reply.answer, phone),
                elapsed_ms,
                reply,
            });
        }
    }

    results
}
