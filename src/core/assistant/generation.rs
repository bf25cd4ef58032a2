use super::fallback::fallback_answer;
use super::models::{AnswerSource, BusinessProfile, GenerationConfig};
use super::providers::CompletionProvider;
use std::sync::Arc;
use std::time::Duration;

/// Answer strategies in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStrategy {
    Completion,
    Canned,
}

impl AnswerStrategy {
    pub const ORDER: [AnswerStrategy; 2] = [AnswerStrategy::Completion, AnswerStrategy::Canned];
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedAnswer {
    pub text: String,
    pub source: AnswerSource,
}

/// Builds the completion prompt from the persona, the retrieved context and the question.
pub fn build_prompt(profile: &BusinessProfile, context: &[String], question: &str) -> String {
    format!(
        "You are a helpful assistant for {name}, a premium window tinting company in {city}.\n\n\
         Use the following context to answer the question. If you don't know the answer based on the context, say \"I don't have that specific information, but I'd be happy to connect you with our team at {phone} for detailed assistance.\"\n\n\
         Always be friendly, professional, and mention relevant contact information when appropriate.\n\n\
         Context: {context}\n\n\
         Question: {question}\n\n\
         Answer:",
        name = profile.name,
        city = profile.city,
        phone = profile.phone,
        context = context.join("\n\n"),
        question = question,
    )
}

pub struct AnswerGenerator {
    completer: Option<Arc<dyn CompletionProvider>>,
    profile: BusinessProfile,
    config: GenerationConfig,
    timeout: Duration,
}

impl AnswerGenerator {
    pub fn new(
        completer: Option<Arc<dyn CompletionProvider>>,
        profile: BusinessProfile,
        config: GenerationConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            completer,
            profile,
            config,
            timeout,
        }
    }

    fn can_attempt(&self, strategy: AnswerStrategy, context: &[String]) -> bool {
        match strategy {
            AnswerStrategy::Completion => self.completer.is_some() && !context.is_empty(),
            AnswerStrategy::Canned => true,
        }
    }

    async fn attempt(
        &self,
        strategy: AnswerStrategy,
        context: &[String],
        question: &str,
    ) -> Option<String> {
        match strategy {
            AnswerStrategy::Completion => {
                let completer = self.completer.as_ref()?;
                let prompt = build_prompt(&self.profile, context, question);

                match tokio::time::timeout(self.timeout, completer.complete(&prompt, &self.config))
                    .await
                {
                    Ok(Ok(text)) => {
                        let text = text.trim();
                        if text.is_empty() {
                            tracing::warn!("Completion API returned empty text");
                            None
                        } else {
                            Some(text.to_string())
                        }
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "Completion failed, using canned answer");
                        None
                    }
                    Err(_) => {
                        tracing::warn!("Completion timed out, using canned answer");
                        None
                    }
                }
            }
            AnswerStrategy::Canned => Some(fallback_answer(question, &self.profile)),
        }
    }

    /// Answers `question` with the first strategy that can run and produces text.
    pub async fn generate(&self, context: &[String], question: &str) -> GeneratedAnswer {
        for strategy in AnswerStrategy::ORDER {
            if !self.can_attempt(strategy, context) {
                continue;
            }
            if let Some(text) = self.attempt(strategy, context, question).await {
                let source = match strategy {
                    AnswerStrategy::Completion => AnswerSource::Completion,
                    AnswerStrategy::Canned => AnswerSource::Canned,
                };
                return GeneratedAnswer { text, source };
            }
        }

        // Canned always produces text, so this is only reached if ORDER changes.
        GeneratedAnswer {
            text: fallback_answer(question, &self.profile),
            source: AnswerSource::Canned,
        }
    }
}
