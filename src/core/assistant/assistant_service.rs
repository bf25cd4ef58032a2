// The assistant service ties the pipeline together:
// load knowledge once -> per question: retrieve -> generate -> detect contact intent.
//
// Initialization runs in a single background task. Its result is published
// through a OnceLock and announced on a watch channel, so readers either see the
// complete knowledge base or wait; they never see a half-built one.

use super::fallback::{apology_answer, detect_contact_intent, fallback_answer};
use super::generation::AnswerGenerator;
use super::knowledge::{load_corpus, KnowledgeBase, KnowledgeError, KnowledgeSource};
use super::models::{AnswerSource, AssistantOptions, AssistantReply, ServiceStatus};
use super::providers::{AiProviders, EmbeddingProvider};
use super::retrieval::Retriever;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::sync::watch;

// ============================================================================
// ERRORS
// ============================================================================

/// Failures caught at the `get_response` boundary. Callers never see these.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Answering took longer than {0:?}")]
    Timeout(std::time::Duration),

    #[error("Initialization task went away before finishing")]
    InitializationLost,
}

struct ServiceInner {
    source: Arc<dyn KnowledgeSource>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    generator: AnswerGenerator,
    options: AssistantOptions,
    knowledge: OnceLock<Arc<KnowledgeBase>>,
    status: watch::Sender<ServiceStatus>,
    started: AtomicBool,
}

/// Cheap-to-clone handle to the question-answering pipeline.
#[derive(Clone)]
pub struct AssistantService {
    inner: Arc<ServiceInner>,
}

impl AssistantService {
    /// Creates the service and starts loading knowledge in the background.
    ///
    /// Outside a Tokio runtime the load starts on the first call to
    /// [`initialize`](Self::initialize) or [`get_response`](Self::get_response).
    pub fn new(
        source: Arc<dyn KnowledgeSource>,
        providers: AiProviders,
        options: AssistantOptions,
    ) -> Self {
        let (status, _) = watch::channel(ServiceStatus::Initializing);
        let generator = AnswerGenerator::new(
            providers.completer,
            options.profile.clone(),
            options.generation.clone(),
            options.provider_timeout,
        );

        let service = Self {
            inner: Arc::new(ServiceInner {
                source,
                embedder: providers.embedder,
                generator,
                options,
                knowledge: OnceLock::new(),
                status,
                started: AtomicBool::new(false),
            }),
        };

        if tokio::runtime::Handle::try_current().is_ok() {
            service.start();
        }
        service
    }

    /// Non-blocking status check.
    pub fn get_status(&self) -> ServiceStatus {
        *self.inner.status.borrow()
    }

    /// Starts initialization if nobody has yet, then waits for it to finish.
    ///
    /// Repeated and concurrent calls all wait on the same task.
    pub async fn initialize(&self) -> ServiceStatus {
        self.start();

        let mut rx = self.inner.status.subscribe();
        let result = rx.wait_for(|status| status.is_terminal()).await.map(|s| *s);
        match result {
            Ok(status) => status,
            Err(_) => {
                tracing::error!("{}", AssistantError::InitializationLost);
                ServiceStatus::Error
            }
        }
    }

    fn start(&self) {
        if self
            .inner
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let build = tokio::spawn(build_knowledge_base(Arc::clone(&inner)));

            let status = match build.await {
                Ok(Ok(kb)) => {
                    let _ = inner.knowledge.set(Arc::new(kb));
                    ServiceStatus::Ready
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Error initializing assistant knowledge");
                    ServiceStatus::Error
                }
                Err(e) => {
                    tracing::error!(error = %e, "Assistant initialization task failed");
                    ServiceStatus::Error
                }
            };

            tracing::info!(%status, "Assistant initialization finished");
            inner.status.send_replace(status);
        });
    }

    /// Answers `question`. Always returns a usable reply.
    pub async fn get_response(&self, question: &str) -> AssistantReply {
        tracing::info!(question, "Processing question");

        match self.try_respond(question).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Answering failed, returning apology");
                AssistantReply {
                    answer: apology_answer(&self.inner.options.profile),
                    suggest_contact: true,
                    source: AnswerSource::Apology,
                }
            }
        }
    }

    async fn try_respond(&self, question: &str) -> Result<AssistantReply, AssistantError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AssistantError::EmptyQuestion);
        }

        if self.initialize().await != ServiceStatus::Ready {
            tracing::info!("Knowledge base unavailable, using canned answer");
            let answer = fallback_answer(question, &self.inner.options.profile);
            return Ok(reply(question, answer, AnswerSource::Canned));
        }

        let knowledge = self
            .inner
            .knowledge
            .get()
            .cloned()
            .ok_or(AssistantError::InitializationLost)?;

        let timeout = self.inner.options.request_timeout;
        tokio::time::timeout(timeout, self.answer_from(&knowledge, question))
            .await
            .map_err(|_| AssistantError::Timeout(timeout))
    }

    async fn answer_from(&self, knowledge: &KnowledgeBase, question: &str) -> AssistantReply {
        let options = &self.inner.options;
        let retriever = Retriever::new(
            knowledge.chunks(),
            self.inner.embedder.as_deref(),
            options.retrieval.top_k,
            options.provider_timeout,
        );

        let retrieval = retriever.retrieve(question).await;
        tracing::info!(
            chunks = retrieval.chunks.len(),
            strategy = ?retrieval.strategy,
            "Found relevant knowledge chunks"
        );

        let generated = self
            .inner
            .generator
            .generate(&retrieval.chunks, question)
            .await;
        reply(question, generated.text, generated.source)
    }
}

fn reply(question: &str, answer: String, source: AnswerSource) -> AssistantReply {
    let suggest_contact = detect_contact_intent(question, &answer);
    AssistantReply {
        answer,
        suggest_contact,
        source,
    }
}

async fn build_knowledge_base(inner: Arc<ServiceInner>) -> Result<KnowledgeBase, KnowledgeError> {
    let options = &inner.options;
    tracing::info!("Initializing assistant knowledge base");

    if inner.embedder.is_none() {
        tracing::warn!("No embedding backend configured, retrieval will use keyword matching");
    }

    let corpus = load_corpus(
        inner.source.as_ref(),
        &options.profile,
        options.provider_timeout,
    )
    .await;
    tracing::info!(chars = corpus.chars().count(), "Knowledge corpus loaded");

    let mut kb = KnowledgeBase::from_corpus(&corpus, options.retrieval.max_chunk_chars)?;
    tracing::info!(chunks = kb.len(), "Created knowledge chunks");

    if let Some(embedder) = inner.embedder.as_deref() {
        kb.attach_embeddings(embedder, options.provider_timeout).await;
        tracing::info!(
            embedded = kb.embedded_count(),
            total = kb.len(),
            "Generated chunk embeddings"
        );
    }

    let mode = if inner.embedder.is_some() {
        "full RAG"
    } else {
        "keyword fallback"
    };
    tracing::info!(mode, "Assistant knowledge base ready");

    Ok(kb)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::assistant::knowledge::{BUSINESS_INFO_DOC, BUSINESS_KNOWLEDGE_DOC};
    use crate::core::assistant::models::GenerationConfig;
    use crate::core::assistant::providers::CompletionProvider;
    use async_trait::async_trait;
    use std::error::Error;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    const INFO: &str = "TintLab is located at 10928 Patriot Hwy. \
        Call (540) 891-0696 for a consultation.";
    const KNOWLEDGE: &str = "Ceramic IR film rejects infrared heat without signal interference. \
        CXP film uses nano-hybrid carbon technology. \
        Our lifetime warranty covers bubbling and peeling. \
        Installation usually takes two to four hours.";

    /// Serves the two documents, optionally holding them back until released.
    struct MockSource {
        gate: Option<Arc<Semaphore>>,
        fetches: AtomicUsize,
        fail: bool,
        knowledge: &'static str,
    }

    impl MockSource {
        fn ready() -> Self {
            Self {
                gate: None,
                fetches: AtomicUsize::new(0),
                fail: false,
                knowledge: KNOWLEDGE,
            }
        }
    }

    #[async_trait]
    impl KnowledgeSource for MockSource {
        async fn fetch_document(&self, name: &str) -> Result<String, KnowledgeError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail {
                return Err(KnowledgeError::Status {
                    name: name.to_string(),
                    status: 503,
                });
            }
            match name {
                BUSINESS_INFO_DOC => Ok(INFO.to_string()),
                BUSINESS_KNOWLEDGE_DOC => Ok(self.knowledge.to_string()),
                _ => unreachable!("unexpected document {}", name),
            }
        }
    }

    /// Maps text onto a tiny bag-of-topics vector.
    struct TopicEmbedder {
        fail_queries: bool,
    }

    impl TopicEmbedder {
        fn vector(text: &str) -> Vec<f32> {
            let text = text.to_lowercase();
            ["warranty", "ceramic", "hours", "patriot"]
                .iter()
                .map(|topic| if text.contains(topic) { 1.0 } else { 0.0 })
                .chain(std::iter::once(0.01))
                .collect()
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TopicEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
            // Chunks always end with a terminator; the test queries never do.
            let is_query = !text.ends_with(&['.', '!', '?'][..]);
            if self.fail_queries && is_query {
                return Err("embedding backend down".into());
            }
            Ok(Self::vector(text))
        }
    }

    /// Echoes the prompt context back so tests can see what was retrieved.
    struct EchoCompleter;

    #[async_trait]
    impl CompletionProvider for EchoCompleter {
        async fn complete(
            &self,
            prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<String, Box<dyn Error + Send + Sync>> {
            let context = prompt
                .split("Context: ")
                .nth(1)
                .and_then(|rest| rest.split("\n\nQuestion:").next())
                .unwrap_or_default();
            Ok(format!(" ANSWER FROM: {} ", context))
        }
    }

    struct HangingCompleter;

    #[async_trait]
    impl CompletionProvider for HangingCompleter {
        async fn complete(
            &self,
            _prompt: &str,
            _config: &GenerationConfig,
        ) -> Result<String, Box<dyn Error + Send + Sync>> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    fn offline(source: MockSource) -> AssistantService {
        AssistantService::new(
            Arc::new(source),
            AiProviders::none(),
            AssistantOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_initialization_reaches_ready() {
        let service = offline(MockSource::ready());
        assert_eq!(service.initialize().await, ServiceStatus::Ready);
        assert_eq!(service.get_status(), ServiceStatus::Ready);
        assert_eq!(service.get_status(), ServiceStatus::Ready);
    }

    #[tokio::test]
    async fn test_concurrent_initialize_runs_once() {
        let source = Arc::new(MockSource::ready());
        let service = AssistantService::new(
            source.clone(),
            AiProviders::none(),
            AssistantOptions::default(),
        );

        let (a, b, c) = tokio::join!(service.initialize(), service.initialize(), service.initialize());
        assert_eq!((a, b, c), (ServiceStatus::Ready, ServiceStatus::Ready, ServiceStatus::Ready));
        service.initialize().await;

        // Two documents, fetched exactly once each.
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_questions_wait_for_initialization() {
        let gate = Arc::new(Semaphore::new(0));
        let source = MockSource {
            gate: Some(gate.clone()),
            ..MockSource::ready()
        };
        let service = AssistantService::new(
            Arc::new(source),
            AiProviders::shared(Arc::new(EchoEverything)),
            AssistantOptions::default(),
        );

        assert_eq!(service.get_status(), ServiceStatus::Initializing);

        let pending = tokio::spawn({
            let service = service.clone();
            async move { service.get_response("Tell me about ceramic film").await }
        });

        tokio::task::yield_now().await;
        assert_eq!(service.get_status(), ServiceStatus::Initializing);
        assert!(!pending.is_finished());
        gate.add_permits(2);

        let reply = pending.await.unwrap();
        assert_eq!(reply.source, AnswerSource::Completion);
        assert!(reply.answer.contains("Ceramic IR film"));
        assert_eq!(service.get_status(), ServiceStatus::Ready);
    }

    /// Embeds everything to the same vector and echoes context.
    struct EchoEverything;

    #[async_trait]
    impl EmbeddingProvider for EchoEverything {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
            Ok(vec![1.0])
        }
    }

    #[async_trait]
    impl CompletionProvider for EchoEverything {
        async fn complete(
            &self,
            prompt: &str,
            config: &GenerationConfig,
        ) -> Result<String, Box<dyn Error + Send + Sync>> {
            EchoCompleter.complete(prompt, config).await
        }
    }

    #[tokio::test]
    async fn test_pricing_question_without_key() {
        let service = offline(MockSource::ready());
        let reply = service
            .get_response("How much does ceramic tinting cost?")
            .await;

        assert!(reply.answer.contains("(540) 891-0696"));
        assert!(reply.suggest_contact);
        assert_eq!(reply.source, AnswerSource::Canned);
    }

    #[tokio::test]
    async fn test_hours_question_without_key() {
        let service = offline(MockSource::ready());
        let reply = service.get_response("What are your business hours?").await;

        assert!(reply.answer.contains("Monday"));
        assert!(reply.answer.contains("(540) 891-0696"));
    }

    #[tokio::test]
    async fn test_off_topic_question_without_key() {
        let service = offline(MockSource::ready());
        let reply = service.get_response("What's the weather like today?").await;

        assert_eq!(
            reply.answer,
            fallback_answer("What's the weather like today?", &AssistantOptions::default().profile)
        );
        assert!(reply.answer.contains("10928 Patriot Hwy"));
        assert!(reply.suggest_contact);
    }

    #[tokio::test]
    async fn test_fallback_is_deterministic() {
        let service = offline(MockSource::ready());
        let first = service.get_response("Do you tint boats?").await;
        let second = service.get_response("Do you tint boats?").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_quote_always_suggests_contact() {
        let offline_service = offline(MockSource::ready());
        let reply = offline_service.get_response("Can I get a quote for my truck?").await;
        assert!(reply.suggest_contact);

        let online = AssistantService::new(
            Arc::new(MockSource::ready()),
            AiProviders::shared(Arc::new(EchoEverything)),
            AssistantOptions::default(),
        );
        let reply = online.get_response("Can I get a quote on ceramic film?").await;
        assert_eq!(reply.source, AnswerSource::Completion);
        assert!(reply.suggest_contact);
    }

    #[tokio::test]
    async fn test_embedding_retrieval_feeds_completion() {
        let embedder = Arc::new(TopicEmbedder {
            fail_queries: false,
        });
        let service = AssistantService::new(
            Arc::new(MockSource::ready()),
            AiProviders {
                embedder: Some(embedder),
                completer: Some(Arc::new(EchoCompleter)),
            },
            AssistantOptions {
                retrieval: crate::core::assistant::models::RetrievalConfig {
                    top_k: 1,
                    max_chunk_chars: 80,
                },
                ..AssistantOptions::default()
            },
        );

        let reply = service.get_response("Is there a warranty?").await;
        assert_eq!(reply.source, AnswerSource::Completion);
        assert_eq!(
            reply.answer,
            "ANSWER FROM: Our lifetime warranty covers bubbling and peeling."
        );
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_keyword_context() {
        let embedder = Arc::new(TopicEmbedder { fail_queries: true });
        let service = AssistantService::new(
            Arc::new(MockSource::ready()),
            AiProviders {
                embedder: Some(embedder),
                completer: Some(Arc::new(EchoCompleter)),
            },
            AssistantOptions {
                retrieval: crate::core::assistant::models::RetrievalConfig {
                    top_k: 3,
                    max_chunk_chars: 80,
                },
                ..AssistantOptions::default()
            },
        );

        let reply = service.get_response("cxp").await;
        assert_eq!(reply.source, AnswerSource::Completion);
        assert!(reply.answer.contains("CXP film uses nano-hybrid carbon technology."));
    }

    #[tokio::test]
    async fn test_unreachable_documents_still_answer() {
        let source = MockSource {
            fail: true,
            ..MockSource::ready()
        };
        let service = AssistantService::new(
            Arc::new(source),
            AiProviders {
                embedder: None,
                completer: Some(Arc::new(EchoCompleter)),
            },
            AssistantOptions::default(),
        );

        assert_eq!(service.initialize().await, ServiceStatus::Ready);
        let reply = service.get_response("What films do you offer?").await;
        assert_eq!(reply.source, AnswerSource::Completion);
        assert!(reply.answer.contains("SunTek Premium Films"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_documents_do_not_block_initialization() {
        struct StalledSource;

        #[async_trait]
        impl KnowledgeSource for StalledSource {
            async fn fetch_document(&self, _name: &str) -> Result<String, KnowledgeError> {
                std::future::pending().await
            }
        }

        let service = AssistantService::new(
            Arc::new(StalledSource),
            AiProviders::none(),
            AssistantOptions {
                provider_timeout: Duration::from_secs(5),
                request_timeout: Duration::from_secs(10),
                ..AssistantOptions::default()
            },
        );

        let reply = tokio::time::timeout(
            Duration::from_secs(3600),
            service.get_response("What are your hours?"),
        )
        .await
        .expect("get_response must finish while the source is stalled");

        assert_eq!(service.get_status(), ServiceStatus::Ready);
        assert_eq!(reply.source, AnswerSource::Canned);
        assert!(reply.answer.contains("9:00 AM"));
    }

    #[tokio::test]
    async fn test_empty_corpus_is_error_state_with_canned_answers() {
        struct PunctuationSource;

        #[async_trait]
        impl KnowledgeSource for PunctuationSource {
            async fn fetch_document(&self, _name: &str) -> Result<String, KnowledgeError> {
                Ok("... !?".to_string())
            }
        }

        let service = AssistantService::new(
            Arc::new(PunctuationSource),
            AiProviders::shared(Arc::new(EchoEverything)),
            AssistantOptions::default(),
        );

        assert_eq!(service.initialize().await, ServiceStatus::Error);
        assert_eq!(service.get_status(), ServiceStatus::Error);

        let reply = service.get_response("Where is your address?").await;
        assert_eq!(reply.source, AnswerSource::Canned);
        assert!(reply.answer.contains("Patriot Hwy"));
        assert_eq!(service.get_status(), ServiceStatus::Error);
    }

    #[tokio::test]
    async fn test_empty_question_returns_apology() {
        let service = offline(MockSource::ready());
        let reply = service.get_response("   ").await;

        assert_eq!(reply.source, AnswerSource::Apology);
        assert!(reply.answer.contains("(540) 891-0696"));
        assert!(reply.suggest_contact);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_backend_is_bounded() {
        let service = AssistantService::new(
            Arc::new(MockSource::ready()),
            AiProviders {
                embedder: None,
                completer: Some(Arc::new(HangingCompleter)),
            },
            AssistantOptions {
                provider_timeout: Duration::from_secs(5),
                request_timeout: Duration::from_secs(60),
                ..AssistantOptions::default()
            },
        );

        let reply = service.get_response("Tell me about ceramic film").await;
        // The completion call times out and the canned answer takes over.
        assert_eq!(reply.source, AnswerSource::Canned);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_timeout_returns_apology() {
        let service = AssistantService::new(
            Arc::new(MockSource::ready()),
            AiProviders {
                embedder: None,
                completer: Some(Arc::new(HangingCompleter)),
            },
            AssistantOptions {
                provider_timeout: Duration::from_secs(120),
                request_timeout: Duration::from_secs(10),
                ..AssistantOptions::default()
            },
        );

        let reply = service.get_response("Tell me about ceramic film").await;
        assert_eq!(reply.source, AnswerSource::Apology);
        assert!(reply.suggest_contact);
    }
}
