//! Retrieval-augmented chat pipeline.
//!
//! Public API: [`ChatPipeline::ask`]. It retrieves the top-K chunks for the
//! question within one country, builds a budgeted prompt with the
//! conversation history, calls the generator and returns the outcome together
//! with the context that was used. It never returns an error: every failure is
//! an [`AnswerOutcome`] variant.

pub mod cfg;
mod error;
pub mod prompt;

mod api_types;

pub use api_types::{AnswerOutcome, AnswerStatus, QaAnswer, RetrievalFailureKind};
pub use cfg::{ContextorConfig, RetrievalFailurePolicy};
pub use error::ContextorError;
pub use prompt::{ChatTurn, Prompt, PromptBudget, Role, assemble, assemble_within};

use std::{sync::Arc, time::Instant};

use ai_llm_service::TextGenerator;
use rag_store::ChunkRetriever;
use tracing::{debug, info, warn};

/// Retrieve → assemble → generate, with injected collaborators.
#[derive(Clone)]
pub struct ChatPipeline {
    retriever: Arc<dyn ChunkRetriever>,
    generator: Arc<dyn TextGenerator>,
    cfg: ContextorConfig,
}

impl ChatPipeline {
    pub fn new(
        retriever: Arc<dyn ChunkRetriever>,
        generator: Arc<dyn TextGenerator>,
        cfg: ContextorConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            cfg,
        }
    }

    /// Answers `question` using context from `country` and the prior `history`.
    ///
    /// # Example
    /// ```no_run
    /// # use contextor::{ChatPipeline, AnswerOutcome};
    /// # async fn run(p: ChatPipeline) {
    /// let qa = p.ask("What is the capital?", "albania", &[]).await;
    /// if let AnswerOutcome::Generated(r) = &qa.outcome {
    ///     println!("{:?} from {} chunks", r.text(), qa.context.len());
    /// }
    /// # }
    /// ```
    pub async fn ask(&self, question: &str, country: &str, history: &[prompt::ChatTurn]) -> QaAnswer {
        let started = Instant::now();

        // 1) Retrieve
        let mut chunks = match self
            .retriever
            .top_chunks(question, country, self.cfg.top_k)
            .await
        {
            Ok(chunks) => chunks,
            // Without a credential the answer is mocked whatever the context is.
            Err(e) if self.generator.is_mocked() => {
                debug!(country = %country, error = %e, "retrieval failed in mock mode");
                Vec::new()
            }
            Err(e) => match self.cfg.on_retrieval_failure {
                RetrievalFailurePolicy::Abort => {
                    warn!(country = %country, error = %e, "retrieval failed, skipping generation");
                    return QaAnswer {
                        outcome: AnswerOutcome::RetrievalFailed {
                            country: country.trim().to_string(),
                            kind: RetrievalFailureKind::from(&e),
                            reason: e.to_string(),
                        },
                        context: Vec::new(),
                        prompt_chars: 0,
                    };
                }
                RetrievalFailurePolicy::EmptyContext => {
                    warn!(country = %country, error = %e, "retrieval failed, answering without context");
                    Vec::new()
                }
            },
        };

        // 2) Build prompt
        let (prompt, kept) = prompt::fit(&chunks, question, history, self.cfg.budget);
        chunks.truncate(kept);

        // 3) Generate
        let result = self.generator.generate(prompt.as_str()).await;
        info!(
            country = %country,
            chunks = chunks.len(),
            history_turns = history.len(),
            prompt_chars = prompt.char_count(),
            status = %result.status(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "question answered"
        );

        QaAnswer {
            outcome: AnswerOutcome::Generated(result),
            context: chunks,
            prompt_chars: prompt.char_count(),
        }
    }
}
