pub mod document;
mod outline;
mod plan;
mod prompts;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
pub use outline::{BookOutline, OutlineLookup, parse_outline};
pub use plan::{
    Addon, AddonBudget, AddonSet, Assembly, CALL_WORDS, GenerationPlan, GenerationRequest,
    PART_COUNT, SEPARATOR, WORDS_PER_PAGE,
};
pub use prompts::BookLanguage;
use serde::{Deserialize, Serialize};
use teloxide::types::{ChatId, MessageId};
use thiserror::Error;

use crate::{
    llm::{ADDON_MAX_TOKENS, ChatMessage, LlmClient, LlmError, OUTLINE_MAX_TOKENS, SUBPART_MAX_TOKENS},
    messaging::MessagingService,
};

/// Errors from book generation.
#[derive(Debug, Error)]
pub enum BookServiceError {
    /// An LLM call failed.
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
}

type Result<T> = std::result::Result<T, BookServiceError>;

/// Everything needed to write a book once the user confirmed the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookJob {
    /// Outline the book is written from.
    pub outline: BookOutline,
    /// Language of the text.
    pub language: BookLanguage,
    /// Page count and extras.
    pub request: GenerationRequest,
}

/// A finished book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedBook {
    /// Title as confirmed by the LLM.
    pub title: String,
    /// Assembled text.
    pub text: String,
}

/// Finds outlines and writes books.
#[automock]
#[async_trait]
pub trait BookService: Send + Sync {
    /// Asks the LLM whether the book exists and how it splits into parts.
    async fn find_outline(&self, title: &str, language: BookLanguage) -> Result<OutlineLookup>;

    /// Writes the whole book, reporting progress to the chat.
    async fn generate(&self, chat_id: ChatId, job: BookJob) -> Result<GeneratedBook>;
}

/// `BookService` that writes books with an `LlmClient`.
pub struct DefaultBookService {
    llm: Arc<dyn LlmClient>,
    messaging_service: Arc<dyn MessagingService>,
}

impl DefaultBookService {
    /// Creates a new `DefaultBookService`.
    pub fn new(llm: Arc<dyn LlmClient>, messaging_service: Arc<dyn MessagingService>) -> Self {
        Self { llm, messaging_service }
    }

    async fn ask(&self, prompt: String, max_tokens: u32) -> Result<String> {
        Ok(self.llm.complete(vec![ChatMessage::user(prompt)], max_tokens).await?)
    }

    /// Progress is best effort: a failed edit never stops generation.
    async fn report(&self, chat_id: ChatId, progress: Option<MessageId>, text: &str) {
        let Some(message_id) = progress else {
            return;
        };
        if let Err(e) = self.messaging_service.edit_text(chat_id, message_id, text).await {
            tracing::warn!("Failed to update progress for {chat_id}: {e}");
        }
    }
}

#[async_trait]
impl BookService for DefaultBookService {
    async fn find_outline(&self, title: &str, language: BookLanguage) -> Result<OutlineLookup> {
        let reply = self.ask(language.outline_prompt(title), OUTLINE_MAX_TOKENS).await?;
        let lookup = parse_outline(&reply, title);
        tracing::debug!("Outline lookup for '{title}': {lookup:?}");
        Ok(lookup)
    }

    async fn generate(&self, chat_id: ChatId, job: BookJob) -> Result<GeneratedBook> {
        let BookJob { outline, language, request } = job;
        let plan = GenerationPlan::new(&request);
        tracing::info!(
            "Generating '{}' for {chat_id}: {} core calls, {} extra calls",
            outline.title,
            plan.core_call_count(),
            plan.addon_call_count()
        );

        let progress = match self.messaging_service.send_text(chat_id, language.progress_start()).await {
            Ok(message_id) => Some(message_id),
            Err(e) => {
                tracing::warn!("Failed to send progress message to {chat_id}: {e}");
                None
            }
        };

        let mut assembly = Assembly::new();

        for (index, (part, subparts)) in
            outline.parts.iter().zip(plan.part_subpart_counts).enumerate()
        {
            for subpart in 1..=subparts {
                let prompt = language.subpart_prompt(
                    &outline.title,
                    request.page_count,
                    part,
                    subpart,
                    subparts,
                    CALL_WORDS,
                );
                assembly.push_core(self.ask(prompt, SUBPART_MAX_TOKENS).await?);
                self.report(chat_id, progress, &language.progress_part(index + 1, subpart, subparts))
                    .await;
            }
        }

        let total_extras = plan.addon_call_count();
        let mut done = 0;
        for budget in &plan.addon_budgets {
            let calls = budget.calls.len();
            for (index, words) in budget.calls.iter().enumerate() {
                let page = (calls > 1).then_some((index + 1, calls));
                let prompt = language.addon_prompt(budget.addon, &outline.title, *words, page);
                assembly.push_addon(budget.addon, self.ask(prompt, ADDON_MAX_TOKENS).await?);

                done += 1;
                self.report(chat_id, progress, &language.progress_extra(done, total_extras)).await;
            }
        }

        Ok(GeneratedBook { title: outline.title, text: assembly.into_sections().join("\n\n") })
    }
}
