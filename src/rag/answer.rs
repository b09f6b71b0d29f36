//! Answer synthesis over assembled context.

use super::context::AssembledContext;
use crate::config::{Prompts, RagSettings};
use crate::error::{Result, VidsageError};
use crate::openai::create_client;
use crate::retriever::RetrievedChunk;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// Answer given when retrieval found nothing; no model call is made.
pub const NO_ANSWER: &str =
    "I couldn't find any relevant information to answer your question in the analyzed videos.";

/// Answer given when nothing has been indexed yet.
pub const NO_VIDEOS: &str = "No analyzed videos available to answer your question.";

/// Builds the chat messages for a question.
pub struct PromptBuilder {
    prompts: Prompts,
    detail_pattern: Regex,
}

impl PromptBuilder {
    pub fn new(prompts: Prompts) -> Result<Self> {
        // Questions asking for precise facts get the detail addendum
        let detail_pattern = Regex::new(
            r"(?i)\b(specific|exactly|precisely|details?|mentions?|mentioned|references?|quotes?|numbers?|statistics?|percentages?|dates?|when|how many|how much|where|who|which)\b",
        )
        .map_err(|e| VidsageError::Configuration(format!("Invalid detail pattern: {}", e)))?;

        Ok(Self {
            prompts,
            detail_pattern,
        })
    }

    /// Whether the question asks for precise details.
    pub fn needs_specific_details(&self, question: &str) -> bool {
        self.detail_pattern.is_match(question)
    }

    pub fn user_prompt(&self, question: &str, context: &str) -> String {
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), context.to_string());

        let mut prompt = self.prompts.render_with_custom(&self.prompts.qa.user, &vars);
        if self.needs_specific_details(question) {
            prompt.push_str(&self.prompts.render_with_custom(&self.prompts.qa.detail_addendum, &vars));
        }
        prompt
    }

    pub fn messages(&self, question: &str, context: &str) -> Result<Vec<ChatCompletionRequestMessage>> {
        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.prompts.render_with_custom(&self.prompts.qa.system, &HashMap::new()))
                .build()
                .map_err(|e| VidsageError::Rag(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(self.user_prompt(question, context))
                .build()
                .map_err(|e| VidsageError::Rag(e.to_string()))?
                .into(),
        ])
    }
}

/// A document that contributed to an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSource {
    pub document_id: String,
    pub title: String,
    /// Best distance among the document's retrieved chunks.
    pub distance: f32,
}

/// An answer and the documents it was drawn from.
#[derive(Debug, Clone)]
pub struct QaResponse {
    pub answer: String,
    pub sources: Vec<AnswerSource>,
}

impl QaResponse {
    /// The fixed response for an empty retrieval.
    pub fn no_information() -> Self {
        Self {
            answer: NO_ANSWER.to_string(),
            sources: Vec::new(),
        }
    }

    /// The fixed response for an empty index.
    pub fn no_videos() -> Self {
        Self {
            answer: NO_VIDEOS.to_string(),
            sources: Vec::new(),
        }
    }

    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!(
                    "\n{} (ID: {}, distance: {:.3})",
                    source.title, source.document_id, source.distance
                ));
            }
        }

        output
    }
}

/// One entry per document, in order of first appearance.
pub fn sources_from_chunks(chunks: &[RetrievedChunk]) -> Vec<AnswerSource> {
    let mut sources: Vec<AnswerSource> = Vec::new();
    for retrieved in chunks {
        if !sources.iter().any(|s| s.document_id == retrieved.chunk.document_id) {
            sources.push(AnswerSource {
                document_id: retrieved.chunk.document_id.clone(),
                title: retrieved.chunk.document_title.clone(),
                distance: retrieved.distance,
            });
        }
    }
    sources
}

/// Answers questions with a chat model from assembled context.
pub struct QaAgent {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
    prompts: PromptBuilder,
}

impl QaAgent {
    /// Create an agent. Fails without an OpenAI API key.
    pub fn new(settings: &RagSettings, prompts: Prompts) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: settings.model.clone(),
            temperature: settings.temperature,
            prompts: PromptBuilder::new(prompts)?,
        })
    }

    /// Use a different chat model.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Answer `question` from `context`.
    #[instrument(skip(self, context), fields(question = %question))]
    pub async fn answer(&self, question: &str, context: &AssembledContext) -> Result<QaResponse> {
        if context.is_empty() {
            return Ok(QaResponse::no_information());
        }

        info!("Answering from {} retrieved chunks", context.chunks.len());

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(self.prompts.messages(question, &context.text)?)
            .temperature(self.temperature)
            .build()
            .map_err(|e| VidsageError::Rag(e.to_string()))?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            VidsageError::OpenAI(format!("Failed to generate response: {}", e))
        })?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .ok_or_else(|| VidsageError::Rag("Empty response from LLM".to_string()))?
            .clone();

        let sources = sources_from_chunks(&context.chunks);
        debug!("Generated answer with {} sources", sources.len());

        Ok(QaResponse { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{Chunk, SourceType};

    fn builder() -> PromptBuilder {
        PromptBuilder::new(Prompts::default()).unwrap()
    }

    #[test]
    fn test_detail_detection() {
        let builder = builder();
        assert!(builder.needs_specific_details("How many users did they mention?"));
        assert!(builder.needs_specific_details("Which library is recommended?"));
        assert!(builder.needs_specific_details("Give me the exact DATE please, exactly"));
        assert!(!builder.needs_specific_details("Summarize the talk"));
        assert!(!builder.needs_specific_details("Is the whole thing worth watching?"));
    }

    #[test]
    fn test_user_prompt_includes_context_and_addendum() {
        let builder = builder();
        let plain = builder.user_prompt("Summarize the talk", "CONTEXT");
        assert!(plain.contains("Summarize the talk"));
        assert!(plain.contains("CONTEXT"));
        assert!(!plain.contains("specific details"));

        let detailed = builder.user_prompt("Who spoke first?", "CONTEXT");
        assert!(detailed.contains("specific details"));
    }

    #[test]
    fn test_messages_have_system_and_user() {
        let messages = builder().messages("q", "c").unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_sources_are_deduplicated_in_order() {
        let hit = |doc: &str, source: SourceType, distance: f32| RetrievedChunk {
            chunk: Chunk::new(doc, &format!("Title {}", doc), String::new(), 0, 1, source),
            distance,
            source_type: source,
        };
        let sources = sources_from_chunks(&[
            hit("b", SourceType::Report, 0.1),
            hit("a", SourceType::Transcript, 0.2),
            hit("b", SourceType::Transcript, 0.3),
        ]);

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].document_id, "b");
        assert!((sources[0].distance - 0.1).abs() < 1e-6);
        assert_eq!(sources[1].title, "Title a");
    }

    #[test]
    fn test_no_information_response() {
        let response = QaResponse::no_information();
        assert_eq!(response.format_for_display(), NO_ANSWER);
    }
}
