// Answer generator: hands question and context to the answering agent
use std::sync::Arc;
use std::time::Duration;

use crate::agents::AnsweringAgent;
use crate::errors::{RagError, Result};
use crate::rag::with_timeout;
use crate::types::Stage;

/// Instruction line closing every answering prompt
pub const ANSWER_INSTRUCTION: &str = "Answer only from the context above and cite every result you use by its marker, for example [#A1]. If the context does not contain the answer, say so.";

/// Returned when the answering agent fails or times out
pub const FALLBACK_ANSWER: &str =
    "No answer is available right now because the answering service could not be reached. Please try again later.";

/// Build the fixed prompt: question, blank line, context, blank line, instruction
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Question: {}\n\n{}\n\n{}",
        question.trim(),
        context,
        ANSWER_INSTRUCTION
    )
}

/// Produces the final prose answer
pub struct AnswerGenerator {
    agent: Arc<dyn AnsweringAgent>,
    timeout: Duration,
}

impl AnswerGenerator {
    /// Create new answer generator
    pub fn new(agent: Arc<dyn AnsweringAgent>, timeout: Duration) -> Self {
        Self { agent, timeout }
    }

    /// Ask the agent, reporting failures and empty answers
    pub async fn try_answer(&self, original_question: &str, context: &str) -> Result<String> {
        let prompt = build_prompt(original_question, context);
        let answer = with_timeout(Stage::Answer, self.timeout, self.agent.answer(&prompt)).await?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(RagError::InvalidResponse(
                "Answering agent returned no text".to_string(),
            ));
        }

        Ok(answer.to_string())
    }

    /// Ask the agent, returning the fixed fallback answer on any failure
    pub async fn send_to_answering_agent(&self, original_question: &str, context: &str) -> String {
        match self.try_answer(original_question, context).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "Answering agent failed, using fallback answer");
                FALLBACK_ANSWER.to_string()
            }
        }
    }
}
