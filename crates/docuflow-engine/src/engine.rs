//! The conversation flow engine.
//!
//! One plan analysis per session, then deterministic sequencing: conditional
//! questions fire first when their triggers match collected data, followed by
//! unanswered sequential questions whose dependencies are satisfied. Answer
//! validation and suggestions go back through the LLM; completion and
//! progress are computed locally from the plan.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use docuflow_core::error::{DocuflowError, Result};
use docuflow_core::types::{
    ConditionalQuestion, DataMap, ExecutionPlan, PlannedQuestion, Progress, Question,
    ValidationOutcome,
};
use docuflow_llm::{ChatClient, ChatRequest};

use crate::prompts;
use crate::response::parse_json_object;

/// Suggestions below this confidence are discarded.
const SUGGESTION_CONFIDENCE_FLOOR: f64 = 0.5;

/// AI-powered conversation flow engine.
///
/// Interprets any prompt-config structure via the chat client and drives
/// the document generation conversation from the resulting execution plan.
pub struct ConversationFlowEngine {
    client: Arc<dyn ChatClient>,
    questions_per_step: usize,
}

impl ConversationFlowEngine {
    /// Create an engine over a chat client.
    ///
    /// `questions_per_step` controls how many questions each turn surfaces;
    /// it is clamped to at least 1.
    pub fn new(client: Arc<dyn ChatClient>, questions_per_step: usize) -> Self {
        Self {
            client,
            questions_per_step: questions_per_step.max(1),
        }
    }

    /// Ask the model to analyze the prompt configuration and produce a
    /// standardized execution plan.
    ///
    /// This is the one step that makes the platform document-agnostic: the
    /// model reads ANY prompt-config JSON and converts it into the plan shape
    /// the rest of the engine understands.
    pub async fn analyze_prompt_config(
        &self,
        prompt_config: &Value,
        template: &Value,
    ) -> Result<ExecutionPlan> {
        let prompt = prompts::analysis_prompt(prompt_config, template);
        let request = ChatRequest::user(prompt)
            .with_temperature(0.1)
            .with_json_response();

        let response = self.client.complete(request).await?;
        let value = parse_json_object(&response)?;
        let plan: ExecutionPlan = serde_json::from_value(value).map_err(|e| {
            DocuflowError::Engine(format!("Execution plan did not match expected shape: {}", e))
        })?;

        debug!(
            questions = plan.question_sequence.len(),
            conditionals = plan.conditional_questions.len(),
            "Prompt configuration analyzed"
        );
        Ok(plan)
    }

    /// The first question(s) to show when a session starts.
    ///
    /// Takes leading questions with no dependency gates; if the filter
    /// removes everything, falls back to the first question in sequence.
    pub fn first_questions(&self, plan: &ExecutionPlan) -> Vec<Question> {
        let sequence = &plan.question_sequence;
        if sequence.is_empty() {
            return Vec::new();
        }

        let firsts: Vec<Question> = sequence
            .iter()
            .take(self.questions_per_step)
            .filter(|q| q.depends_on.is_none() && q.shows_after_sequence.is_none())
            .map(question_from_planned)
            .collect();

        if firsts.is_empty() {
            vec![question_from_planned(&sequence[0])]
        } else {
            firsts
        }
    }

    /// Which question(s) to ask next given the current state.
    ///
    /// Triggered conditional questions take priority over the sequential
    /// backlog; sequential questions are skipped while their dependency is
    /// unanswered.
    pub fn next_questions(
        &self,
        plan: &ExecutionPlan,
        answered_question_ids: &[String],
        collected_data: &DataMap,
    ) -> Vec<Question> {
        let mut next = Vec::new();

        for cond in &plan.conditional_questions {
            if answered_question_ids.iter().any(|id| id == &cond.question_id) {
                continue;
            }
            if condition_met(collected_data, &cond.trigger_condition) {
                next.push(question_from_conditional(cond));
                if next.len() >= self.questions_per_step {
                    return next;
                }
            }
        }

        for q in &plan.question_sequence {
            if answered_question_ids.iter().any(|id| id == &q.question_id) {
                continue;
            }
            if let Some(dep) = &q.depends_on {
                if !answered_question_ids.iter().any(|id| id == dep) {
                    continue;
                }
            }
            next.push(question_from_planned(q));
            if next.len() >= self.questions_per_step {
                break;
            }
        }

        next
    }

    /// Validate newly submitted answers via the model.
    ///
    /// Validation is scoped to `current_questions` — the questions that were
    /// actually shown in this step — so unrelated required fields never block
    /// a submit.
    pub async fn validate_answers(
        &self,
        plan: &ExecutionPlan,
        answers: &DataMap,
        collected_data: &DataMap,
        current_questions: &[Question],
    ) -> Result<ValidationOutcome> {
        let prompt = prompts::validation_prompt(
            &plan.validation_rules,
            answers,
            collected_data,
            current_questions,
        );
        let request = ChatRequest::user(prompt)
            .with_temperature(0.1)
            .with_json_response();

        let response = self.client.complete(request).await?;
        let value = parse_json_object(&response)?;
        serde_json::from_value(value).map_err(|e| {
            DocuflowError::Engine(format!("Validation result did not match expected shape: {}", e))
        })
    }

    /// Ask the model for a context-aware suggestion for a question.
    ///
    /// Suggestions are best-effort: any failure, low confidence, or lack of
    /// context yields `None` rather than an error.
    pub async fn smart_suggestion(
        &self,
        question: &Question,
        collected_data: &DataMap,
    ) -> Option<String> {
        if collected_data.is_empty() {
            return None;
        }

        let prompt = prompts::suggestion_prompt(question, collected_data);
        let request = ChatRequest::user(prompt)
            .with_temperature(0.3)
            .with_json_response();

        let response = match self.client.complete(request).await {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, field = %question.field_id, "Suggestion request failed; continuing without");
                return None;
            }
        };

        let value = parse_json_object(&response).ok()?;
        let parsed: SuggestionResponse = serde_json::from_value(value).ok()?;
        if parsed.confidence > SUGGESTION_CONFIDENCE_FLOOR {
            parsed.suggestion
        } else {
            None
        }
    }

    /// Whether every required sequential question has been answered.
    ///
    /// Questions default to required; conditional questions never gate
    /// completion.
    pub fn is_complete(&self, plan: &ExecutionPlan, answered_question_ids: &[String]) -> bool {
        plan.question_sequence
            .iter()
            .filter(|q| q.required)
            .all(|q| answered_question_ids.iter().any(|id| id == &q.question_id))
    }

    /// Progress through the question sequence.
    pub fn progress(
        &self,
        plan: &ExecutionPlan,
        answered_question_ids: &[String],
        current_question: Option<&Question>,
    ) -> Progress {
        let total_steps = plan.question_sequence.len() as u32;
        let answered = answered_question_ids.len() as u32;

        let percent_complete = if total_steps > 0 {
            let pct = f64::from(answered) / f64::from(total_steps) * 100.0;
            (pct * 10.0).round() / 10.0
        } else {
            0.0
        };

        let phase_name =
            current_question.and_then(|_| plan.structure_analysis.description.clone());

        Progress {
            current_step: answered + 1,
            total_steps,
            percent_complete,
            phase_name,
        }
    }
}

/// Check whether all field/value pairs of a trigger condition match the
/// collected data.
fn condition_met(collected_data: &DataMap, condition: &DataMap) -> bool {
    condition
        .iter()
        .all(|(field, expected)| collected_data.get(field) == Some(expected))
}

fn question_from_planned(q: &PlannedQuestion) -> Question {
    Question {
        field_id: q.question_id.clone(),
        label: q.question_text.clone(),
        input_type: q.input_type,
        options: q.options.clone(),
        required: q.required,
        help_text: q.help_text.clone(),
        placeholder: q.placeholder.clone(),
        current_value: None,
        suggestion: None,
        validation_pattern: None,
    }
}

fn question_from_conditional(q: &ConditionalQuestion) -> Question {
    Question {
        field_id: q.question_id.clone(),
        label: q.question_text.clone(),
        input_type: q.input_type,
        options: q.options.clone(),
        required: q.required,
        help_text: None,
        placeholder: None,
        current_value: None,
        suggestion: None,
        validation_pattern: None,
    }
}

#[derive(Debug, Deserialize)]
struct SuggestionResponse {
    #[serde(default)]
    suggestion: Option<String>,
    #[serde(default)]
    confidence: f64,
}

// =============================================================================
// Tests
// =============================================================================
