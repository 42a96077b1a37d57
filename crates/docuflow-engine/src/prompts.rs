//! Prompt builders for the flow engine's LLM calls.
//!
//! These prompts are the behavioral contract with the model: the analysis
//! prompt pins the exact execution-plan shape, the validation prompt scopes
//! checking to the questions currently on screen, and the suggestion prompt
//! asks for a confidence-scored value. Keep the response schemas in sync
//! with the types in `docuflow_core::types`.

use serde_json::Value;

use docuflow_core::types::{DataMap, Question, ValidationRules};

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn pretty_map(map: &DataMap) -> String {
    serde_json::to_string_pretty(map).unwrap_or_default()
}

/// Prompt asking the model to convert an arbitrary prompt configuration
/// into a standardized execution plan.
pub fn analysis_prompt(prompt_config: &Value, template: &Value) -> String {
    format!(
        r#"You are a conversation flow analyzer for a legal document generation platform.

Given a prompt configuration JSON (which may have ANY structure), analyze it and create a standardized execution plan.

## Prompt Configuration
```json
{prompt_config}
```

## Document Template
```json
{template}
```

## Your Task
Analyze the prompt configuration and extract:

1. **Structure Analysis**: Understand how questions are organized (phases/sections, flat list, hierarchical, custom)

2. **Question Sequence**: Extract ALL questions in the order they should be asked. Convert complex question types into simple web form types.

3. **Conditional Logic**: Identify any conditional/followUp questions and their triggers

4. **Validation Rules**: Extract validation requirements

5. **Field Mappings**: Map question IDs to template placeholder fields

Respond with JSON in this EXACT format (this is critical):
```json
{{
  "structure_analysis": {{
    "type": "describe the structure type",
    "total_questions": <number of total questions>,
    "has_conditional_logic": true/false,
    "description": "Brief description of the document flow"
  }},
  "question_sequence": [
    {{
      "sequence_number": 1,
      "question_id": "unique_id",
      "question_text": "What is...",
      "input_type": "text|select|date|number|email|tel",
      "options": ["option1", "option2"] or null,
      "required": true/false,
      "help_text": "helpful guidance" or null,
      "placeholder": "example value" or null,
      "validation_rules": ["rule1", "rule2"] or [],
      "maps_to_field": "TEMPLATE_FIELD_NAME" or null,
      "depends_on": null,
      "shows_after_sequence": null
    }}
  ],
  "conditional_questions": [
    {{
      "question_id": "conditional_question_id",
      "triggered_by_field": "parent_field_id",
      "trigger_condition": {{"field": "value"}},
      "question_text": "What is...",
      "input_type": "text|select|date|number",
      "required": true/false,
      "maps_to_field": "TEMPLATE_FIELD_NAME"
    }}
  ],
  "validation_rules": {{
    "field_validations": {{
      "field_id": ["min_length: 5", "max_length: 100"]
    }},
    "cross_field_validations": [
      {{
        "rule": "end_date must be after start_date",
        "fields": ["start_date", "end_date"],
        "error_message": "End date must be after start date"
      }}
    ]
  }},
  "welcome_message": "A friendly welcome message to start the conversation"
}}
```

IMPORTANT RULES:
- Convert ALL question types to simple web form types (text, select, date, number, email, tel)
- If a question type is "address", break it into multiple text fields (street, city, postal_code, etc.)
- If a question type is "object", break it into multiple questions for each property
- Include ALL questions, both required and optional
- Number questions sequentially starting from 1
- For conditional questions, clearly specify the trigger condition
- Make the welcome_message friendly and encouraging

Respond with ONLY the JSON, no additional text."#,
        prompt_config = pretty(prompt_config),
        template = pretty(template),
    )
}

/// Prompt asking the model to validate newly submitted answers, scoped to
/// the questions that were actually asked in this step.
pub fn validation_prompt(
    rules: &ValidationRules,
    answers: &DataMap,
    collected: &DataMap,
    current_questions: &[Question],
) -> String {
    let questions_context = if current_questions.is_empty() {
        String::new()
    } else {
        format!(
            "\n## Current Questions Being Answered\n```json\n{}\n```\n",
            serde_json::to_string_pretty(current_questions).unwrap_or_default()
        )
    };

    format!(
        r#"You are a data validator for a legal document generation system.

## Validation Rules
```json
{rules}
```
{questions_context}
## New Answers
```json
{answers}
```

## All Collected Data (for cross-field validation)
```json
{collected}
```

## Your Task
Validate ONLY the answers for fields listed in "Current Questions Being Answered".

CRITICAL: Do NOT validate fields that are not in the "Current Questions Being Answered" section.
Only validate the specific fields that were asked in this step.

For each field in "Current Questions Being Answered", check:
1. If the field is marked as "required": true, verify the answer is provided and not empty
2. Data types are correct
3. For SELECT fields: verify the answer matches one of the valid options listed
4. Values meet constraints (length, format, range, etc.)
5. Cross-field validations pass ONLY if both fields are in the current questions (e.g., end date after start date)

IMPORTANT:
- If a field has "options" in the Current Questions, the answer MUST be one of those exact values.
- Ignore any required fields that are NOT in the "Current Questions Being Answered" section.

Respond with JSON:
```json
{{
  "is_valid": true/false,
  "errors": [
    {{
      "field": "field_id",
      "message": "Clear error message for the user",
      "severity": "error"
    }}
  ],
  "warnings": [
    {{
      "field": "field_id",
      "message": "Warning message (non-blocking)",
      "severity": "warning"
    }}
  ]
}}
```

Respond with ONLY the JSON."#,
        rules = serde_json::to_string_pretty(rules).unwrap_or_default(),
        questions_context = questions_context,
        answers = pretty_map(answers),
        collected = pretty_map(collected),
    )
}

/// Prompt asking the model for a context-aware suggested answer.
pub fn suggestion_prompt(question: &Question, collected: &DataMap) -> String {
    format!(
        r#"Based on previously collected data, provide a smart suggestion for the current question.

## Collected Data So Far
```json
{collected}
```

## Current Question
```json
{question}
```

## Your Task
Provide a helpful suggestion based on:
1. Previously collected data (e.g., if employer is in Ontario, suggest Ontario-specific defaults)
2. Legal best practices
3. Common patterns

Respond with JSON:
```json
{{
  "suggestion": "suggested value or example",
  "reasoning": "why this is suggested (1-2 sentences)",
  "confidence": 0.8
}}
```

If no good suggestion, return:
```json
{{
  "suggestion": null,
  "reasoning": "not enough context",
  "confidence": 0.0
}}
```

Respond with ONLY the JSON."#,
        collected = pretty_map(collected),
        question = serde_json::to_string_pretty(question).unwrap_or_default(),
    )
}
