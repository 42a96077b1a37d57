use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Semi-structured field values keyed by field id.
pub type DataMap = serde_json::Map<String, Value>;

fn default_true() -> bool {
    true
}

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle state of a conversation session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Data collection is still underway.
    #[default]
    InProgress,
    /// Every required question is answered; a document can be generated.
    ReadyForGeneration,
    /// A document has been generated; the session is closed.
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::ReadyForGeneration => "ready_for_generation",
            SessionStatus::Completed => "completed",
        }
    }

    /// Parse from the storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_progress" => Some(SessionStatus::InProgress),
            "ready_for_generation" => Some(SessionStatus::ReadyForGeneration),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

/// Web-form input type a question renders as.
///
/// The plan analysis converts every question type in the source prompt
/// configuration down to this set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    #[default]
    Text,
    Select,
    Date,
    Number,
    Email,
    Tel,
}

/// Output format of a generated document artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFormat {
    Html,
    Txt,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Html => "html",
            DocumentFormat::Txt => "txt",
        }
    }

    /// File extension (same as the wire name).
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "html" => Some(DocumentFormat::Html),
            "txt" => Some(DocumentFormat::Txt),
            _ => None,
        }
    }
}

/// Severity of a validation issue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

// =============================================================================
// Execution plan
// =============================================================================

/// Standardized plan derived from an arbitrary prompt configuration.
///
/// Produced once per session by the flow engine's plan analysis and cached
/// on the session record; every subsequent turn is driven from it without
/// re-reading the prompt configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub structure_analysis: StructureAnalysis,
    #[serde(default)]
    pub question_sequence: Vec<PlannedQuestion>,
    #[serde(default)]
    pub conditional_questions: Vec<ConditionalQuestion>,
    #[serde(default)]
    pub validation_rules: ValidationRules,
    #[serde(default)]
    pub welcome_message: Option<String>,
}

/// How the source prompt configuration organizes its questions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StructureAnalysis {
    /// Free-form structure description (phased, flat, hierarchical, ...).
    #[serde(rename = "type")]
    pub structure_type: String,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub has_conditional_logic: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// One question in the ordered sequence of the execution plan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlannedQuestion {
    pub sequence_number: u32,
    pub question_id: String,
    pub question_text: String,
    #[serde(default)]
    pub input_type: InputType,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Questions default to required when the plan omits the flag.
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub validation_rules: Vec<String>,
    /// Template placeholder this answer fills.
    #[serde(default)]
    pub maps_to_field: Option<String>,
    /// Question id that must be answered before this one is shown.
    #[serde(default)]
    pub depends_on: Option<String>,
    /// Sequence number after which this question becomes visible.
    #[serde(default)]
    pub shows_after_sequence: Option<u32>,
}

/// A question that only appears when collected data matches its trigger.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConditionalQuestion {
    pub question_id: String,
    pub triggered_by_field: String,
    /// Field-value pairs that must all match the collected data.
    #[serde(default)]
    pub trigger_condition: DataMap,
    pub question_text: String,
    #[serde(default)]
    pub input_type: InputType,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub maps_to_field: Option<String>,
}

/// Validation rules extracted by the plan analysis.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Per-field constraint strings, keyed by field id.
    #[serde(default)]
    pub field_validations: std::collections::HashMap<String, Vec<String>>,
    #[serde(default)]
    pub cross_field_validations: Vec<CrossFieldRule>,
}

/// A rule spanning multiple fields (e.g. end date after start date).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrossFieldRule {
    pub rule: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub error_message: String,
}

// =============================================================================
// Conversation turn types
// =============================================================================

/// A question formatted for the client to render.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
    pub field_id: String,
    pub label: String,
    pub input_type: InputType,
    pub options: Option<Vec<String>>,
    pub required: bool,
    pub help_text: Option<String>,
    pub placeholder: Option<String>,
    /// Current value if the question was already answered.
    pub current_value: Option<Value>,
    /// Context-aware suggested answer, when one clears the confidence bar.
    pub suggestion: Option<String>,
    pub validation_pattern: Option<String>,
}

/// Progress through the question sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Progress {
    pub current_step: u32,
    pub total_steps: u32,
    /// 0-100, rounded to one decimal.
    pub percent_complete: f64,
    pub phase_name: Option<String>,
}

/// One validation problem reported against a submitted answer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
}

/// Result of validating a batch of submitted answers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationOutcome {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

// =============================================================================
// Persistent records
// =============================================================================

/// Template metadata row. The template JSON and prompt-config JSON live in
/// blob storage; this record only tracks identity and blob paths.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub template_blob_path: String,
    pub prompt_blob_path: String,
    pub version: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateRecord {
    /// Create a new active template record with fresh timestamps.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        template_blob_path: impl Into<String>,
        prompt_blob_path: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description,
            template_blob_path: template_blob_path.into(),
            prompt_blob_path: prompt_blob_path.into(),
            version: version.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One conversational document-generation session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub template_name: String,
    /// Plan cached after the initial analysis; reused on every turn.
    pub execution_plan: Option<ExecutionPlan>,
    pub answered_question_ids: Vec<String>,
    pub current_sequence_number: u32,
    pub collected_data: DataMap,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a new in-progress session for a template.
    pub fn new(template_name: impl Into<String>, plan: ExecutionPlan, ttl_hours: u32) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            template_name: template_name.into(),
            execution_plan: Some(plan),
            answered_question_ids: Vec::new(),
            current_sequence_number: 0,
            collected_data: DataMap::new(),
            status: SessionStatus::InProgress,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::hours(i64::from(ttl_hours)),
        }
    }

    /// Whether the session TTL has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A generated document artifact persisted to blob storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GeneratedDocumentRecord {
    pub document_id: Uuid,
    pub session_id: Uuid,
    pub blob_url: String,
    pub file_format: DocumentFormat,
    pub file_size_bytes: u64,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedDocumentRecord {
    pub fn new(
        session_id: Uuid,
        blob_url: impl Into<String>,
        file_format: DocumentFormat,
        file_size_bytes: u64,
    ) -> Self {
        Self {
            document_id: Uuid::new_v4(),
            session_id,
            blob_url: blob_url.into(),
            file_format,
            file_size_bytes,
            generated_at: Utc::now(),
        }
    }
}
