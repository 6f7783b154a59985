use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionType {
    Link,
    Text,
    Code,
    Pdf,
}

impl SubmissionType {
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionType::Link => "link",
            SubmissionType::Text => "text",
            SubmissionType::Code => "code",
            SubmissionType::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub is_completed: bool,
}

/// An immutable artifact attached to a task as evidence of work performed.
/// Append-only: nothing ever edits or removes a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SubmissionType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// A task on the board. `status` is a free-form reference into the ordered
/// column list; transitions are unrestricted apart from the side effects
/// bound to entering or leaving the first and last columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: TaskPriority,
    pub assignee_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_notes: Option<String>,
    #[serde(default)]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub submissions: Vec<TaskSubmission>,
}

impl Task {
    /// A checklist counts as complete only when it is non-empty and every
    /// item is ticked. Used for UI gating, never as a transition guard.
    pub fn checklist_complete(&self) -> bool {
        !self.checklist.is_empty() && self.checklist.iter().all(|i| i.is_completed)
    }
}
