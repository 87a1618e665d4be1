use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::tasks::repo_types::{Task, TaskPriority, TaskStatus};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn explicit_null<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Raw create body; enum and date fields stay strings until validated.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// Whitelisted update fields. Anything else in the body is dropped by serde.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<String>>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TaskQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    pub owner: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub is_overdue: bool,
}

impl TaskView {
    pub fn at(task: Task, now: OffsetDateTime) -> Self {
        let is_overdue = task.is_overdue(now);
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            due_date: task.due_date,
            owner: task.owner_id,
            created_at: task.created_at,
            updated_at: task.updated_at,
            is_overdue,
        }
    }
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self::at(task, OffsetDateTime::now_utc())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub success: bool,
    pub task: TaskView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub success: bool,
    pub count: usize,
    pub tasks: Vec<TaskView>,
}

/// Per-status counts; every status is always present.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskStats {
    pub total: i64,
    pub pending: i64,
    #[serde(rename = "in-progress")]
    pub in_progress: i64,
    pub completed: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: TaskStats,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_body_separates_null_from_absent() {
        let absent: UpdateTaskRequest = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.due_date, None);

        let null: UpdateTaskRequest = serde_json::from_str(r#"{"dueDate":null}"#).unwrap();
        assert_eq!(null.due_date, Some(None));

        let set: UpdateTaskRequest = serde_json::from_str(r#"{"dueDate":"2030-01-02"}"#).unwrap();
        assert_eq!(set.due_date, Some(Some("2030-01-02".to_string())));
    }

    #[test]
    fn update_body_ignores_foreign_fields() {
        let body = r#"{"owner":"6f1c2c4e-8a43-4d8e-9a3f-0b5a8e3b1f00","user":"x","status":"completed"}"#;
        let req: UpdateTaskRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.status.as_deref(), Some("completed"));
        assert!(req.title.is_none());
    }

    #[test]
    fn stats_use_hyphenated_key() {
        let json = serde_json::to_value(TaskStats {
            total: 3,
            pending: 1,
            in_progress: 0,
            completed: 2,
        })
        .unwrap();
        assert_eq!(json["in-progress"], 0);
        assert_eq!(json["total"], 3);
    }

    #[test]
    fn task_view_is_camel_case() {
        let now = OffsetDateTime::now_utc();
        let view = TaskView::at(
            Task {
                id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
                title: "Buy milk".into(),
                description: String::new(),
                status: TaskStatus::Pending,
                priority: TaskPriority::High,
                due_date: None,
                created_at: now,
                updated_at: now,
            },
            now,
        );
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["priority"], "high");
        assert_eq!(json["dueDate"], serde_json::Value::Null);
        assert_eq!(json["isOverdue"], false);
        assert!(json.get("createdAt").is_some());
        let back: TaskView = serde_json::from_value(json).unwrap();
        assert_eq!(back, view);
    }
}
