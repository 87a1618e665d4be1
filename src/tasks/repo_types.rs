use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("'{s}' is not a valid status"))
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 3] = [TaskPriority::Low, TaskPriority::Medium, TaskPriority::High];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskPriority::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("'{s}' is not a valid priority"))
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task as stored; always bound to exactly one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Task {
    /// Past due and not yet completed.
    pub fn is_overdue(&self, now: OffsetDateTime) -> bool {
        matches!(self.due_date, Some(due) if due < now) && self.status != TaskStatus::Completed
    }
}

#[derive(Debug, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub due_date: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(r: TaskRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            owner_id: r.owner_id,
            title: r.title,
            description: r.description,
            status: r.status.parse().map_err(StoreError::Corrupt)?,
            priority: r.priority.parse().map_err(StoreError::Corrupt)?,
            due_date: r.due_date,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<OffsetDateTime>,
}

/// Whitelisted edits. `due_date: Some(None)` clears the date.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<Option<OffsetDateTime>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    UpdatedAt,
    Title,
    DueDate,
    Priority,
    Status,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(SortField::CreatedAt),
            "updatedAt" => Ok(SortField::UpdatedAt),
            "title" => Ok(SortField::Title),
            "dueDate" => Ok(SortField::DueDate),
            "priority" => Ok(SortField::Priority),
            "status" => Ok(SortField::Status),
            other => Err(format!("Cannot sort by '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub descending: bool,
}

impl SortKey {
    pub const NEWEST_FIRST: SortKey = SortKey {
        field: SortField::CreatedAt,
        descending: true,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// Literal, case-insensitive substring of title or description.
    pub search: Option<String>,
    pub sort: Vec<SortKey>,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            status: None,
            priority: None,
            search: None,
            sort: vec![SortKey::NEWEST_FIRST],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn task(status: TaskStatus, due_date: Option<OffsetDateTime>) -> Task {
        let now = OffsetDateTime::now_utc();
        Task {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "t".into(),
            description: String::new(),
            status,
            priority: TaskPriority::default(),
            due_date,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn enums_parse_their_wire_names() {
        assert_eq!("in-progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert!("in_progress".parse::<TaskStatus>().is_err());
        assert_eq!("high".parse::<TaskPriority>(), Ok(TaskPriority::High));
        assert!("HIGH".parse::<TaskPriority>().is_err());
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
    }

    #[test]
    fn defaults_are_pending_and_medium() {
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
    }

    #[test]
    fn overdue_needs_past_due_date_and_open_status() {
        let now = OffsetDateTime::now_utc();
        let yesterday = Some(now - Duration::days(1));
        let tomorrow = Some(now + Duration::days(1));
        assert!(task(TaskStatus::Pending, yesterday).is_overdue(now));
        assert!(task(TaskStatus::InProgress, yesterday).is_overdue(now));
        assert!(!task(TaskStatus::Completed, yesterday).is_overdue(now));
        assert!(!task(TaskStatus::Pending, tomorrow).is_overdue(now));
        assert!(!task(TaskStatus::Pending, None).is_overdue(now));
    }

    #[test]
    fn corrupt_row_is_reported() {
        let now = OffsetDateTime::now_utc();
        let row = TaskRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "t".into(),
            description: String::new(),
            status: "archived".into(),
            priority: "low".into(),
            due_date: None,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(Task::try_from(row), Err(StoreError::Corrupt(_))));
    }
}
