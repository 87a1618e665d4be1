use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

use crate::{
    error::{AppError, FieldError},
    tasks::{
        dto::{CreateTaskRequest, TaskQuery, UpdateTaskRequest},
        repo_types::{NewTask, SortKey, TaskChanges, TaskFilter, TaskPriority, TaskStatus},
    },
};

pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MAX: usize = 500;

/// Accepts an RFC 3339 timestamp or a bare `YYYY-MM-DD` (UTC midnight).
pub fn parse_due_date(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(ts);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

fn title(raw: &str, errors: &mut Vec<FieldError>) -> String {
    let title = raw.trim().to_string();
    if title.is_empty() {
        errors.push(FieldError::new("title", "Title is required"));
    } else if title.chars().count() > TITLE_MAX {
        errors.push(FieldError::new(
            "title",
            format!("Title cannot exceed {TITLE_MAX} characters"),
        ));
    }
    title
}

fn description(raw: &str, errors: &mut Vec<FieldError>) -> String {
    let description = raw.trim().to_string();
    if description.chars().count() > DESCRIPTION_MAX {
        errors.push(FieldError::new(
            "description",
            format!("Description cannot exceed {DESCRIPTION_MAX} characters"),
        ));
    }
    description
}

fn status(raw: &str, errors: &mut Vec<FieldError>) -> Option<TaskStatus> {
    raw.parse()
        .map_err(|_| {
            errors.push(FieldError::new(
                "status",
                "Invalid status. Must be: pending, in-progress, or completed",
            ))
        })
        .ok()
}

fn priority(raw: &str, errors: &mut Vec<FieldError>) -> Option<TaskPriority> {
    raw.parse()
        .map_err(|_| {
            errors.push(FieldError::new(
                "priority",
                "Invalid priority. Must be: low, medium, or high",
            ))
        })
        .ok()
}

fn due_date(raw: &str, errors: &mut Vec<FieldError>) -> Option<OffsetDateTime> {
    let parsed = parse_due_date(raw);
    if parsed.is_none() {
        errors.push(FieldError::new("dueDate", "Invalid date format"));
    }
    parsed
}

fn finish<T>(value: T, errors: Vec<FieldError>) -> Result<T, AppError> {
    if errors.is_empty() {
        Ok(value)
    } else {
        Err(AppError::Validation(errors))
    }
}

pub fn new_task(req: CreateTaskRequest) -> Result<NewTask, AppError> {
    let mut errors = Vec::new();
    let task = NewTask {
        title: title(&req.title, &mut errors),
        description: req
            .description
            .as_deref()
            .map(|d| description(d, &mut errors))
            .unwrap_or_default(),
        status: req
            .status
            .as_deref()
            .and_then(|s| status(s, &mut errors))
            .unwrap_or_default(),
        priority: req
            .priority
            .as_deref()
            .and_then(|p| priority(p, &mut errors))
            .unwrap_or_default(),
        due_date: req.due_date.as_deref().and_then(|d| due_date(d, &mut errors)),
    };
    finish(task, errors)
}

pub fn task_changes(req: UpdateTaskRequest) -> Result<TaskChanges, AppError> {
    let mut errors = Vec::new();
    let changes = TaskChanges {
        title: req.title.as_deref().map(|t| title(t, &mut errors)),
        description: req.description.as_deref().map(|d| description(d, &mut errors)),
        status: req.status.as_deref().and_then(|s| status(s, &mut errors)),
        priority: req.priority.as_deref().and_then(|p| priority(p, &mut errors)),
        due_date: req
            .due_date
            .map(|d| d.as_deref().and_then(|d| due_date(d, &mut errors))),
    };
    finish(changes, errors)
}

/// `-createdAt`, `priority,-dueDate`, `title dueDate` ...
/// Unknown fields are skipped; nothing usable means newest first.
pub fn sort_keys(raw: &str) -> Vec<SortKey> {
    let mut keys: Vec<SortKey> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let (descending, name) = match token.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, token.strip_prefix('+').unwrap_or(token)),
            };
            let field = name.parse().ok()?;
            Some(SortKey { field, descending })
        })
        .collect();
    if keys.is_empty() {
        keys.push(SortKey::NEWEST_FIRST);
    }
    keys
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Builds the list filter. `None` means a status or priority was asked for
/// that no task can have, so the listing is empty.
pub fn task_filter(query: &TaskQuery) -> Option<TaskFilter> {
    let status = match present(&query.status) {
        Some(raw) => Some(raw.parse::<TaskStatus>().ok()?),
        None => None,
    };
    let priority = match present(&query.priority) {
        Some(raw) => Some(raw.parse::<TaskPriority>().ok()?),
        None => None,
    };
    Some(TaskFilter {
        status,
        priority,
        search: present(&query.search).map(str::to_string),
        sort: present(&query.sort)
            .map(sort_keys)
            .unwrap_or_else(|| vec![SortKey::NEWEST_FIRST]),
    })
}
