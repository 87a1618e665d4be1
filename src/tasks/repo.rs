use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    error::{StoreError, StoreResult},
    tasks::repo_types::{NewTask, SortField, Task, TaskChanges, TaskFilter, TaskRow, TaskStatus},
};

/// Task persistence. Every operation is scoped to `owner`; a task owned by
/// someone else behaves exactly like a missing one.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>>;
    async fn find(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>>;
    async fn create(&self, owner: Uuid, task: NewTask) -> StoreResult<Task>;
    async fn update(&self, owner: Uuid, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>>;
    /// `true` when a task was removed.
    async fn delete(&self, owner: Uuid, id: Uuid) -> StoreResult<bool>;
    async fn count_by_status(&self, owner: Uuid) -> StoreResult<Vec<(TaskStatus, i64)>>;
}

const TASK_COLUMNS: &str =
    "id, owner_id, title, description, status, priority, due_date, created_at, updated_at";

/// Escapes LIKE metacharacters so the search term matches literally.
pub(crate) fn like_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn order_expr(field: SortField) -> &'static str {
    match field {
        SortField::CreatedAt => "created_at",
        SortField::UpdatedAt => "updated_at",
        SortField::Title => "title",
        SortField::DueDate => "due_date",
        SortField::Priority => "CASE priority WHEN 'low' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END",
        SortField::Status => {
            "CASE status WHEN 'pending' THEN 0 WHEN 'in-progress' THEN 1 ELSE 2 END"
        }
    }
}

fn rows_to_tasks(rows: Vec<TaskRow>) -> StoreResult<Vec<Task>> {
    rows.into_iter().map(Task::try_from).collect()
}

#[derive(Clone)]
pub struct PgTaskStore {
    db: PgPool,
}

impl PgTaskStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn list(&self, owner: Uuid, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = "));
        qb.push_bind(owner);

        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            qb.push(" AND priority = ").push_bind(priority.as_str());
        }
        if let Some(search) = &filter.search {
            let pattern = like_pattern(search);
            qb.push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR description ILIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        qb.push(" ORDER BY ");
        for key in &filter.sort {
            qb.push(order_expr(key.field));
            qb.push(if key.descending { " DESC" } else { " ASC" });
            if key.field == SortField::DueDate {
                qb.push(" NULLS LAST");
            }
            qb.push(", ");
        }
        qb.push("created_at DESC, id");

        let rows = qb.build_query_as::<TaskRow>().fetch_all(&self.db).await?;
        rows_to_tasks(rows)
    }

    async fn find(&self, owner: Uuid, id: Uuid) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.db)
        .await?;
        row.map(Task::try_from).transpose()
    }

    async fn create(&self, owner: Uuid, task: NewTask) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks (id, owner_id, title, description, status, priority, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(owner)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .fetch_one(&self.db)
        .await?;
        Task::try_from(row)
    }

    async fn update(&self, owner: Uuid, id: Uuid, changes: TaskChanges) -> StoreResult<Option<Task>> {
        let (set_due, due_date): (bool, Option<OffsetDateTime>) = match changes.due_date {
            Some(due) => (true, due),
            None => (false, None),
        };
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks
               SET title       = COALESCE($3, title),
                   description = COALESCE($4, description),
                   status      = COALESCE($5, status),
                   priority    = COALESCE($6, priority),
                   due_date    = CASE WHEN $7 THEN $8 ELSE due_date END,
                   updated_at  = now()
             WHERE id = $1 AND owner_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.status.map(|s| s.as_str()))
        .bind(changes.priority.map(|p| p.as_str()))
        .bind(set_due)
        .bind(due_date)
        .fetch_optional(&self.db)
        .await?;
        row.map(Task::try_from).transpose()
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM tasks WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn count_by_status(&self, owner: Uuid) -> StoreResult<Vec<(TaskStatus, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COUNT(*)
              FROM tasks
             WHERE owner_id = $1
             GROUP BY status
            "#,
        )
        .bind(owner)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter()
            .map(|(status, n)| -> StoreResult<(TaskStatus, i64)> {
                Ok((status.parse::<TaskStatus>().map_err(StoreError::Corrupt)?, n))
            })
            .collect()
    }
}
