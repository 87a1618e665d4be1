use tracing::info;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    tasks::{
        dto::{CreateTaskRequest, TaskQuery, TaskStats, UpdateTaskRequest},
        repo::TaskStore,
        repo_types::{Task, TaskStatus},
        validation,
    },
};

fn not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

pub async fn list_tasks(tasks: &dyn TaskStore, owner: Uuid, query: &TaskQuery) -> AppResult<Vec<Task>> {
    let Some(filter) = validation::task_filter(query) else {
        return Ok(Vec::new());
    };
    Ok(tasks.list(owner, &filter).await?)
}

pub async fn get_task(tasks: &dyn TaskStore, owner: Uuid, id: Uuid) -> AppResult<Task> {
    tasks.find(owner, id).await?.ok_or_else(not_found)
}

pub async fn create_task(tasks: &dyn TaskStore, owner: Uuid, req: CreateTaskRequest) -> AppResult<Task> {
    let new_task = validation::new_task(req)?;
    let task = tasks.create(owner, new_task).await?;
    info!(task_id = %task.id, %owner, "task created");
    Ok(task)
}

pub async fn update_task(
    tasks: &dyn TaskStore,
    owner: Uuid,
    id: Uuid,
    req: UpdateTaskRequest,
) -> AppResult<Task> {
    let changes = validation::task_changes(req)?;
    let task = tasks.update(owner, id, changes).await?.ok_or_else(not_found)?;
    info!(task_id = %task.id, %owner, "task updated");
    Ok(task)
}

pub async fn delete_task(tasks: &dyn TaskStore, owner: Uuid, id: Uuid) -> AppResult<()> {
    if !tasks.delete(owner, id).await? {
        return Err(not_found());
    }
    info!(task_id = %id, %owner, "task deleted");
    Ok(())
}

pub async fn stats(tasks: &dyn TaskStore, owner: Uuid) -> AppResult<TaskStats> {
    let mut stats = TaskStats::default();
    for (status, count) in tasks.count_by_status(owner).await? {
        match status {
            TaskStatus::Pending => stats.pending += count,
            TaskStatus::InProgress => stats.in_progress += count,
            TaskStatus::Completed => stats.completed += count,
        }
        stats.total += count;
    }
    Ok(stats)
}
