use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{AppJson, AppPath, AppQuery, AppResult},
    state::AppState,
    tasks::{
        dto::{
            CreateTaskRequest, MessageResponse, StatsResponse, TaskListResponse, TaskQuery,
            TaskResponse, TaskView, UpdateTaskRequest,
        },
        services,
    },
};

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/stats", get(task_stats))
        .route("/tasks/:id", get(get_task).put(update_task).delete(delete_task))
}

#[instrument(skip(state, me), fields(user_id = %me.id))]
pub async fn list_tasks(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    AppQuery(query): AppQuery<TaskQuery>,
) -> AppResult<Json<TaskListResponse>> {
    let tasks: Vec<TaskView> = services::list_tasks(state.tasks.as_ref(), me.id, &query)
        .await?
        .into_iter()
        .map(TaskView::from)
        .collect();
    Ok(Json(TaskListResponse {
        success: true,
        count: tasks.len(),
        tasks,
    }))
}

#[instrument(skip(state, me), fields(user_id = %me.id))]
pub async fn get_task(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<TaskResponse>> {
    let task = services::get_task(state.tasks.as_ref(), me.id, id).await?;
    Ok(Json(TaskResponse {
        success: true,
        task: task.into(),
    }))
}

#[instrument(skip(state, me, payload), fields(user_id = %me.id))]
pub async fn create_task(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    AppJson(payload): AppJson<CreateTaskRequest>,
) -> AppResult<(StatusCode, Json<TaskResponse>)> {
    let task = services::create_task(state.tasks.as_ref(), me.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            success: true,
            task: task.into(),
        }),
    ))
}

#[instrument(skip(state, me, payload), fields(user_id = %me.id))]
pub async fn update_task(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateTaskRequest>,
) -> AppResult<Json<TaskResponse>> {
    let task = services::update_task(state.tasks.as_ref(), me.id, id, payload).await?;
    Ok(Json(TaskResponse {
        success: true,
        task: task.into(),
    }))
}

#[instrument(skip(state, me), fields(user_id = %me.id))]
pub async fn delete_task(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    services::delete_task(state.tasks.as_ref(), me.id, id).await?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Task deleted successfully".into(),
    }))
}

#[instrument(skip(state, me), fields(user_id = %me.id))]
pub async fn task_stats(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<StatsResponse>> {
    let stats = services::stats(state.tasks.as_ref(), me.id).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}
