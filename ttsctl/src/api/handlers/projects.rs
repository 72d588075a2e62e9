//! HTTP handlers for generation projects.

use axum::{
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
    response::Json,
};
use tracing::warn;

use crate::{
    AppState,
    api::models::projects::{ProjectListResponse, ProjectResponse},
    auth::current_user::CurrentAccount,
    errors::{Error, Result},
    types::{ProjectId, abbrev_uuid},
};

/// List the caller's projects
#[utoipa::path(
    get,
    path = "/projects",
    tag = "projects",
    summary = "List projects",
    description = "All generations of the calling account, newest first. Audio URLs are minted per request.",
    responses(
        (status = 200, description = "Projects", body = ProjectListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_projects(State(state): State<AppState>, account: CurrentAccount) -> Result<Json<ProjectListResponse>> {
    let projects = state.store.list_projects(account.id).await?;

    let mut data = Vec::with_capacity(projects.len());
    for project in projects {
        let audio_url = state.blobs.url_for(&project.s3_key).await?;
        data.push(ProjectResponse::new(project, audio_url));
    }

    Ok(Json(ProjectListResponse { data }))
}

/// Delete one of the caller's projects
#[utoipa::path(
    delete,
    path = "/projects/{project_id}",
    tag = "projects",
    summary = "Delete project",
    description = "Delete a project owned by the caller. A missing project and another account's project give the same 404.",
    params(
        ("project_id" = uuid::Uuid, Path, description = "Project ID"),
    ),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Project not found"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(project_id = tracing::field::Empty))]
pub async fn delete_project(
    State(state): State<AppState>,
    account: CurrentAccount,
    project_id: std::result::Result<Path<ProjectId>, PathRejection>,
) -> Result<StatusCode> {
    // A malformed id cannot name any project, so it gets the same answer as a missing one
    let Path(project_id) = project_id.map_err(|_| Error::NotFoundOrUnauthorized)?;
    tracing::Span::current().record("project_id", abbrev_uuid(&project_id).as_str());

    let project = state
        .store
        .delete_project(account.id, project_id)
        .await?
        .ok_or(Error::NotFoundOrUnauthorized)?;

    // The record is gone either way; a leftover artifact is only wasted storage
    if state.config.storage.delete_artifacts_on_project_delete
        && let Err(e) = state.blobs.delete(&project.s3_key).await
    {
        warn!(s3_key = %project.s3_key, error = %e, "Failed to delete artifact of deleted project");
    }

    Ok(StatusCode::NO_CONTENT)
}
