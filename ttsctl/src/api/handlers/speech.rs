//! HTTP handler for speech generation.

use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};

use crate::{
    AppState,
    api::models::speech::{SpeechCreate, SpeechResponse},
    auth::scope::RequestScope,
    errors::Result,
};

/// Generate speech from text
#[utoipa::path(
    post,
    path = "/speech",
    tag = "speech",
    summary = "Generate speech",
    description = "Synthesize text with a reference voice. Costs one credit per started 100 characters, at least one. \
                   Credits are only debited once synthesis has succeeded.",
    request_body = SpeechCreate,
    responses(
        (status = 200, description = "Speech generated and billed", body = SpeechResponse),
        (status = 400, description = "Missing or invalid field, or unknown voice"),
        (status = 401, description = "Unauthorized"),
        (status = 402, description = "Insufficient credits; body carries `needed` and `available`"),
        (status = 502, description = "Inference provider failed; nothing was billed"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_speech(
    State(state): State<AppState>,
    scope: RequestScope,
    request: std::result::Result<Json<SpeechCreate>, JsonRejection>,
) -> Result<Json<SpeechResponse>> {
    let Json(request) = request?;
    let result = state.orchestrator().generate(&scope, request.into()).await?;
    Ok(Json(SpeechResponse::from(result)))
}
