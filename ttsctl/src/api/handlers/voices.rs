//! HTTP handlers for reference voices: shared defaults and uploaded samples.

use axum::{
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::Json,
};
use bytes::{Bytes, BytesMut};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::voices::{VoiceListResponse, VoiceResponse},
    auth::current_user::CurrentAccount,
    db::models::voices::VoiceCreateDBRequest,
    errors::{Error, Result},
    types::{AccountId, VoiceId, abbrev_uuid},
};

/// Longest sanitized file name kept in an artifact key
const MAX_FILE_NAME_CHARS: usize = 64;

/// Room for multipart boundaries and the `name` field on top of the file itself
pub const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// List voices the caller can synthesize with
#[utoipa::path(
    get,
    path = "/voices",
    tag = "voices",
    summary = "List voices",
    description = "Shared default voices followed by the caller's uploaded samples, newest first.",
    responses(
        (status = 200, description = "Voices", body = VoiceListResponse),
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
pub async fn list_voices(State(state): State<AppState>, account: CurrentAccount) -> Result<Json<VoiceListResponse>> {
    let mut data = Vec::new();

    for voice in &state.config.inference.default_voices {
        let audio_url = state.blobs.url_for(&voice.s3_key).await?;
        data.push(VoiceResponse::default_voice(voice, audio_url));
    }

    for voice in state.store.list_voices(account.id).await? {
        let audio_url = state.blobs.url_for(&voice.s3_key).await?;
        data.push(VoiceResponse::uploaded(voice, audio_url));
    }

    Ok(Json(VoiceListResponse { data }))
}

/// Upload a reference voice sample
#[utoipa::path(
    post,
    path = "/voices",
    tag = "voices",
    summary = "Upload voice sample",
    description = "Multipart upload with a `name` field and an audio `file` field. \
                   The file must have an `audio/*` content type and fit the configured size limit (10 MiB by default).",
    request_body(
        content_type = "multipart/form-data",
        description = "`name`: display name, `file`: the audio sample"
    ),
    responses(
        (status = 201, description = "Voice sample stored", body = VoiceResponse),
        (status = 400, description = "Missing file or malformed multipart body"),
        (status = 401, description = "Unauthorized"),
        (status = 413, description = "File too large"),
        (status = 415, description = "Not an audio file"),
        (status = 500, description = "Internal server error"),
    ),
    security(
        ("BearerAuth" = []),
        ("CookieAuth" = []),
        ("ProxyHeader" = [])
    )
)]
#[tracing::instrument(skip_all, fields(account_id = %abbrev_uuid(&account.id)))]
pub async fn upload_voice(
    State(state): State<AppState>,
    account: CurrentAccount,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<VoiceResponse>)> {
    let mut multipart = multipart?;
    let max_size = state.config.limits.max_voice_upload_bytes;

    let mut name: Option<String> = None;
    let mut upload: Option<(String, String, Bytes)> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|e| multipart_error(e, max_size))? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "name" => {
                name = Some(field.text().await.map_err(|e| multipart_error(e, max_size))?);
            }
            "file" => {
                let content_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                if !is_audio(&content_type) {
                    return Err(Error::UnsupportedMediaType { content_type });
                }
                let file_name = field.file_name().unwrap_or("sample").to_string();

                // Abort as soon as the limit is crossed instead of buffering the whole body
                let mut buffer = BytesMut::new();
                while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, max_size))? {
                    if (buffer.len() + chunk.len()) as u64 > max_size {
                        return Err(Error::PayloadTooLarge { limit: max_size });
                    }
                    buffer.extend_from_slice(&chunk);
                }

                upload = Some((file_name, content_type, buffer.freeze()));
            }
            _ => {}
        }
    }

    let Some((file_name, content_type, bytes)) = upload else {
        return Err(Error::Validation {
            message: "Missing required field: file".to_string(),
        });
    };
    if bytes.is_empty() {
        return Err(Error::Validation {
            message: "Uploaded file is empty".to_string(),
        });
    }

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| file_name.clone());

    let voice_id = Uuid::new_v4();
    let s3_key = voice_key(account.id, voice_id, &file_name);
    let size_bytes = bytes.len() as i64;

    state.blobs.put(&s3_key, bytes, &content_type).await?;

    let request = VoiceCreateDBRequest {
        id: voice_id,
        account_id: account.id,
        name,
        s3_key: s3_key.clone(),
        content_type,
        size_bytes,
    };
    let voice = match state.store.create_voice(&request).await {
        Ok(voice) => voice,
        Err(e) => {
            if let Err(cleanup) = state.blobs.delete(&s3_key).await {
                warn!(s3_key = %s3_key, error = %cleanup, "Failed to delete sample after failed insert");
            }
            return Err(e.into());
        }
    };

    info!(voice_id = %abbrev_uuid(&voice.id), size_bytes, "Stored voice sample");
    let audio_url = state.blobs.url_for(&voice.s3_key).await?;
    Ok((StatusCode::CREATED, Json(VoiceResponse::uploaded(voice, audio_url))))
}

/// MIME types compare case-insensitively.
fn is_audio(content_type: &str) -> bool {
    content_type.trim_start().to_ascii_lowercase().starts_with("audio/")
}

fn multipart_error(e: MultipartError, max_size: u64) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge { limit: max_size }
    } else {
        Error::Validation {
            message: format!("Failed to parse multipart data: {e}"),
        }
    }
}

/// `voices/{account}/{millis}-{id}-{file name}`: namespaced by owner and unique per upload
fn voice_key(account_id: AccountId, voice_id: VoiceId, file_name: &str) -> String {
    let sanitized: String = file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .take(MAX_FILE_NAME_CHARS)
        .collect();
    let sanitized = if sanitized.trim_matches('.').is_empty() {
        "sample".to_string()
    } else {
        sanitized
    };

    format!(
        "voices/{account_id}/{}-{}-{sanitized}",
        Utc::now().timestamp_millis(),
        abbrev_uuid(&voice_id)
    )
}
