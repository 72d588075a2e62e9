//! OpenAPI document for the HTTP API, served at `/api-docs/openapi.json` and rendered at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{api, billing::WebhookOutcome, db::models::credits::CreditTransactionType};

/// Session token in a header or cookie, or an identity header set by a trusted proxy.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "BearerAuth".to_string(),
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Session token issued by the identity provider:\n\n\
                            ```\nAuthorization: Bearer YOUR_SESSION_TOKEN\n```",
                        ))
                        .build(),
                ),
            );
            components.security_schemes.insert(
                "CookieAuth".to_string(),
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "ttsctl_session",
                    "The same session token, sent as a cookie by browser clients",
                ))),
            );
            components.security_schemes.insert(
                "ProxyHeader".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-ttsctl-account",
                    "Account id set by a trusted authenticating proxy, when enabled",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ttsctl",
        description = "Credit-metered text-to-speech: generate speech, manage voice samples and projects, and track credits."
    ),
    servers((url = "/api/v1", description = "Account API")),
    paths(
        api::handlers::speech::create_speech,
        api::handlers::projects::list_projects,
        api::handlers::projects::delete_project,
        api::handlers::voices::list_voices,
        api::handlers::voices::upload_voice,
        api::handlers::credits::get_balance,
        api::handlers::credits::list_transactions,
    ),
    components(schemas(
        api::models::speech::SpeechCreate,
        api::models::speech::SpeechResponse,
        api::models::projects::ProjectResponse,
        api::models::projects::ProjectListResponse,
        api::models::voices::VoiceSource,
        api::models::voices::VoiceResponse,
        api::models::voices::VoiceListResponse,
        api::models::credits::BalanceResponse,
        api::models::credits::CreditTransactionResponse,
        api::models::credits::TransactionListResponse,
        api::models::payments::WebhookAck,
        CreditTransactionType,
        WebhookOutcome,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "speech", description = "Speech generation"),
        (name = "projects", description = "Persisted generations"),
        (name = "voices", description = "Reference voices"),
        (name = "credits", description = "Credit balance and ledger"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_routes_and_security() {
        let doc = ApiDoc::openapi();
        for path in ["/speech", "/projects", "/projects/{project_id}", "/voices", "/credits/balance", "/credits/transactions"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }

        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("BearerAuth"));
        assert!(schemes.contains_key("CookieAuth"));
        assert!(schemes.contains_key("ProxyHeader"));
    }
}
