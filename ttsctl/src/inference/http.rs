//! HTTP client for the synthesis endpoint.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument};
use url::Url;

use super::{InferenceProvider, ProviderError, SynthesisOutput, SynthesisRequest};
use crate::config::InferenceConfig;

/// Longest slice of an error body kept for logs
const MAX_ERROR_BODY: usize = 512;

pub struct HttpInferenceProvider {
    client: reqwest::Client,
    url: Url,
}

impl HttpInferenceProvider {
    pub fn new(config: &InferenceConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in [(&config.key_header, &config.key), (&config.secret_header, &config.secret)] {
            if let Some(value) = value {
                let mut value = HeaderValue::from_str(value)?;
                value.set_sensitive(true);
                headers.insert(HeaderName::from_bytes(name.as_bytes())?, value);
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl InferenceProvider for HttpInferenceProvider {
    #[instrument(skip_all, fields(language = %request.language, chars = request.text.chars().count()), err)]
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisOutput, ProviderError> {
        let response = self.client.post(self.url.clone()).json(request).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
                body.truncate(cut);
            }
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;
        let output: SynthesisOutput = serde_json::from_slice(&bytes).map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        if output.s3_key.trim().is_empty() || crate::blob::validate_key(&output.s3_key).is_err() {
            return Err(ProviderError::MalformedResponse(format!("invalid artifact key {:?}", output.s3_key)));
        }

        debug!(s3_key = %output.s3_key, "Synthesis completed");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    fn config(server: &MockServer) -> InferenceConfig {
        InferenceConfig {
            url: Url::parse(&format!("{}/generate", server.uri())).unwrap(),
            key: Some("wk-test".to_string()),
            secret: Some("ws-test".to_string()),
            timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    fn request() -> SynthesisRequest {
        SynthesisRequest {
            text: "Hello world".to_string(),
            voice_s3_key: "samples/voices/en.wav".to_string(),
            language: "en".to_string(),
            exaggeration: 0.5,
            cfg_weight: 0.3,
        }
    }

    #[tokio::test]
    async fn test_success_sends_credentials_and_parses_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(header("Modal-Key", "wk-test"))
            .and(header("Modal-Secret", "ws-test"))
            .and(body_json(serde_json::json!({
                "text": "Hello world",
                "voice_s3_key": "samples/voices/en.wav",
                "language": "en",
                "exaggeration": 0.5,
                "cfg_weight": 0.3,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"s3_Key": "tts/abc.wav"})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = HttpInferenceProvider::new(&config(&server)).unwrap();
        let output = provider.synthesize(&request()).await.unwrap();
        assert_eq!(output.s3_key, "tts/abc.wav");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("CUDA out of memory"))
            .mount(&server)
            .await;

        let provider = HttpInferenceProvider::new(&config(&server)).unwrap();
        let err = provider.synthesize(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Status { status: 500, ref body } if body.contains("CUDA")));
    }

    #[tokio::test]
    async fn test_malformed_and_empty_payloads() {
        for body in [serde_json::json!({"key": "tts/abc.wav"}), serde_json::json!({"s3_Key": ""})] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;

            let provider = HttpInferenceProvider::new(&config(&server)).unwrap();
            let err = provider.synthesize(&request()).await.unwrap_err();
            assert!(matches!(err, ProviderError::MalformedResponse(_)));
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"s3_Key": "tts/abc.wav"}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let mut config = config(&server);
        config.timeout = Duration::from_millis(200);
        let provider = HttpInferenceProvider::new(&config).unwrap();
        let err = provider.synthesize(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout));
    }
}
