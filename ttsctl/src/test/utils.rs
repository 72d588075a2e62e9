//! Test utilities for handler and integration tests
use std::path::PathBuf;
use std::sync::Arc;

use axum_test::TestServer;
use tempfile::TempDir;
use url::Url;
use uuid::Uuid;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate, matchers::method};

use crate::{
    AppState,
    auth::session::{JwtSessionProvider, create_session_provider},
    billing::create_webhook_verifier,
    blob::LocalBlobStore,
    config::{Config, DefaultVoice, StorageBackend},
    db::models::accounts::AccountCreateDBRequest,
    inference::HttpInferenceProvider,
    store::InMemoryStore,
    types::{AccountId, Credits},
};

/// Key of the default voice configured for every harness
pub const VOICE: &str = "samples/voices/en-female.wav";

/// Payment webhook secret configured for every harness
pub const WEBHOOK_SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

const SESSION_SECRET: &str = "test-secret-key-for-testing-only";

pub fn create_test_config(inference_url: Url, artifacts: PathBuf) -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.database.in_memory = true;
    config.enable_metrics = false;
    config.auth.session.secret_key = Some(SESSION_SECRET.to_string());
    config.inference.url = inference_url;
    config.inference.key = Some("wk-test".to_string());
    config.inference.secret = Some("ws-test".to_string());
    config.inference.default_voices = vec![DefaultVoice {
        name: "English (female)".to_string(),
        s3_key: VOICE.to_string(),
    }];
    config.storage.backend = StorageBackend::Local {
        path: artifacts,
        public_base_url: Url::parse("http://localhost:3001/artifacts/").unwrap(),
    };
    config.payments.webhook_secret = Some(WEBHOOK_SECRET.to_string());
    config.payments.products = [("prod_small", 100), ("prod_medium", 250), ("prod_large", 500)]
        .into_iter()
        .map(|(id, credits)| (id.to_string(), credits))
        .collect();
    config
}

/// Writes a fake artifact where the real provider would and answers with its key
struct SynthesisResponder {
    artifacts: PathBuf,
}

impl Respond for SynthesisResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let key = format!("tts/{}.wav", Uuid::new_v4());
        let path = self.artifacts.join(&key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"RIFF....WAVEfmt ").unwrap();
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "s3_Key": key }))
    }
}

/// A fully wired [`AppState`] over an in-memory store, a temporary artifact directory and a
/// mocked synthesis endpoint.
///
/// `state` is public so tests can adjust configuration before calling [`TestHarness::server`].
pub struct TestHarness {
    pub state: AppState,
    pub mock_server: MockServer,
    sessions: JwtSessionProvider,
    artifacts: TempDir,
}

#[derive(Default)]
pub struct TestHarnessBuilder {
    initial_credits: Option<Credits>,
}

impl TestHarnessBuilder {
    pub fn initial_credits(mut self, credits: Credits) -> Self {
        self.initial_credits = Some(credits);
        self
    }

    pub async fn build(self) -> TestHarness {
        let mock_server = MockServer::start().await;
        let artifacts = tempfile::tempdir().expect("Failed to create artifact dir");

        let inference_url = Url::parse(&format!("{}/generate", mock_server.uri())).unwrap();
        let mut config = create_test_config(inference_url, artifacts.path().to_path_buf());
        if let Some(credits) = self.initial_credits {
            config.credits.initial_credits = credits;
        }

        let blobs = LocalBlobStore::new(
            artifacts.path().to_path_buf(),
            Url::parse("http://localhost:3001/artifacts/").unwrap(),
        )
        .unwrap();

        let state = AppState::builder()
            .store(Arc::new(InMemoryStore::new()))
            .blobs(Arc::new(blobs))
            .inference(Arc::new(HttpInferenceProvider::new(&config.inference).unwrap()))
            .sessions(create_session_provider(&config.auth).unwrap())
            .maybe_webhook_verifier(create_webhook_verifier(&config.payments).unwrap())
            .config(config.clone())
            .build();

        TestHarness {
            state,
            mock_server,
            sessions: JwtSessionProvider::new(&config.auth.session).unwrap(),
            artifacts,
        }
    }
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::builder().build().await
    }

    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::default()
    }

    /// Test server over the router built from the current state
    pub fn server(&self) -> TestServer {
        let router = crate::build_router(self.state.clone()).expect("Failed to build router");
        TestServer::new(router).expect("Failed to create test server")
    }

    pub fn token(&self, account_id: AccountId) -> String {
        self.sessions.issue(account_id, None).expect("Failed to issue session token")
    }

    /// Value for an `authorization` header
    pub fn bearer(&self, account_id: AccountId) -> String {
        format!("Bearer {}", self.token(account_id))
    }

    pub async fn create_account(&self, account_id: AccountId) {
        self.state
            .store
            .ensure_account(&AccountCreateDBRequest {
                id: account_id,
                email: None,
                initial_credits: self.state.config.credits.initial_credits,
            })
            .await
            .expect("Failed to create account");
    }

    pub async fn balance(&self, account_id: AccountId) -> Credits {
        self.state.store.get_balance(account_id).await.expect("Failed to read balance")
    }

    pub async fn project_count(&self, account_id: AccountId) -> usize {
        self.state.store.list_projects(account_id).await.expect("Failed to list projects").len()
    }

    pub async fn voice_count(&self, account_id: AccountId) -> usize {
        self.state.store.list_voices(account_id).await.expect("Failed to list voices").len()
    }

    pub fn artifact_exists(&self, key: &str) -> bool {
        self.artifacts.path().join(key).is_file()
    }

    /// Every synthesis call succeeds and leaves a fresh `tts/<uuid>.wav` artifact behind
    pub async fn mock_synthesis_success(&self) {
        Mock::given(method("POST"))
            .respond_with(SynthesisResponder {
                artifacts: self.artifacts.path().to_path_buf(),
            })
            .mount(&self.mock_server)
            .await;
    }

    pub async fn mock_synthesis_failure(&self, status: u16) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("worker crashed"))
            .mount(&self.mock_server)
            .await;
    }

    /// Number of synthesis calls the mock endpoint received
    pub async fn synthesis_calls(&self) -> usize {
        self.mock_server.received_requests().await.map(|r| r.len()).unwrap_or(0)
    }
}
