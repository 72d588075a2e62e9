//! The billed generation workflow.
//!
//! Steps run in this order, and a failure at any step leaves no effect from a later one:
//!
//! 1. Validate and price the input ([`pricing::validate`])
//! 2. Check the voice is a shared default or one the account uploaded
//! 3. Check the request-scoped balance covers the cost
//! 4. Call the inference provider
//! 5. Mint the artifact URL
//! 6. Debit and record the project in one datastore operation
//!
//! The provider writes the audio before anything is billed. If steps 5 or 6 fail,
//! the fresh artifact is deleted so that no unbilled audio is left behind.

use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::pricing::{self, GenerationInput, ValidatedGeneration};
use crate::{
    auth::scope::RequestScope,
    blob::BlobStore,
    config::InferenceConfig,
    db::models::projects::{ProjectCreateDBRequest, ProjectDBResponse},
    errors::{Error, Result},
    inference::{InferenceProvider, SynthesisRequest},
    metrics::{self, GenerationOutcome},
    store::{Datastore, DebitOutcome},
    types::{AccountId, Credits, abbrev_uuid},
};

/// A billed, persisted generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub project: ProjectDBResponse,
    pub audio_url: String,
    pub balance_after: Credits,
}

pub struct Orchestrator {
    store: Arc<dyn Datastore>,
    blobs: Arc<dyn BlobStore>,
    inference: Arc<dyn InferenceProvider>,
    default_voice_keys: Vec<String>,
    max_text_chars: usize,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn Datastore>,
        blobs: Arc<dyn BlobStore>,
        inference: Arc<dyn InferenceProvider>,
        config: &InferenceConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            inference,
            default_voice_keys: config.default_voices.iter().map(|v| v.s3_key.clone()).collect(),
            max_text_chars: config.max_text_chars,
        }
    }

    /// Run one generation for the account behind `scope`.
    #[instrument(skip_all, fields(account_id = %abbrev_uuid(&scope.account_id())))]
    pub async fn generate(&self, scope: &RequestScope, input: GenerationInput) -> Result<GenerationResult> {
        let result = self.run(scope, input).await;
        metrics::record_generation(match &result {
            Ok(_) => GenerationOutcome::Success,
            Err(Error::Validation { .. }) => GenerationOutcome::Invalid,
            Err(Error::InsufficientCredits { .. }) => GenerationOutcome::InsufficientCredits,
            Err(Error::Provider { .. }) => GenerationOutcome::ProviderError,
            Err(_) => GenerationOutcome::InternalError,
        });
        result
    }

    async fn run(&self, scope: &RequestScope, input: GenerationInput) -> Result<GenerationResult> {
        let request = pricing::validate(input, self.max_text_chars)?;
        let account_id = scope.account_id();

        if !self.voice_allowed(account_id, &request.voice_s3_key).await? {
            return Err(Error::Validation {
                message: format!("Unknown voice: {}", request.voice_s3_key),
            });
        }

        let available = scope.balance().await?;
        if available < request.cost {
            return Err(Error::InsufficientCredits {
                needed: request.cost,
                available,
            });
        }

        let output = self.inference.synthesize(&synthesis_request(&request)).await?;

        let audio_url = match self.blobs.url_for(&output.s3_key).await {
            Ok(url) => url,
            Err(e) => {
                self.discard_artifact(&output.s3_key).await;
                return Err(e.into());
            }
        };

        let create = ProjectCreateDBRequest {
            id: Uuid::new_v4(),
            account_id,
            text: request.text,
            language: request.language,
            voice_s3_key: request.voice_s3_key,
            exaggeration: request.exaggeration,
            cfg_weight: request.cfg_weight,
            s3_key: output.s3_key,
            credits_charged: request.cost,
        };

        let outcome = match self.store.debit_and_create_project(&create).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.discard_artifact(&create.s3_key).await;
                return Err(e.into());
            }
        };

        match outcome {
            DebitOutcome::Charged { project, balance_after } => {
                scope.record_balance(balance_after);
                metrics::record_credits_debited(project.credits_charged);
                info!(
                    project_id = %abbrev_uuid(&project.id),
                    cost = project.credits_charged,
                    balance_after,
                    "Generated speech"
                );
                Ok(GenerationResult {
                    project,
                    audio_url,
                    balance_after,
                })
            }
            // A concurrent request spent the credits between the scoped read and the debit
            DebitOutcome::Insufficient { available } => {
                scope.record_balance(available);
                self.discard_artifact(&create.s3_key).await;
                Err(Error::InsufficientCredits {
                    needed: create.credits_charged,
                    available,
                })
            }
        }
    }

    async fn voice_allowed(&self, account_id: AccountId, voice_s3_key: &str) -> Result<bool> {
        if self.default_voice_keys.iter().any(|key| key == voice_s3_key) {
            return Ok(true);
        }
        Ok(self.store.account_owns_voice(account_id, voice_s3_key).await?)
    }

    async fn discard_artifact(&self, key: &str) {
        if let Err(e) = self.blobs.delete(key).await {
            warn!(s3_key = key, error = %e, "Failed to delete unbilled artifact");
        }
    }
}

fn synthesis_request(request: &ValidatedGeneration) -> SynthesisRequest {
    SynthesisRequest {
        text: request.text.clone(),
        voice_s3_key: request.voice_s3_key.clone(),
        language: request.language.clone(),
        exaggeration: request.exaggeration,
        cfg_weight: request.cfg_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::current_user::CurrentAccount;
    use crate::blob::LocalBlobStore;
    use crate::config::DefaultVoice;
    use crate::db::errors::DbError;
    use crate::db::handlers::credits::{CreditTransactionFilter, GrantResult};
    use crate::db::models::{
        accounts::{AccountCreateDBRequest, AccountDBResponse},
        credits::{CreditGrantDBRequest, CreditTransactionDBResponse},
        voices::{VoiceCreateDBRequest, VoiceDBResponse},
    };
    use crate::inference::{ProviderError, SynthesisOutput};
    use crate::store::InMemoryStore;
    use crate::types::ProjectId;
    use async_trait::async_trait;
    use bytes::Bytes;
    use parking_lot::Mutex;
    use url::Url;

    const VOICE: &str = "samples/voices/en-female.wav";

    /// Writes a file into the blob store the way the remote worker writes to the bucket
    struct FakeProvider {
        blobs: Arc<LocalBlobStore>,
        fail: bool,
        calls: Mutex<Vec<SynthesisRequest>>,
    }

    #[async_trait]
    impl InferenceProvider for FakeProvider {
        async fn synthesize(&self, request: &SynthesisRequest) -> std::result::Result<SynthesisOutput, ProviderError> {
            self.calls.lock().push(request.clone());
            if self.fail {
                return Err(ProviderError::Status {
                    status: 500,
                    body: "worker crashed".to_string(),
                });
            }
            let s3_key = format!("tts/{}.wav", Uuid::new_v4());
            self.blobs
                .put(&s3_key, Bytes::from_static(b"RIFF"), "audio/wav")
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))?;
            Ok(SynthesisOutput { s3_key })
        }
    }

    /// Delegates to [`InMemoryStore`] but fails every debit
    struct FailingDebitStore(InMemoryStore);

    #[async_trait]
    impl Datastore for FailingDebitStore {
        async fn ensure_account(&self, r: &AccountCreateDBRequest) -> crate::db::errors::Result<(AccountDBResponse, bool)> {
            self.0.ensure_account(r).await
        }
        async fn get_balance(&self, id: AccountId) -> crate::db::errors::Result<Credits> {
            self.0.get_balance(id).await
        }
        async fn debit_and_create_project(&self, _: &ProjectCreateDBRequest) -> crate::db::errors::Result<DebitOutcome> {
            Err(DbError::Other(anyhow::anyhow!("connection reset")))
        }
        async fn credit(&self, r: &CreditGrantDBRequest) -> crate::db::errors::Result<GrantResult> {
            self.0.credit(r).await
        }
        async fn list_projects(&self, id: AccountId) -> crate::db::errors::Result<Vec<ProjectDBResponse>> {
            self.0.list_projects(id).await
        }
        async fn delete_project(&self, id: AccountId, p: ProjectId) -> crate::db::errors::Result<Option<ProjectDBResponse>> {
            self.0.delete_project(id, p).await
        }
        async fn create_voice(&self, r: &VoiceCreateDBRequest) -> crate::db::errors::Result<VoiceDBResponse> {
            self.0.create_voice(r).await
        }
        async fn list_voices(&self, id: AccountId) -> crate::db::errors::Result<Vec<VoiceDBResponse>> {
            self.0.list_voices(id).await
        }
        async fn account_owns_voice(&self, id: AccountId, key: &str) -> crate::db::errors::Result<bool> {
            self.0.account_owns_voice(id, key).await
        }
        async fn list_transactions(&self, f: &CreditTransactionFilter) -> crate::db::errors::Result<Vec<CreditTransactionDBResponse>> {
            self.0.list_transactions(f).await
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        blobs: Arc<LocalBlobStore>,
        provider: Arc<FakeProvider>,
        store: InMemoryStore,
        account_id: AccountId,
    }

    impl Fixture {
        async fn new(credits: Credits, provider_fails: bool) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let blobs = Arc::new(
                LocalBlobStore::new(dir.path().to_path_buf(), Url::parse("http://localhost:3001/artifacts/").unwrap()).unwrap(),
            );
            let provider = Arc::new(FakeProvider {
                blobs: blobs.clone(),
                fail: provider_fails,
                calls: Mutex::new(Vec::new()),
            });
            let store = InMemoryStore::new();
            let account_id = Uuid::new_v4();
            store
                .ensure_account(&AccountCreateDBRequest {
                    id: account_id,
                    email: None,
                    initial_credits: credits,
                })
                .await
                .unwrap();
            Self {
                _dir: dir,
                blobs,
                provider,
                store,
                account_id,
            }
        }

        fn orchestrator_with(&self, store: Arc<dyn Datastore>) -> Orchestrator {
            let config = InferenceConfig {
                default_voices: vec![DefaultVoice {
                    name: "English (female)".to_string(),
                    s3_key: VOICE.to_string(),
                }],
                ..Default::default()
            };
            Orchestrator::new(store, self.blobs.clone(), self.provider.clone(), &config)
        }

        fn orchestrator(&self) -> Orchestrator {
            self.orchestrator_with(Arc::new(self.store.clone()))
        }

        fn scope(&self) -> RequestScope {
            RequestScope::new(
                CurrentAccount {
                    id: self.account_id,
                    email: None,
                },
                Arc::new(self.store.clone()),
            )
        }

        fn artifacts_on_disk(&self) -> usize {
            match std::fs::read_dir(self.blobs.root().join("tts")) {
                Ok(entries) => entries.count(),
                Err(_) => 0,
            }
        }
    }

    fn input(chars: usize) -> GenerationInput {
        GenerationInput {
            text: Some("a".repeat(chars)),
            voice_s3_key: Some(VOICE.to_string()),
            language: Some("en".to_string()),
            ..Default::default()
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_debits_then_rejects_when_balance_runs_out() {
        let fx = Fixture::new(5, false).await;
        let orchestrator = fx.orchestrator();

        let result = orchestrator.generate(&fx.scope(), input(250)).await.unwrap();
        assert_eq!(result.project.credits_charged, 3);
        assert_eq!(result.balance_after, 2);
        assert_eq!(result.project.account_id, fx.account_id);
        assert_eq!(
            result.audio_url,
            format!("http://localhost:3001/artifacts/{}", result.project.s3_key)
        );
        assert_eq!(fx.store.get_balance(fx.account_id).await.unwrap(), 2);

        let err = orchestrator.generate(&fx.scope(), input(250)).await.unwrap_err();
        assert!(matches!(err, Error::InsufficientCredits { needed: 3, available: 2 }));
        assert_eq!(fx.store.get_balance(fx.account_id).await.unwrap(), 2);
        assert_eq!(fx.store.list_projects(fx.account_id).await.unwrap().len(), 1);
        // The rejected request never reached the provider
        assert_eq!(fx.provider.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_defaults_are_recorded_on_the_project() {
        let fx = Fixture::new(5, false).await;
        let result = fx.orchestrator().generate(&fx.scope(), input(10)).await.unwrap();

        assert_eq!(result.project.exaggeration, 0.5);
        assert_eq!(result.project.cfg_weight, 0.5);
        assert_eq!(result.project.language, "en");

        let calls = fx.provider.calls.lock();
        assert_eq!(calls[0].exaggeration, 0.5);
        assert_eq!(calls[0].cfg_weight, 0.5);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_no_trace() {
        let fx = Fixture::new(5, true).await;
        let err = fx.orchestrator().generate(&fx.scope(), input(250)).await.unwrap_err();

        assert!(matches!(err, Error::Provider { .. }));
        assert_eq!(fx.store.get_balance(fx.account_id).await.unwrap(), 5);
        assert!(fx.store.list_projects(fx.account_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_call() {
        let fx = Fixture::new(5, false).await;
        let err = fx
            .orchestrator()
            .generate(
                &fx.scope(),
                GenerationInput {
                    language: None,
                    ..input(10)
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation { .. }));
        assert!(fx.provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_voice_rejected() {
        let fx = Fixture::new(5, false).await;
        let other = Uuid::new_v4();
        fx.store
            .ensure_account(&AccountCreateDBRequest {
                id: other,
                email: None,
                initial_credits: 0,
            })
            .await
            .unwrap();
        fx.store
            .create_voice(&VoiceCreateDBRequest {
                id: Uuid::new_v4(),
                account_id: other,
                name: "theirs".to_string(),
                s3_key: format!("voices/{other}/1-theirs.wav"),
                content_type: "audio/wav".to_string(),
                size_bytes: 4,
            })
            .await
            .unwrap();

        let mut req = input(10);
        req.voice_s3_key = Some(format!("voices/{other}/1-theirs.wav"));
        let err = fx.orchestrator().generate(&fx.scope(), req).await.unwrap_err();
        assert!(matches!(err, Error::Validation { message } if message.contains("Unknown voice")));
        assert!(fx.provider.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_own_uploaded_voice_accepted() {
        let fx = Fixture::new(5, false).await;
        let key = format!("voices/{}/1-mine.wav", fx.account_id);
        fx.store
            .create_voice(&VoiceCreateDBRequest {
                id: Uuid::new_v4(),
                account_id: fx.account_id,
                name: "mine".to_string(),
                s3_key: key.clone(),
                content_type: "audio/wav".to_string(),
                size_bytes: 4,
            })
            .await
            .unwrap();

        let mut req = input(10);
        req.voice_s3_key = Some(key.clone());
        let result = fx.orchestrator().generate(&fx.scope(), req).await.unwrap();
        assert_eq!(result.project.voice_s3_key, key);
    }

    #[tokio::test]
    async fn test_failed_debit_deletes_fresh_artifact() {
        let fx = Fixture::new(5, false).await;
        let orchestrator = fx.orchestrator_with(Arc::new(FailingDebitStore(fx.store.clone())));

        let err = orchestrator.generate(&fx.scope(), input(10)).await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert_eq!(fx.provider.calls.lock().len(), 1);
        assert_eq!(fx.artifacts_on_disk(), 0);
        assert_eq!(fx.store.get_balance(fx.account_id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_stale_scoped_balance_cannot_overdraw() {
        let fx = Fixture::new(3, false).await;
        let orchestrator = fx.orchestrator();

        // Both requests read a balance of 3 before either debits
        let first = fx.scope();
        let second = fx.scope();
        assert_eq!(first.balance().await.unwrap(), 3);
        assert_eq!(second.balance().await.unwrap(), 3);

        orchestrator.generate(&first, input(250)).await.unwrap();
        let err = orchestrator.generate(&second, input(250)).await.unwrap_err();

        assert!(matches!(err, Error::InsufficientCredits { needed: 3, available: 0 }));
        assert_eq!(fx.store.get_balance(fx.account_id).await.unwrap(), 0);
        assert_eq!(fx.store.list_projects(fx.account_id).await.unwrap().len(), 1);
        // The second synthesis was not billed, so its audio is gone
        assert_eq!(fx.artifacts_on_disk(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_generations_never_go_negative() {
        let fx = Fixture::new(10, false).await;
        let orchestrator = Arc::new(fx.orchestrator());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let orchestrator = orchestrator.clone();
            let scope = fx.scope();
            handles.push(tokio::spawn(async move { orchestrator.generate(&scope, input(250)).await }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(Error::InsufficientCredits { .. }) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(successes, 3);
        assert_eq!(fx.store.get_balance(fx.account_id).await.unwrap(), 1);
        assert_eq!(fx.store.list_projects(fx.account_id).await.unwrap().len(), 3);
    }
}
