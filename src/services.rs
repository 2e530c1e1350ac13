use std::sync::Arc;
use thiserror::Error;

use crate::assistant::Assistant;
use crate::auth::{Auth, AuthError, FirebaseIdentity, Principal};
use crate::config::Config;
use crate::database::{Database, DatabaseError};
use crate::llm::{GeminiClient, LlmError};
use crate::store::{FirebaseStore, StoreError, TaskStore};
use crate::voice::{CommandRecognizer, Speaker, SpeechRecognizer};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Auth setup failed: {0}")]
    Auth(#[from] AuthError),
    #[error("Task store setup failed: {0}")]
    Store(#[from] StoreError),
    #[error("Language model setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Everything the CLI commands and the TUI talk to
pub struct Services {
    pub config: Config,
    pub auth: Auth,
    pub store: TaskStore,
    pub assistant: Assistant,
    pub speaker: Speaker,
    pub recognizer: Arc<dyn SpeechRecognizer>,
}

impl Services {
    /// Build the hosted-service clients from `config` and restore the saved
    /// session. The store follows whoever ends up signed in.
    pub async fn connect(config: Config) -> Result<Self, ServiceError> {
        if config.firebase.api_key.is_empty() {
            tracing::warn!("firebase.api_key is not set; sign-in will fail");
        }
        if config.firebase.database_url.is_empty() {
            tracing::warn!("firebase.database_url is not set; tasks cannot be stored");
        }

        let db_path = config.get_database_path();
        let identity = Arc::new(FirebaseIdentity::new(&config.firebase)?);
        let auth = Auth::new(identity, Some(Database::new(&db_path)?));
        let remote = Arc::new(FirebaseStore::new(&config.firebase)?);
        let store = TaskStore::new(remote, Some(Database::new(&db_path)?));
        let llm = Arc::new(GeminiClient::new(&config.llm)?);
        let assistant = Assistant::new(llm, &config.llm);
        let speaker = Speaker::detect(&config.voice).await;
        let recognizer = Arc::new(CommandRecognizer::new(config.voice.recognizer_command.clone()));

        let mut services = Self {
            config,
            auth,
            store,
            assistant,
            speaker,
            recognizer,
        };
        services.auth.restore().await;
        services.sync_principal().await;
        Ok(services)
    }

    /// Point the task store at the current principal, refreshing an expired
    /// id token first.
    pub async fn sync_principal(&mut self) -> Option<Principal> {
        let principal = self.auth.ensure_fresh().await;
        self.store.set_principal(principal.clone()).await;
        principal
    }

    pub fn speak(&mut self, text: &str) {
        self.speaker.speak(text);
    }

    /// Narrate and block until done, for commands that exit right after
    pub async fn speak_and_wait(&mut self, text: &str) {
        self.speaker.speak_and_wait(text).await;
    }
}
