//! The signed-in user's task list, kept in memory and mirrored to the
//! remote per-user collection.

mod firebase;

pub use firebase::FirebaseStore;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::Principal;
use crate::database::{Database, DatabaseError};
use crate::models::{NewTask, Task};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Http(String),
    #[error("Remote store returned HTTP {status}: {body}")]
    Response { status: u16, body: String },
    #[error("Malformed record: {0}")]
    Serialization(String),
    #[error("Cache error: {0}")]
    Database(#[from] DatabaseError),
}

/// Per-user task collection in a hosted database
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Store a new record and return the key generated for it
    async fn append(&self, owner: &Principal, task: &NewTask) -> Result<String, StoreError>;
    async fn overwrite(&self, owner: &Principal, id: &str, task: &NewTask) -> Result<(), StoreError>;
    async fn delete(&self, owner: &Principal, id: &str) -> Result<(), StoreError>;
    /// Every record of the owner, ordered by key
    async fn read_all(&self, owner: &Principal) -> Result<Vec<Task>, StoreError>;
}

pub struct TaskStore {
    remote: Arc<dyn RemoteStore>,
    cache: Option<Database>,
    owner: Option<Principal>,
    tasks: Vec<Task>,
    revision: u64,
}

impl TaskStore {
    pub fn new(remote: Arc<dyn RemoteStore>, cache: Option<Database>) -> Self {
        Self {
            remote,
            cache,
            owner: None,
            tasks: Vec::new(),
            revision: 0,
        }
    }

    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn owner(&self) -> Option<&Principal> {
        self.owner.as_ref()
    }

    /// Bumped on every change to the list
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn replace_list(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
        self.changed();
    }

    fn changed(&mut self) {
        self.revision += 1;
        let (Some(cache), Some(owner)) = (&self.cache, &self.owner) else {
            return;
        };
        if let Err(e) = cache.replace_cached_tasks(&owner.uid, &self.tasks) {
            tracing::warn!("Failed to cache tasks for {}: {}", owner.uid, e);
        }
    }

    /// Follow the signed-in user. A new owner gets the cached list at once
    /// and the remote list as soon as it loads; signing out empties the list.
    pub async fn set_principal(&mut self, principal: Option<Principal>) {
        match principal {
            Some(principal) if self.owner.as_ref().map(|o| &o.uid) == Some(&principal.uid) => {
                // Same user, new token
                self.owner = Some(principal);
            }
            Some(principal) => {
                let cached = match &self.cache {
                    Some(cache) => cache.get_cached_tasks(&principal.uid).unwrap_or_else(|e| {
                        tracing::warn!("Failed to read cached tasks: {}", e);
                        Vec::new()
                    }),
                    None => Vec::new(),
                };
                self.owner = Some(principal);
                self.tasks = cached;
                self.revision += 1;
                self.reload().await;
            }
            None => {
                if self.owner.take().is_some() || !self.tasks.is_empty() {
                    self.tasks.clear();
                    self.revision += 1;
                }
            }
        }
    }

    /// Replace the list with the owner's remote collection. On failure the
    /// current list is kept.
    pub async fn reload(&mut self) -> bool {
        let Some(owner) = &self.owner else {
            return false;
        };
        match self.remote.read_all(owner).await {
            Ok(tasks) => {
                tracing::debug!("Loaded {} tasks for {}", tasks.len(), owner.uid);
                self.replace_list(tasks);
                true
            }
            Err(e) => {
                tracing::error!("Error fetching tasks: {}", e);
                false
            }
        }
    }

    /// Store a new task remotely, then append it locally.
    /// Returns `None` when nobody is signed in or the remote write fails.
    pub async fn add(&mut self, task: NewTask) -> Option<Task> {
        let Some(owner) = &self.owner else {
            tracing::error!("No user signed in when trying to add task: {:?}", task.description);
            return None;
        };
        match self.remote.append(owner, &task).await {
            Ok(id) => {
                let created = task.with_id(id);
                tracing::info!("Added task {}", created.id);
                self.tasks.push(created.clone());
                self.changed();
                Some(created)
            }
            Err(e) => {
                tracing::error!("Error adding task: {}", e);
                None
            }
        }
    }

    /// Apply `transform` to the task with `id` and overwrite the remote record.
    /// The id survives whatever the transform returns. A failed remote write is
    /// returned but the local change is kept. Returns `Ok(false)` for an
    /// unknown id.
    pub async fn update<F>(&mut self, id: &str, transform: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&Task) -> Task,
    {
        let Some(index) = self.tasks.iter().position(|task| task.id == id) else {
            return Ok(false);
        };

        let mut updated = transform(&self.tasks[index]);
        updated.id = id.to_string();
        let record = updated.record();
        self.tasks[index] = updated;
        self.changed();

        if let Some(owner) = &self.owner {
            if let Err(e) = self.remote.overwrite(owner, id, &record).await {
                tracing::error!("Error updating task {}: {}", id, e);
                return Err(e);
            }
        }
        Ok(true)
    }

    /// Delete remotely first; the task leaves the list only if that succeeds.
    /// Without a signed-in user the task is removed locally.
    pub async fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        if let Some(owner) = &self.owner {
            if let Err(e) = self.remote.delete(owner, id).await {
                tracing::error!("Error deleting task {}: {}", id, e);
                return Err(e);
            }
        }
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() != before {
            self.changed();
        }
        Ok(())
    }
}
