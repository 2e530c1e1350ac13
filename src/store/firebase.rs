use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{RemoteStore, StoreError};
use crate::auth::Principal;
use crate::config::FirebaseConfig;
use crate::models::{NewTask, Task};

/// Realtime Database REST client. Records live under `tasks/{uid}/{id}`.
pub struct FirebaseStore {
    client: reqwest::Client,
    database_url: String,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

impl FirebaseStore {
    pub fn new(config: &FirebaseConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Http(e.to_string()))?;
        Ok(Self {
            client,
            database_url: config.database_url.trim_end_matches('/').to_string(),
        })
    }

    fn collection_url(&self, owner: &Principal) -> String {
        format!("{}/tasks/{}.json", self.database_url, owner.uid)
    }

    fn record_url(&self, owner: &Principal, id: &str) -> String {
        format!("{}/tasks/{}/{}.json", self.database_url, owner.uid, id)
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        owner: &Principal,
    ) -> Result<String, StoreError> {
        let response = request
            .query(&[("auth", owner.id_token.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(StoreError::Response {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Turn a collection snapshot (`null` or a map of key to record) into tasks
/// ordered by key. Records that don't parse are skipped.
pub(crate) fn tasks_from_snapshot(body: &str) -> Result<Vec<Task>, StoreError> {
    let snapshot: Option<BTreeMap<String, serde_json::Value>> =
        serde_json::from_str(body).map_err(|e| StoreError::Serialization(e.to_string()))?;

    let tasks = snapshot
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(id, value)| match serde_json::from_value::<NewTask>(value) {
            Ok(record) => Some(record.with_id(id)),
            Err(e) => {
                tracing::warn!("Skipping malformed task record {}: {}", id, e);
                None
            }
        })
        .collect();
    Ok(tasks)
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    async fn append(&self, owner: &Principal, task: &NewTask) -> Result<String, StoreError> {
        let request = self.client.post(self.collection_url(owner)).json(task);
        let body = self.send(request, owner).await?;
        let pushed: PushResponse =
            serde_json::from_str(&body).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(pushed.name)
    }

    async fn overwrite(&self, owner: &Principal, id: &str, task: &NewTask) -> Result<(), StoreError> {
        let request = self.client.put(self.record_url(owner, id)).json(task);
        self.send(request, owner).await?;
        Ok(())
    }

    async fn delete(&self, owner: &Principal, id: &str) -> Result<(), StoreError> {
        let request = self.client.delete(self.record_url(owner, id));
        self.send(request, owner).await?;
        Ok(())
    }

    async fn read_all(&self, owner: &Principal) -> Result<Vec<Task>, StoreError> {
        let request = self.client.get(self.collection_url(owner));
        let body = self.send(request, owner).await?;
        tasks_from_snapshot(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_collection_reads_as_null() {
        assert!(tasks_from_snapshot("null").unwrap().is_empty());
    }

    #[test]
    fn snapshot_is_ordered_by_key_and_skips_bad_records() {
        let body = r#"{
            "-Nb": {"description": "second", "dueDate": "2024-06-02", "dueTime": "17:00"},
            "-Na": {"description": "first", "completed": true},
            "-Nc": {"dueDate": 12}
        }"#;
        let tasks = tasks_from_snapshot(body).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "-Na");
        assert!(tasks[0].completed);
        assert_eq!(tasks[1].due_time.as_deref(), Some("17:00"));
        assert!(!tasks[1].completed);
    }
}
