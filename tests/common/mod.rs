//! In-memory stand-ins for the hosted services.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use gogodo::auth::{AuthError, IdentityProvider, Principal};
use gogodo::llm::{LlmClient, LlmError, LlmRequest};
use gogodo::models::{NewTask, Task};
use gogodo::store::{RemoteStore, StoreError};

pub fn principal(uid: &str) -> Principal {
    Principal {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        id_token: format!("token-{}", uid),
        refresh_token: format!("refresh-{}", uid),
        expires_at: Utc::now() + Duration::hours(1),
    }
}

/// Per-user collections keyed like the hosted database, with a call log
#[derive(Default)]
pub struct FakeRemote {
    records: Mutex<BTreeMap<String, BTreeMap<String, NewTask>>>,
    calls: Mutex<Vec<String>>,
    next_key: AtomicUsize,
    pub fail_writes: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub fail_reads: AtomicBool,
}

impl FakeRemote {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn records(&self, uid: &str) -> BTreeMap<String, NewTask> {
        self.records.lock().unwrap().get(uid).cloned().unwrap_or_default()
    }

    pub fn seed(&self, uid: &str, id: &str, task: NewTask) {
        self.records
            .lock()
            .unwrap()
            .entry(uid.to_string())
            .or_default()
            .insert(id.to_string(), task);
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn refused() -> StoreError {
        StoreError::Response {
            status: 401,
            body: "Permission denied".to_string(),
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn append(&self, owner: &Principal, task: &NewTask) -> Result<String, StoreError> {
        self.log(format!("append {}", owner.uid));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::refused());
        }
        let key = format!("-N{:04}", self.next_key.fetch_add(1, Ordering::SeqCst));
        self.seed(&owner.uid, &key, task.clone());
        Ok(key)
    }

    async fn overwrite(&self, owner: &Principal, id: &str, task: &NewTask) -> Result<(), StoreError> {
        self.log(format!("overwrite {} {}", owner.uid, id));
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::refused());
        }
        self.seed(&owner.uid, id, task.clone());
        Ok(())
    }

    async fn delete(&self, owner: &Principal, id: &str) -> Result<(), StoreError> {
        self.log(format!("delete {} {}", owner.uid, id));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::refused());
        }
        if let Some(records) = self.records.lock().unwrap().get_mut(&owner.uid) {
            records.remove(id);
        }
        Ok(())
    }

    async fn read_all(&self, owner: &Principal) -> Result<Vec<Task>, StoreError> {
        self.log(format!("read_all {}", owner.uid));
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Http("connection refused".to_string()));
        }
        Ok(self
            .records(&owner.uid)
            .into_iter()
            .map(|(id, record)| record.with_id(id))
            .collect())
    }
}

/// Replies with queued strings in order and remembers every request
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn replying(replies: &[&str]) -> Self {
        let llm = Self::default();
        for reply in replies {
            llm.push_reply(reply);
        }
        llm
    }

    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
    }

    pub fn push_failure(&self, message: &str) {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: LlmRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LlmError::Response(message)),
            None => Err(LlmError::Response("no scripted reply left".to_string())),
        }
    }
}

/// Accepts any well-formed credentials and hands out fresh tokens
#[derive(Default)]
pub struct FakeIdentity {
    pub refreshes: AtomicUsize,
    pub refresh_fails: AtomicBool,
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, email: &str, _password: &str) -> Result<Principal, AuthError> {
        let uid = email.split('@').next().unwrap_or(email);
        Ok(principal(uid))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        if password == "wrong-password" {
            return Err(AuthError::InvalidCredentials);
        }
        self.sign_up(email, password).await
    }

    async fn refresh(&self, current: &Principal) -> Result<Principal, AuthError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.refresh_fails.load(Ordering::SeqCst) {
            return Err(AuthError::SessionExpired);
        }
        Ok(Principal {
            id_token: format!("{}-refreshed", current.id_token),
            expires_at: Utc::now() + Duration::hours(1),
            ..current.clone()
        })
    }
}
