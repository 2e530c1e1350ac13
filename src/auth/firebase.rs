use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{AuthError, IdentityProvider, Principal};
use crate::config::FirebaseConfig;

/// Identity Toolkit / Secure Token REST client
pub struct FirebaseIdentity {
    client: reqwest::Client,
    api_key: String,
    auth_endpoint: String,
    token_endpoint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    id_token: String,
    email: String,
    refresh_token: String,
    expires_in: String,
    local_id: String,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn expires_at(expires_in: &str) -> chrono::DateTime<Utc> {
    let secs = expires_in.trim().parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(secs)
}

impl FirebaseIdentity {
    pub fn new(config: &FirebaseConfig) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            auth_endpoint: config.auth_endpoint.trim_end_matches('/').to_string(),
            token_endpoint: config.token_endpoint.trim_end_matches('/').to_string(),
        })
    }

    async fn post<B, R>(&self, url: String, body: &B) -> Result<R, AuthError>
    where
        B: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => AuthError::from_provider_code(&envelope.error.message),
                Err(_) => AuthError::Provider(format!("HTTP {}: {}", status, text)),
            });
        }

        serde_json::from_str(&text).map_err(|e| AuthError::Provider(e.to_string()))
    }

    async fn password_flow(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<Principal, AuthError> {
        let url = format!("{}/accounts:{}", self.auth_endpoint, action);
        let body = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };
        let parsed: PasswordResponse = self.post(url, &body).await?;
        Ok(Principal {
            uid: parsed.local_id,
            email: parsed.email,
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
            expires_at: expires_at(&parsed.expires_in),
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        self.password_flow("signUp", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        self.password_flow("signInWithPassword", email, password).await
    }

    async fn refresh(&self, principal: &Principal) -> Result<Principal, AuthError> {
        let url = format!("{}/token", self.token_endpoint);
        let body = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: &principal.refresh_token,
        };
        let parsed: RefreshResponse = self.post(url, &body).await?;
        Ok(Principal {
            uid: parsed.user_id,
            email: principal.email.clone(),
            id_token: parsed.id_token,
            refresh_token: parsed.refresh_token,
            expires_at: expires_at(&parsed.expires_in),
        })
    }
}
