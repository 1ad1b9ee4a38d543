//! Access-key verification collaborator for agent joins.
//!
//! The router only sees the trait; wiring picks a static key table from
//! config or the product API over HTTP. Verification errors are treated as
//! rejection (fail-closed).

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("verification request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait AccessKeyVerifier: Send + Sync {
    async fn verify(&self, access_key: &str, village_id: &str) -> Result<bool, VerifyError>;
}

/// Key table from the `[access_keys]` config section: village id -> key.
pub struct StaticAccessKeys {
    keys: HashMap<String, String>,
}

impl StaticAccessKeys {
    pub fn new(keys: HashMap<String, String>) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl AccessKeyVerifier for StaticAccessKeys {
    async fn verify(&self, access_key: &str, village_id: &str) -> Result<bool, VerifyError> {
        Ok(self
            .keys
            .get(village_id)
            .is_some_and(|key| key == access_key))
    }
}

/// Delegates verification to the product backend.
pub struct HttpAccessKeyVerifier {
    client: reqwest::Client,
    url: String,
}

impl HttpAccessKeyVerifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    valid: bool,
}

#[async_trait]
impl AccessKeyVerifier for HttpAccessKeyVerifier {
    async fn verify(&self, access_key: &str, village_id: &str) -> Result<bool, VerifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({
                "accessKey": access_key,
                "villageId": village_id,
            }))
            .send()
            .await?
            .error_for_status()?;
        let body: VerifyResponse = response.json().await?;
        Ok(body.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_keys_match_per_village() {
        let verifier = StaticAccessKeys::new(HashMap::from([
            ("v1".to_string(), "secret-key".to_string()),
            ("v2".to_string(), "other-key".to_string()),
        ]));

        assert!(verifier.verify("secret-key", "v1").await.unwrap());
        assert!(!verifier.verify("secret-key", "v2").await.unwrap());
        assert!(!verifier.verify("wrong", "v1").await.unwrap());
        assert!(!verifier.verify("secret-key", "v3").await.unwrap());
    }
}
