//! Fire-and-forget notification on consumer join. The router spawns the call
//! and never waits on it; delivery failures are logged, not surfaced.

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerJoinNotice {
    pub name: String,
    pub email: String,
    pub message: String,
    pub village_id: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn consumer_joined(&self, notice: ConsumerJoinNotice);
}

/// Default sink: structured log line only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn consumer_joined(&self, notice: ConsumerJoinNotice) {
        tracing::info!(
            name = %notice.name,
            email = %notice.email,
            village_id = %notice.village_id,
            "New consumer joined"
        );
    }
}

/// Posts the notice to a configured webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn consumer_joined(&self, notice: ConsumerJoinNotice) {
        let result = self.client.post(&self.url).json(&notice).send().await;
        match result.and_then(|r| r.error_for_status()) {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    village_id = %notice.village_id,
                    "Consumer join notification failed"
                );
            }
        }
    }
}
