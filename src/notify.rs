use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use tracing::{debug, info};

use crate::utils::error::{AppError, Result};

/// Publishes a message to a named topic. Returns whether the message
/// was accepted; transport problems are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, topic: &str, message: &str) -> Result<bool>;
}

/// Notifier over an HTTP topic service. Topics are addressed by name:
/// a publish first checks the topic exists and creates it on first
/// use, then posts the message, so operators never pre-provision
/// anything.
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl WebhookNotifier {
    pub fn new(endpoint: &str, token: Option<String>) -> Result<Self> {
        if endpoint.trim().is_empty() {
            return Err(AppError::Config("notifyEndpoint is not configured".to_string()));
        }
        Ok(Self {
            client: Client::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn topic_url(&self, topic: &str) -> String {
        format!("{}/topics/{}", self.endpoint, topic)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn ensure_topic(&self, topic: &str) -> Result<()> {
        let wrap = |e: reqwest::Error| AppError::Notify(e.to_string());

        let lookup = self
            .authorize(self.client.get(self.topic_url(topic)))
            .send()
            .await
            .map_err(wrap)?;
        if lookup.status() != StatusCode::NOT_FOUND {
            debug!("topic {topic} already exists");
            return Ok(());
        }

        info!("creating topic {topic}");
        let created = self
            .authorize(self.client.put(self.topic_url(topic)))
            .json(&json!({ "name": topic }))
            .send()
            .await
            .map_err(wrap)?;
        if !created.status().is_success() {
            return Err(AppError::Notify(format!(
                "could not create topic {topic}: {}",
                created.status()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, topic: &str, message: &str) -> Result<bool> {
        self.ensure_topic(topic).await?;

        let response = self
            .authorize(self.client.post(format!("{}/publish", self.topic_url(topic))))
            .json(&json!({ "message": message }))
            .send()
            .await
            .map_err(|e| AppError::Notify(e.to_string()))?;

        let sent = response.status().is_success();
        info!("published to topic {topic}, status {}", response.status());
        Ok(sent)
    }
}
