use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// One logical push message. Data payload values are already coerced to
/// strings so the same payload works on every platform.
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: &str, value: impl ToString) -> Self {
        self.data.insert(key.to_string(), value.to_string());
        self
    }

    fn to_payload(&self) -> JsonValue {
        json!({
            "notification": {
                "title": self.title,
                "body": self.body,
            },
            "data": self.data,
            "android": {
                "priority": "high",
                "notification": {
                    "channel_id": "careerconnect_updates",
                    "sound": "default",
                },
            },
            "apns": {
                "payload": {
                    "aps": {
                        "sound": "default",
                        "badge": 1,
                    },
                },
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct TokenDelivery {
    pub token: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub success: bool,
    pub reason: Option<String>,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_tokens: usize,
}

impl DeliveryResult {
    pub fn no_tokens() -> Self {
        Self {
            success: false,
            reason: Some("no_tokens".to_string()),
            success_count: 0,
            failure_count: 0,
            total_tokens: 0,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushChannel: Send + Sync {
    fn supports_batch(&self) -> bool;

    async fn send_batch(
        &self,
        tokens: Vec<String>,
        message: PushMessage,
    ) -> Result<Vec<TokenDelivery>>;

    async fn send_single(&self, token: String, message: PushMessage) -> Result<()>;
}

#[derive(Debug, Default, Deserialize)]
struct SendResponse {
    #[serde(default)]
    results: Vec<SendResult>,
}

#[derive(Debug, Deserialize)]
struct SendResult {
    error: Option<String>,
}

/// Multicast push gateway client: a list of opaque device tokens in,
/// per-token results out.
pub struct HttpPushChannel {
    client: Client,
    endpoint: String,
    server_key: String,
    multicast: bool,
}

impl HttpPushChannel {
    pub fn new(endpoint: String, server_key: String, multicast: bool) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client for push channel");
        Self {
            client,
            endpoint,
            server_key,
            multicast,
        }
    }
}

#[async_trait]
impl PushChannel for HttpPushChannel {
    fn supports_batch(&self) -> bool {
        self.multicast
    }

    async fn send_batch(
        &self,
        tokens: Vec<String>,
        message: PushMessage,
    ) -> Result<Vec<TokenDelivery>> {
        let mut payload = message.to_payload();
        payload["registration_ids"] = serde_json::to_value(&tokens)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "Push channel rejected batch send ({}): {}",
                status, body
            )));
        }

        let parsed: SendResponse = response.json().await.unwrap_or_default();
        let outcomes = tokens
            .into_iter()
            .enumerate()
            .map(|(idx, token)| TokenDelivery {
                error: match parsed.results.get(idx) {
                    Some(result) => result.error.clone(),
                    None => Some("missing delivery result".to_string()),
                },
                token,
            })
            .collect();
        Ok(outcomes)
    }

    async fn send_single(&self, token: String, message: PushMessage) -> Result<()> {
        let mut payload = message.to_payload();
        payload["to"] = json!(token);

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "Push channel rejected send ({}): {}",
                status, body
            )));
        }

        let parsed: SendResponse = response.json().await.unwrap_or_default();
        if let Some(error) = parsed.results.first().and_then(|r| r.error.clone()) {
            return Err(Error::Internal(error));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PushService {
    pool: PgPool,
    channel: Arc<dyn PushChannel>,
}

impl PushService {
    pub fn new(pool: PgPool, channel: Arc<dyn PushChannel>) -> Self {
        Self { pool, channel }
    }

    /// The push capability only exists when the channel is configured;
    /// everything downstream checks the resulting `Option` once.
    pub fn from_config(pool: PgPool, config: &Config) -> Option<Self> {
        let endpoint = config.push_endpoint.clone()?;
        let server_key = config.push_server_key.clone()?;
        let channel = HttpPushChannel::new(endpoint, server_key, config.push_multicast);
        Some(Self::new(pool, Arc::new(channel)))
    }

    pub async fn deliver(
        &self,
        recipient_uid: &str,
        message: PushMessage,
    ) -> Result<DeliveryResult> {
        let tokens = self.active_tokens(recipient_uid).await?;
        if tokens.is_empty() {
            info!(recipient = recipient_uid, "no active device tokens, skipping push");
            return Ok(DeliveryResult::no_tokens());
        }

        let total_tokens = tokens.len();
        let outcomes = send_to_tokens(self.channel.clone(), tokens, message).await?;

        for outcome in outcomes.iter().filter(|o| o.error.is_some()) {
            warn!(
                recipient = recipient_uid,
                token = %outcome.token,
                error = outcome.error.as_deref().unwrap_or_default(),
                "deactivating device token after failed delivery"
            );
            if let Err(err) = self.deactivate_token(recipient_uid, &outcome.token).await {
                warn!(error = %err, "failed to deactivate dead device token");
            }
        }

        let result = summarize(&outcomes, total_tokens);
        info!(
            recipient = recipient_uid,
            success = result.success_count,
            failed = result.failure_count,
            total = result.total_tokens,
            "push delivery finished"
        );
        Ok(result)
    }

    async fn active_tokens(&self, user_uid: &str) -> Result<Vec<String>> {
        let tokens = sqlx::query_scalar::<_, String>(
            r#"
            SELECT token FROM device_tokens
            WHERE user_uid = $1 AND is_active = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_uid)
        .fetch_all(&self.pool)
        .await?;
        Ok(tokens)
    }

    // Monotonic flip: once a token is deactivated this path never turns it
    // back on, so concurrent deliveries may race here safely.
    async fn deactivate_token(&self, user_uid: &str, token: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE device_tokens
            SET is_active = FALSE, updated_at = NOW()
            WHERE user_uid = $1 AND token = $2
            "#,
        )
        .bind(user_uid)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// One multicast request when the channel supports it, otherwise all tokens
/// concurrently with the results joined before returning.
pub(crate) async fn send_to_tokens(
    channel: Arc<dyn PushChannel>,
    tokens: Vec<String>,
    message: PushMessage,
) -> Result<Vec<TokenDelivery>> {
    if channel.supports_batch() {
        return channel.send_batch(tokens, message).await;
    }

    let mut set = JoinSet::new();
    for token in tokens {
        let channel = channel.clone();
        let message = message.clone();
        set.spawn(async move {
            let error = channel
                .send_single(token.clone(), message)
                .await
                .err()
                .map(|e| e.to_string());
            TokenDelivery { token, error }
        });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(err) => warn!(error = ?err, "push send task failed to join"),
        }
    }
    Ok(outcomes)
}

fn summarize(outcomes: &[TokenDelivery], total_tokens: usize) -> DeliveryResult {
    let success_count = outcomes.iter().filter(|o| o.error.is_none()).count();
    DeliveryResult {
        success: success_count > 0,
        reason: None,
        success_count,
        failure_count: total_tokens - success_count,
        total_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> PushMessage {
        PushMessage::new("Application Shortlisted!", "Great news!")
            .with_data("type", "application_update")
            .with_data("badge", 3)
    }

    #[test]
    fn payload_coerces_data_and_sets_platform_hints() {
        let payload = message().to_payload();
        assert_eq!(payload["notification"]["title"], "Application Shortlisted!");
        assert_eq!(payload["data"]["badge"], "3");
        assert!(payload["data"]["badge"].is_string());
        assert_eq!(payload["android"]["priority"], "high");
        assert_eq!(
            payload["android"]["notification"]["channel_id"],
            "careerconnect_updates"
        );
        assert_eq!(payload["apns"]["payload"]["aps"]["badge"], 1);
    }

    #[test]
    fn no_tokens_is_a_non_error_outcome() {
        let result = DeliveryResult::no_tokens();
        assert!(!result.success);
        assert_eq!(result.reason.as_deref(), Some("no_tokens"));
        assert_eq!(result.total_tokens, 0);
    }

    #[test]
    fn summarize_partitions_mixed_outcomes() {
        let outcomes = vec![
            TokenDelivery {
                token: "a".into(),
                error: None,
            },
            TokenDelivery {
                token: "b".into(),
                error: Some("NotRegistered".into()),
            },
            TokenDelivery {
                token: "c".into(),
                error: None,
            },
        ];
        let result = summarize(&outcomes, 3);
        assert!(result.success);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.total_tokens, 3);
    }

    #[tokio::test]
    async fn batch_capable_channel_gets_one_multicast_call() {
        let mut channel = MockPushChannel::new();
        channel.expect_supports_batch().return_const(true);
        channel
            .expect_send_batch()
            .times(1)
            .returning(|tokens, _| {
                Ok(tokens
                    .into_iter()
                    .map(|token| TokenDelivery {
                        error: (token == "dead").then(|| "NotRegistered".to_string()),
                        token,
                    })
                    .collect())
            });

        let outcomes = send_to_tokens(
            Arc::new(channel),
            vec!["a".into(), "dead".into(), "c".into()],
            message(),
        )
        .await
        .unwrap();

        let failed: Vec<_> = outcomes
            .iter()
            .filter(|o| o.error.is_some())
            .map(|o| o.token.as_str())
            .collect();
        assert_eq!(failed, vec!["dead"]);
        assert_eq!(summarize(&outcomes, 3).success_count, 2);
    }

    #[test]
    fn fan_out_isolates_each_token_failure() {
        let mut channel = MockPushChannel::new();
        channel.expect_supports_batch().return_const(false);
        channel
            .expect_send_single()
            .times(3)
            .returning(|token, _| {
                if token == "dead" {
                    Err(Error::Internal("NotRegistered".into()))
                } else {
                    Ok(())
                }
            });

        let outcomes = tokio_test::block_on(send_to_tokens(
            Arc::new(channel),
            vec!["a".into(), "dead".into(), "c".into()],
            message(),
        ))
        .unwrap();

        assert_eq!(outcomes.len(), 3);
        let result = summarize(&outcomes, 3);
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 1);
        assert!(outcomes
            .iter()
            .any(|o| o.token == "dead" && o.error.is_some()));
    }

    #[tokio::test]
    async fn total_channel_failure_surfaces_as_an_error() {
        let mut channel = MockPushChannel::new();
        channel.expect_supports_batch().return_const(true);
        channel
            .expect_send_batch()
            .returning(|_, _| Err(Error::Internal("channel unauthenticated".into())));

        let result =
            send_to_tokens(Arc::new(channel), vec!["a".into()], message()).await;
        assert!(result.is_err());
    }
}
