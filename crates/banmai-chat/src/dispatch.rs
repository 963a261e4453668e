//! Outbound delivery and per-message dispatch.
//!
//! Every inbound `(user_id, message)` pair gets its own tokio task, so a
//! slow completion call for one user never blocks ingestion for another;
//! same-user ordering comes from the store's per-user shard lock inside
//! [`Engine::respond`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use banmai_core::config::MessengerConfig;
use banmai_core::types::Reply;

use crate::engine::Engine;
use crate::error::SinkError;

/// Outbound message sink.
///
/// Delivery failures are logged by the dispatcher, not retried; retry
/// policy belongs to the sink's platform.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn deliver(&self, user_id: &str, reply: &Reply) -> Result<(), SinkError>;
}

// =============================================================================
// MessengerSink
// =============================================================================

/// Facebook Graph API sink: text message, then an image attachment when
/// the reply carries one.
pub struct MessengerSink {
    http: reqwest::Client,
    page_token: String,
    api_base: String,
}

impl MessengerSink {
    pub fn from_config(config: &MessengerConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            page_token: config.page_token.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn send_url(&self) -> String {
        format!(
            "{}/me/messages?access_token={}",
            self.api_base, self.page_token
        )
    }

    async fn post(&self, payload: serde_json::Value) -> Result<(), SinkError> {
        let response = self
            .http
            .post(self.send_url())
            .json(&payload)
            .send()
            .await
            .map_err(|e| SinkError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Delivery(format!("status {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSink for MessengerSink {
    async fn deliver(&self, user_id: &str, reply: &Reply) -> Result<(), SinkError> {
        if self.page_token.trim().is_empty() {
            return Err(SinkError::NotConfigured);
        }

        self.post(json!({
            "recipient": { "id": user_id },
            "message": { "text": reply.text },
        }))
        .await?;

        if let Some(image_url) = &reply.image_url {
            // A failed image attachment does not fail the delivery; the
            // text already went out.
            let attachment = json!({
                "recipient": { "id": user_id },
                "message": {
                    "attachment": {
                        "type": "image",
                        "payload": { "url": image_url, "is_reusable": true },
                    },
                },
            });
            if let Err(e) = self.post(attachment).await {
                warn!("Image attachment for {} not delivered: {}", user_id, e);
            }
        }

        Ok(())
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Handle one inbound message on its own task: compose a reply and hand it
/// to the sink. Returns the task handle; callers treat delivery as
/// fire-and-forget.
pub fn dispatch(
    engine: Arc<Engine>,
    sink: Arc<dyn MessageSink>,
    user_id: String,
    message: String,
) -> tokio::task::JoinHandle<()> {
    let message_id = Uuid::new_v4();
    tokio::spawn(async move {
        debug!("Handling message {} from {}", message_id, user_id);
        let reply = engine.respond(&user_id, &message).await;
        match sink.deliver(&user_id, &reply).await {
            Ok(()) => debug!("Delivered reply for message {}", message_id),
            Err(e) => warn!("Reply for message {} not delivered: {}", message_id, e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use banmai_core::config::BanmaiConfig;
    use banmai_core::types::ConversationTurn;

    use crate::client::CompletionService;
    use crate::error::CompletionError;

    struct RecordingSink {
        delivered: Mutex<Vec<(String, Reply)>>,
    }

    impl RecordingSink {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                delivered: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MessageSink for RecordingSink {
        async fn deliver(&self, user_id: &str, reply: &Reply) -> Result<(), SinkError> {
            self.delivered
                .lock()
                .unwrap()
                .push((user_id.to_string(), reply.clone()));
            Ok(())
        }
    }

    struct FailingCompletion;

    #[async_trait]
    impl CompletionService for FailingCompletion {
        async fn complete(
            &self,
            _system_instruction: &str,
            _history: &[ConversationTurn],
            _user_message: &str,
        ) -> Result<String, CompletionError> {
            Err(CompletionError::Http("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_dispatch_composes_and_delivers() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BanmaiConfig::default();
        config.knowledge.data_dir = dir.path().to_string_lossy().into_owned();

        let engine = Arc::new(Engine::new(&config, Arc::new(FailingCompletion)));
        let sink = RecordingSink::new();

        dispatch(
            engine,
            sink.clone(),
            "u1".to_string(),
            "xin chào".to_string(),
        )
        .await
        .unwrap();

        let delivered = sink.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].0, "u1");
        assert!(!delivered[0].1.text.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_different_users_run_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BanmaiConfig::default();
        config.knowledge.data_dir = dir.path().to_string_lossy().into_owned();

        let engine = Arc::new(Engine::new(&config, Arc::new(FailingCompletion)));
        let sink = RecordingSink::new();

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                dispatch(
                    Arc::clone(&engine),
                    sink.clone(),
                    format!("user{i}"),
                    "cod được không".to_string(),
                )
            })
            .collect();
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(sink.delivered.lock().unwrap().len(), 8);
        assert_eq!(engine.stats().conversations, 8);
    }

    #[tokio::test]
    async fn test_unconfigured_messenger_sink_rejects() {
        let sink = MessengerSink::from_config(&MessengerConfig::default());
        let err = sink
            .deliver("u1", &Reply::text_only("chào anh/chị"))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::NotConfigured));
    }
}
