//! Notification delivery with retry.

use crate::error::NotifyError;
use crate::models::NotificationRequest;
use crate::notify::client::PushGateway;
use crate::retry::{RetryBudget, RetryPolicy, Sleeper};
use serde::Deserialize;
use tracing::info;

/// Status value the push API uses for an accepted message.
const ACCEPTED: i64 = 1;

/// Acknowledgement body returned by the push API.
#[derive(Debug, Deserialize)]
struct PushAck {
    status: i64,
    #[serde(default)]
    request: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

/// Delivers one notification per job run.
pub struct Notifier<'a, P, S> {
    gateway: &'a P,
    sleeper: &'a S,
    policy: RetryPolicy,
}

impl<'a, P: PushGateway, S: Sleeper> Notifier<'a, P, S> {
    pub fn new(gateway: &'a P, sleeper: &'a S) -> Self {
        Self {
            gateway,
            sleeper,
            policy: RetryPolicy::default(),
        }
    }

    /// Deliver `request`. `Ok(())` means the API acknowledged it.
    pub async fn notify(&self, request: &NotificationRequest) -> Result<(), NotifyError> {
        let mut budget = RetryBudget::new(self.policy);
        let gateway = self.gateway;
        let raw = budget
            .run("Pushover", self.sleeper, move || gateway.push(request))
            .await?;

        let ack: PushAck = serde_json::from_str(&raw)?;
        if ack.status != ACCEPTED {
            return Err(NotifyError::Rejected {
                status: ack.status,
                errors: ack.errors,
            });
        }

        info!(
            "Notification delivered (request {})",
            ack.request.as_deref().unwrap_or("unknown")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::retry::HttpReply;
    use crate::testing::{ack, RecordingSleeper, ScriptedGateway};

    fn request() -> NotificationRequest {
        NotificationRequest {
            title: "Total Cash Sales for Oct 17, 2026".to_string(),
            message: "19.75".to_string(),
            timestamp: 1_792_166_400,
            device: Some("phone".to_string()),
            priority: None,
            sound: None,
        }
    }

    #[tokio::test]
    async fn test_delivered_first_try() {
        let gateway = ScriptedGateway::accepting();
        let sleeper = RecordingSleeper::default();

        Notifier::new(&gateway, &sleeper)
            .notify(&request())
            .await
            .unwrap();

        assert_eq!(gateway.sent.borrow().len(), 1);
        assert_eq!(gateway.sent.borrow()[0], request());
        assert!(sleeper.secs().is_empty());
    }

    #[tokio::test]
    async fn test_four_rate_limits_then_success() {
        let gateway = ScriptedGateway::new(vec![
            Ok(HttpReply::new(429, "")),
            Ok(HttpReply::new(429, "")),
            Ok(HttpReply::new(429, "")),
            Ok(HttpReply::new(429, "")),
            Ok(ack(1)),
        ]);
        let sleeper = RecordingSleeper::default();

        let result = Notifier::new(&gateway, &sleeper).notify(&request()).await;

        assert!(result.is_ok());
        assert_eq!(sleeper.secs(), vec![1, 2, 4, 8]);
        assert_eq!(gateway.script.calls(), 5);
    }

    #[tokio::test]
    async fn test_rate_limit_exhausted() {
        let gateway = ScriptedGateway::new(vec![Ok(HttpReply::new(429, "")); 6]);
        let sleeper = RecordingSleeper::default();

        let result = Notifier::new(&gateway, &sleeper).notify(&request()).await;

        assert!(matches!(result, Err(NotifyError::RateLimited { retries: 5 })));
        assert_eq!(gateway.script.calls(), 6);
    }

    #[tokio::test]
    async fn test_transport_failure_then_success() {
        let gateway = ScriptedGateway::new(vec![
            Err(TransportError::Timeout("15s elapsed".into())),
            Ok(ack(1)),
        ]);
        let sleeper = RecordingSleeper::default();

        let result = Notifier::new(&gateway, &sleeper).notify(&request()).await;

        assert!(result.is_ok());
        assert_eq!(sleeper.secs(), vec![1]);
    }

    #[tokio::test]
    async fn test_non_accepted_status_is_rejected() {
        let body = r#"{"user":"invalid","errors":["user identifier is invalid"],"status":0,"request":"r"}"#;
        let gateway = ScriptedGateway::new(vec![Ok(HttpReply::new(200, body))]);
        let sleeper = RecordingSleeper::default();

        let result = Notifier::new(&gateway, &sleeper).notify(&request()).await;

        match result {
            Err(NotifyError::Rejected { status, errors }) => {
                assert_eq!(status, 0);
                assert_eq!(errors, vec!["user identifier is invalid".to_string()]);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert_eq!(gateway.script.calls(), 1);
    }

    #[tokio::test]
    async fn test_other_status_is_not_retried() {
        let gateway = ScriptedGateway::new(vec![Ok(HttpReply::new(500, "boom"))]);
        let sleeper = RecordingSleeper::default();

        let result = Notifier::new(&gateway, &sleeper).notify(&request()).await;

        assert!(matches!(
            result,
            Err(NotifyError::RequestFailed { status: 500, .. })
        ));
        assert!(sleeper.secs().is_empty());
    }

    #[tokio::test]
    async fn test_undecodable_ack() {
        let gateway = ScriptedGateway::new(vec![Ok(HttpReply::new(200, "ok"))]);
        let sleeper = RecordingSleeper::default();

        let result = Notifier::new(&gateway, &sleeper).notify(&request()).await;

        assert!(matches!(result, Err(NotifyError::Decode(_))));
    }
}
