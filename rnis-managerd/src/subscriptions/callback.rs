use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use crate::http::{HttpClient, HttpResponse};

/// Name of the sink registered from `callbackReference` at creation
pub const DEFAULT_CALLBACK: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackType {
    Rest,
}

/// Consumer endpoint notifications are pushed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackSink {
    pub name: String,
    pub callback: String,
    pub callback_type: CallbackType,
}

/// Fire-and-forget delivery of notifications to callback sinks
#[derive(Clone, Default)]
pub struct CallbackDispatcher {
    http: HttpClient,
}

impl CallbackDispatcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Deliver in the background. The handle is only useful to tests.
    pub fn dispatch(
        &self,
        subscription_id: &str,
        sink: CallbackSink,
        notification: Value,
    ) -> JoinHandle<HttpResponse> {
        let dispatcher = self.clone();
        let subscription_id = subscription_id.to_string();

        tokio::spawn(async move { dispatcher.deliver(&subscription_id, &sink, &notification).await })
    }

    pub async fn deliver(
        &self,
        subscription_id: &str,
        sink: &CallbackSink,
        notification: &Value,
    ) -> HttpResponse {
        let resp = match sink.callback_type {
            CallbackType::Rest => self.http.post(&sink.callback, notification).await,
        };

        if resp.status.is_some_and(|s| s.is_success()) {
            tracing::debug!(
                "Notification for {} delivered to {}, response {}",
                subscription_id,
                sink.callback,
                resp.code()
            );
        } else {
            tracing::warn!(
                "Notification for {} to {} failed, response {} {}",
                subscription_id,
                sink.callback,
                resp.code(),
                resp.error.as_deref().unwrap_or_default()
            );
        }

        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sink(url: String) -> CallbackSink {
        CallbackSink {
            name: DEFAULT_CALLBACK.to_string(),
            callback: url,
            callback_type: CallbackType::Rest,
        }
    }

    #[tokio::test]
    async fn test_dispatch_posts_notification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cb"))
            .and(body_json(json!({"rsrp": 42})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let resp = CallbackDispatcher::default()
            .dispatch("sub-1", sink(format!("{}/cb", server.uri())), json!({"rsrp": 42}))
            .await
            .unwrap();

        assert_eq!(resp.code(), 204);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_absorbed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let resp = CallbackDispatcher::default()
            .deliver("sub-1", &sink(format!("{}/cb", server.uri())), &json!({}))
            .await;

        assert_eq!(resp.code(), 503);
    }

    #[test]
    fn test_sink_wire_format() {
        let value = serde_json::to_value(sink("http://client/cb".to_string())).unwrap();

        assert_eq!(value["callback_type"], "rest");
        assert_eq!(value["name"], "default");
    }
}
