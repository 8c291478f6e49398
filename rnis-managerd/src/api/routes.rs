use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use shared::protocol::subscription_href;
use shared::types::{MecService, RegistrationState, SubscriptionLinkList};
use crate::error::ManagerError;
use crate::subscriptions::lifecycle::SubscriptionController;
use super::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub subscriptions: SubscriptionController,
    pub registration: watch::Receiver<RegistrationState>,
    pub mec_service: Arc<MecService>,
}

#[derive(Serialize)]
pub struct MecServiceStatus {
    pub mec_service: MecService,
    pub state: RegistrationState,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rni/v2/mec_service", get(get_mec_service))
        .route(
            "/rni/v2/subscriptions",
            get(list_subscriptions)
                .post(create_subscription)
                .delete(delete_subscriptions),
        )
        .route(
            "/rni/v2/subscriptions/:id",
            get(get_subscription)
                .post(create_subscription_with_id)
                .delete(delete_subscription),
        )
        .route("/rni/v2/subscriptions/:id/ch", post(subscription_callback))
        .with_state(state)
}

fn valid_subscription_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

async fn get_mec_service(State(state): State<AppState>) -> Json<MecServiceStatus> {
    Json(MecServiceStatus {
        mec_service: (*state.mec_service).clone(),
        state: *state.registration.borrow(),
    })
}

async fn list_subscriptions(
    State(state): State<AppState>,
) -> Result<Json<SubscriptionLinkList>, ApiError> {
    Ok(Json(state.subscriptions.store().links_view().await?))
}

async fn create_subscription(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let id = uuid::Uuid::new_v4().to_string();
    create(&state, &id, body).await
}

async fn create_subscription_with_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    if !valid_subscription_id(&id) {
        return Err(ManagerError::InvalidSubscription(format!("invalid subscription id: {}", id)).into());
    }
    create(&state, &id, body).await
}

async fn create(
    state: &AppState,
    id: &str,
    body: Value,
) -> Result<impl IntoResponse, ApiError> {
    if !body.is_object() {
        return Err(ManagerError::InvalidSubscription("body must be a JSON object".to_string()).into());
    }

    let sub = state.subscriptions.create(id, body).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, subscription_href(sub.subscription_id()))],
        Json(sub.representation().clone()),
    ))
}

async fn get_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let sub = state.subscriptions.store().get(&id).await?;
    Ok(Json(sub.representation().clone()))
}

async fn delete_subscriptions(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.subscriptions.remove(None).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.subscriptions.remove(Some(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Events pushed by the controller for one subscription
async fn subscription_callback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(event): Json<Value>,
) -> Result<StatusCode, ApiError> {
    let sub = state.subscriptions.store().get(&id).await?;
    sub.handle_callback(event);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use crate::env_manager::EnvHandle;
    use crate::http::HttpClient;
    use crate::registration::RegistrationLoop;
    use crate::workers::{self, test_context};

    fn app() -> Router {
        let env = EnvHandle::spawn(
            workers::factories(test_context("127.0.0.1", 1)),
            CancellationToken::new(),
        );
        let registration = RegistrationLoop::new(
            "rnis-1",
            "http://127.0.0.1:1/api/v1/services",
            Duration::from_secs(2),
            HttpClient::new(),
        );

        router(AppState {
            subscriptions: SubscriptionController::new(env),
            registration: registration.subscribe(),
            mec_service: Arc::new(registration.mec_service()),
        })
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn subscription(callback: &str) -> Value {
        json!({
            "subscriptionType": "MeasRepUeSubscription",
            "callbackReference": callback
        })
    }

    #[tokio::test]
    async fn test_subscription_crud() {
        let app = app();

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/rni/v2/subscriptions/sub-1", subscription("http://client/cb")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(resp.headers()[header::LOCATION], "/rni/v2/subscriptions/sub-1");

        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/rni/v2/subscriptions"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let links = read_json(resp).await;
        assert_eq!(links["_links"]["self"], "/rni/v2/subscriptions");
        assert_eq!(links["_links"]["subscription"][0]["href"], "/rni/v2/subscriptions/sub-1");
        assert_eq!(links["_links"]["subscription"][0]["subscriptionType"], "MeasRepUeSubscription");

        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/rni/v2/subscriptions/sub-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_json(resp).await, subscription("http://client/cb"));

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/rni/v2/subscriptions/sub-1", subscription("http://client/cb")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = app
            .clone()
            .oneshot(empty_request("DELETE", "/rni/v2/subscriptions/sub-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .clone()
            .oneshot(empty_request("GET", "/rni/v2/subscriptions/sub-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .oneshot(empty_request("DELETE", "/rni/v2/subscriptions/sub-1"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_generates_id() {
        let app = app();

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/rni/v2/subscriptions", subscription("http://client/cb")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let location = resp.headers()[header::LOCATION].to_str().unwrap().to_string();
        let id = location.strip_prefix("/rni/v2/subscriptions/").unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());

        let resp = app.oneshot(empty_request("GET", &location)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_errors() {
        let app = app();

        let resp = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/rni/v2/subscriptions",
                json!({"subscriptionType": "CellChangeSubscription", "callbackReference": "http://c"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(read_json(resp).await["code"], "unknown_subscription_type");

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/rni/v2/subscriptions", json!(["not", "an", "object"])))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = app
            .oneshot(json_request("POST", "/rni/v2/subscriptions/bad_id", subscription("http://c")))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let app = app();
        for id in ["a", "b"] {
            let uri = format!("/rni/v2/subscriptions/{}", id);
            let resp = app
                .clone()
                .oneshot(json_request("POST", &uri, subscription("http://client/cb")))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let resp = app
            .clone()
            .oneshot(empty_request("DELETE", "/rni/v2/subscriptions"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app.oneshot(empty_request("GET", "/rni/v2/subscriptions")).await.unwrap();
        let links = read_json(resp).await;
        assert_eq!(links["_links"]["subscription"], json!([]));
    }

    #[tokio::test]
    async fn test_callback_ingress_forwards_notification() {
        let consumer = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cb"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&consumer)
            .await;

        let app = app();
        let callback = format!("{}/cb", consumer.uri());
        let resp = app
            .clone()
            .oneshot(json_request("POST", "/rni/v2/subscriptions/sub-1", subscription(&callback)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/rni/v2/subscriptions/sub-1/ch", json!({"rsrp": -80})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let mut delivered = Vec::new();
        for _ in 0..100 {
            delivered = consumer.received_requests().await.unwrap_or_default();
            if !delivered.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(delivered.len(), 1);
        let body: Value = serde_json::from_slice(&delivered[0].body).unwrap();
        assert_eq!(body["notificationType"], "MeasRepUeNotification");
        assert_eq!(body["rsrp"], -80);

        let resp = app
            .oneshot(json_request("POST", "/rni/v2/subscriptions/nope/ch", json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mec_service_status() {
        let resp = app()
            .oneshot(empty_request("GET", "/rni/v2/mec_service"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = read_json(resp).await;
        assert_eq!(body["mec_service"]["serInstanceId"], "rnis-1");
        assert_eq!(body["state"], "UNREGISTERED");
    }
}
