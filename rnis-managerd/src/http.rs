use std::fmt;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Outcome of an outbound request. Transport failures are folded in as a
/// response without a status; nothing here returns `Err`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: Option<StatusCode>,
    pub location: Option<String>,
    pub body: String,
    pub error: Option<String>,
}

impl HttpResponse {
    pub(crate) fn failed(error: impl fmt::Display) -> Self {
        Self {
            status: None,
            location: None,
            body: String::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is(&self, status: StatusCode) -> bool {
        self.status == Some(status)
    }

    /// Numeric status, 0 when the request never got a response
    pub fn code(&self) -> u16 {
        self.status.map(|s| s.as_u16()).unwrap_or(0)
    }

    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Thin reqwest wrapper with error raising disabled
#[derive(Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub async fn get(&self, url: &str) -> HttpResponse {
        Self::collect(self.client.get(url).send().await).await
    }

    pub async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> HttpResponse {
        Self::collect(self.client.post(url).json(body).send().await).await
    }

    pub async fn delete(&self, url: &str) -> HttpResponse {
        Self::collect(self.client.delete(url).send().await).await
    }

    async fn collect(result: reqwest::Result<reqwest::Response>) -> HttpResponse {
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Request failed: {}", e);
                return HttpResponse::failed(e);
            }
        };

        let status = response.status();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match response.text().await {
            Ok(body) => HttpResponse {
                status: Some(status),
                location,
                body,
                error: None,
            },
            Err(e) => HttpResponse {
                status: Some(status),
                location,
                body: String::new(),
                error: Some(e.to_string()),
            },
        }
    }
}
