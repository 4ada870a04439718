//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    http::{header::CONTENT_TYPE, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

use claim_portal::config::PortalConfig;

/// A running programmable backend and the requests it has seen.
#[allow(dead_code)]
pub struct Backend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

#[allow(dead_code)]
impl Backend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// `(path, JSON body)` of every request received so far.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request path and parsed JSON body and returns the status
/// and raw body to answer with. Bodies that parse as JSON are sent with a
/// JSON content type, anything else as plain text.
#[allow(dead_code)]
pub async fn start_programmable_backend<F, Fut>(f: F) -> Backend
where
    F: Fn(String, Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let recorded = requests.clone();
    let app = Router::new().fallback(move |uri: Uri, body: String| {
        let f = f.clone();
        let recorded = recorded.clone();
        async move {
            let path = uri.path().to_string();
            let payload = serde_json::from_str(&body).unwrap_or(Value::Null);
            recorded.lock().unwrap().push((path.clone(), payload.clone()));

            let (status, body) = f(path, payload).await;
            let content_type = if serde_json::from_str::<Value>(&body).is_ok() {
                "application/json"
            } else {
                "text/plain"
            };
            let response: Response = (
                StatusCode::from_u16(status).unwrap(),
                [(CONTENT_TYPE, content_type)],
                body,
            )
                .into_response();
            response
        }
    });

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Backend { addr, requests }
}

/// Config pointing at `base_url`, bypassing any system proxy.
#[allow(dead_code)]
pub fn config_for(base_url: &str) -> PortalConfig {
    let mut config = PortalConfig::default();
    config.service.base_url = base_url.to_string();
    config.service.use_system_proxy = false;
    config.timeouts.connect_secs = 2;
    config.timeouts.request_secs = 5;
    config
}

/// An address nothing is listening on.
#[allow(dead_code)]
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
