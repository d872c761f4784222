//! Dev-server liveness probing.
//!
//! # Responsibilities
//! - Issue a short-timeout GET against the dev server root
//! - Report live/down as an explicit `Result`, never by panicking or
//!   relying on the caller to intercept transport errors
//!
//! Any HTTP answer counts as live: the dev server may legitimately reply
//! 404 for its root while still serving assets.

use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::time;

/// Why a probe decided the dev server is down.
#[derive(Debug, Error)]
pub enum ProbeFailure {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("probe connection failed: {0}")]
    Connection(String),

    #[error("invalid probe request: {0}")]
    InvalidRequest(String),
}

/// Capability to check whether the dev server is reachable right now.
pub trait LivenessProbe: Send + Sync {
    fn check(&self) -> BoxFuture<'_, Result<(), ProbeFailure>>;

    /// URL being probed, for logs.
    fn target(&self) -> &str;
}

/// Probe over a plain HTTP/1 hyper client.
pub struct HttpProbe {
    url: String,
    timeout: Duration,
    client: Client<HttpConnector, Body>,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            url: url.into(),
            timeout,
            client,
        }
    }
}

impl LivenessProbe for HttpProbe {
    fn check(&self) -> BoxFuture<'_, Result<(), ProbeFailure>> {
        Box::pin(async move {
            let request = Request::builder()
                .method("GET")
                .uri(self.url.as_str())
                .header("user-agent", "checklist-gateway-probe")
                .body(Body::empty())
                .map_err(|e| ProbeFailure::InvalidRequest(e.to_string()))?;

            match time::timeout(self.timeout, self.client.request(request)).await {
                Ok(Ok(response)) => {
                    tracing::debug!(url = %self.url, status = %response.status(), "Dev server probe answered");
                    Ok(())
                }
                Ok(Err(e)) => Err(ProbeFailure::Connection(e.to_string())),
                Err(_) => Err(ProbeFailure::Timeout(self.timeout)),
            }
        })
    }

    fn target(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_probe_live_on_any_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        let probe = HttpProbe::new(format!("http://{addr}/"), Duration::from_secs(1));
        assert!(probe.check().await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_down_when_nothing_listens() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe = HttpProbe::new(format!("http://{addr}/"), Duration::from_secs(1));
        let err = probe.check().await.unwrap_err();
        assert!(matches!(err, ProbeFailure::Connection(_) | ProbeFailure::Timeout(_)));
    }

    #[tokio::test]
    async fn test_probe_times_out_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // accept and hold the socket open without answering
            if let Ok((socket, _)) = listener.accept().await {
                time::sleep(Duration::from_secs(5)).await;
                drop(socket);
            }
        });

        let probe = HttpProbe::new(format!("http://{addr}/"), Duration::from_millis(100));
        let err = probe.check().await.unwrap_err();
        assert!(matches!(err, ProbeFailure::Timeout(_)));
    }
}
