// HTTP clients for the catalog (OverFast) and recommendation (Overcoach API)
// services.

pub mod catalog;
pub mod coach;

pub use catalog::{
    load_catalog, CatalogLoadError, CatalogSource, OverfastClient, DEFAULT_OVERFAST_URL,
};
pub use coach::{
    CoachClient, CounterResponse, HealthStatus, RecommendationService, DEFAULT_COACH_URL,
};

use thiserror::Error;

/// Errors from a single HTTP call to either service.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, TLS or body transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    /// The body was not the JSON shape we expected.
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Join a base URL and a path without doubling or dropping the slash.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turn a response into `T`, mapping non-2xx and bad JSON to `ClientError`.
pub(crate) async fn decode_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    url: &str,
) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Test HTTP server
// ---------------------------------------------------------------------------

/// Minimal one-shot HTTP/1.1 server for exercising the clients without
/// touching the network.
#[cfg(test)]
pub(crate) mod test_server {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// A captured request: the request line and the body.
    #[derive(Debug)]
    pub struct Captured {
        pub request_line: String,
        pub body: String,
    }

    /// Serve exactly one request with `status` and `body`, returning the base
    /// URL and a receiver for what the client sent.
    pub async fn serve_once(status: u16, body: &str) -> (String, oneshot::Receiver<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let body = body.to_string();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            // Read headers.
            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);

            while buf.len() < header_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let request_line = head.lines().next().unwrap_or_default().to_string();
            let req_body = String::from_utf8_lossy(&buf[header_end..]).to_string();
            let _ = tx.send(Captured {
                request_line,
                body: req_body,
            });

            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        (format!("http://{addr}"), rx)
    }
}
