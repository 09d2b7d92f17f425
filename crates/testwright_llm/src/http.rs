//! Shared HTTP plumbing for the adapters.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use testwright_core::{WrightError, WrightResult};
use tracing::debug;

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 300;

pub(crate) fn build_client(timeout: Duration) -> WrightResult<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| WrightError::InvalidConfig(format!("failed to build HTTP client: {}", e)))
}

/// Send one request and decode a JSON success body into `T`.
///
/// Non-success statuses and transport failures are mapped onto the shared
/// error taxonomy. No retries happen here.
pub(crate) async fn send_json<T: DeserializeOwned>(provider: &str, request: RequestBuilder) -> WrightResult<T> {
    let response = request.send().await.map_err(|e| transport_error(provider, e))?;
    let status = response.status();
    debug!(provider, status = status.as_u16(), "Provider responded");

    if !status.is_success() {
        let retry_after = retry_after(&response);
        let body = response.text().await.unwrap_or_default();
        return Err(map_status(provider, status, &body, retry_after));
    }

    let body = response.text().await.map_err(|e| transport_error(provider, e))?;
    serde_json::from_str(&body)
        .map_err(|e| WrightError::malformed(provider, format!("failed to parse response: {}", e)))
}

/// Map a non-success status to an error.
pub(crate) fn map_status(
    provider: &str,
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> WrightError {
    let provider = provider.to_string();
    match status.as_u16() {
        401 | 403 => WrightError::AuthFailed {
            provider,
            status: status.as_u16(),
        },
        429 => WrightError::RateLimited {
            provider,
            retry_after,
        },
        code if status.is_server_error() => WrightError::ProviderServerError {
            provider,
            status: code,
            body: truncate(body, MAX_ERROR_BODY),
        },
        code => WrightError::ProviderRequestRejected {
            provider,
            status: code,
            body: truncate(body, MAX_ERROR_BODY),
        },
    }
}

// The URL is stripped: Gemini carries its key in the query string.
fn transport_error(provider: &str, err: reqwest::Error) -> WrightError {
    let err = err.without_url();
    if err.is_decode() {
        WrightError::malformed(provider, err.to_string())
    } else if err.is_timeout() {
        WrightError::unreachable(provider, format!("request timed out: {}", err))
    } else {
        WrightError::unreachable(provider, err.to_string())
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Require non-blank reply text.
pub(crate) fn non_empty(provider: &str, text: Option<String>) -> WrightResult<String> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(WrightError::malformed(provider, "response contained no text content")),
    }
}

pub(crate) fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(max_chars).collect();
        out.push_str("...");
        out
    }
}

/// One-shot HTTP responder on a loopback port.
#[cfg(test)]
pub(crate) mod stub {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve `response` (a full raw HTTP response) to the first connection
    /// and return the base URL to point a client at.
    pub(crate) async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        format!("http://{}/v1", addr)
    }

    /// Build a raw response with the given status line, extra headers and body.
    pub(crate) fn response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
        let mut raw = format!("HTTP/1.1 {}\r\n", status);
        for (name, value) in headers {
            raw.push_str(&format!("{}: {}\r\n", name, value));
        }
        raw.push_str(&format!(
            "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ));
        raw
    }

    // Drain headers and a Content-Length body so the client sees a clean exchange.
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }
}
