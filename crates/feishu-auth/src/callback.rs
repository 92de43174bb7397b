//! Local HTTP callback server for the OAuth redirect.
//!
//! After the user approves access in the browser, Feishu redirects to the
//! configured redirect URI with `?code=xxx&state=yyy`. This server accepts
//! connections on that port until one carries a code (or an error), answers
//! with a small HTML page, and returns the parameters.
//!
//! A raw [`tokio::net::TcpListener`] is enough for one GET request.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{AuthError, Result};

/// Header lines read per request before giving up on the blank line.
const MAX_HEADER_LINES: usize = 100;

const PAGE_STYLE: &str = "font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; \
    text-align: center; padding: 4rem; color: #333;";

/// What a single request to the callback URL carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackRequest {
    /// The authorization code and state were delivered.
    Authorized { code: String, state: String },
    /// The user (or Feishu) refused; the value of the `error` parameter.
    Denied(String),
    /// Not an authorization redirect (favicon, health check, missing code).
    Invalid(String),
}

/// A minimal HTTP server that waits for the OAuth redirect.
pub struct CallbackServer;

impl CallbackServer {
    /// Bind `127.0.0.1:{port}` and wait for the redirect.
    ///
    /// Requests without a code get a 400 page and the server keeps waiting.
    ///
    /// # Errors
    ///
    /// - [`AuthError::CallbackTimeout`] if `timeout_secs` elapse first.
    /// - [`AuthError::FlowFailed`] if the redirect carries `error=...`.
    /// - [`AuthError::Io`] if the listener cannot bind.
    pub async fn start(port: u16, timeout_secs: u64) -> Result<(String, String)> {
        let addr = format!("127.0.0.1:{port}");
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!(addr = %addr, "callback server waiting for OAuth redirect");

        let timeout = tokio::time::Duration::from_secs(timeout_secs);
        match tokio::time::timeout(timeout, Self::serve(&listener)).await {
            Ok(inner) => inner,
            Err(_) => Err(AuthError::CallbackTimeout { timeout_secs }),
        }
    }

    /// Accept connections until one resolves the flow.
    ///
    /// Only a failing listener ends the loop; a connection that breaks
    /// mid-request is dropped and the server keeps waiting.
    async fn serve(listener: &TcpListener) -> Result<(String, String)> {
        loop {
            let (mut stream, peer) = listener.accept().await?;
            tracing::debug!(peer = %peer, "accepted callback connection");

            let request = match read_request(&mut stream).await {
                Ok(request) => request,
                Err(e) => {
                    tracing::debug!(peer = %peer, error = %e, "callback connection dropped");
                    continue;
                }
            };

            match Self::parse_callback_request(&request) {
                CallbackRequest::Authorized { code, state } => {
                    if let Err(e) = respond(&mut stream, "200 OK", &success_page()).await {
                        tracing::debug!(error = %e, "could not send the success page");
                    }
                    tracing::info!("callback received, authorization code extracted");
                    return Ok((code, state));
                }
                CallbackRequest::Denied(error) => {
                    if let Err(e) = respond(&mut stream, "400 Bad Request", &denied_page(&error)).await {
                        tracing::debug!(error = %e, "could not send the denial page");
                    }
                    return Err(AuthError::FlowFailed {
                        reason: format!("authorization server returned error: {error}"),
                    });
                }
                CallbackRequest::Invalid(reason) => {
                    tracing::debug!(reason = %reason, "ignoring non-callback request");
                    if let Err(e) = respond(&mut stream, "400 Bad Request", &missing_code_page()).await {
                        tracing::debug!(error = %e, "could not answer stray request");
                    }
                }
            }
        }
    }

    /// Classify the request line of an HTTP GET.
    ///
    /// Expected: `GET /callback?code=xxx&state=yyy HTTP/1.1`.
    pub fn parse_callback_request(request: &str) -> CallbackRequest {
        let Some(request_line) = request.lines().next() else {
            return CallbackRequest::Invalid("empty HTTP request".to_string());
        };

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 2 {
            return CallbackRequest::Invalid(format!(
                "malformed HTTP request line: {request_line}"
            ));
        }

        let Some((_, query)) = parts[1].split_once('?') else {
            return CallbackRequest::Invalid("request has no query string".to_string());
        };

        let mut code = None;
        let mut state = None;
        for param in query.split('&') {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let decoded = percent_decode(value);
            match key {
                "code" => code = Some(decoded),
                "state" => state = Some(decoded),
                "error" => return CallbackRequest::Denied(decoded),
                _ => {}
            }
        }

        match (code, state) {
            (Some(code), Some(state)) if !code.is_empty() => {
                CallbackRequest::Authorized { code, state }
            }
            (Some(_), None) => CallbackRequest::Invalid("missing 'state' parameter".to_string()),
            _ => CallbackRequest::Invalid("missing 'code' parameter".to_string()),
        }
    }
}

/// Read the request line and headers, up to the blank line.
async fn read_request(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut reader = BufReader::new(stream);
    let mut request = String::new();
    for _ in 0..MAX_HEADER_LINES {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let end_of_headers = line == "\r\n" || line == "\n";
        request.push_str(&line);
        if end_of_headers {
            break;
        }
    }
    Ok(request)
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

fn page(title: &str, color: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body style=\"{PAGE_STYLE}\"><h1 style=\"color: {color};\">{title}</h1>\
         <p>{message}</p></body></html>"
    )
}

fn success_page() -> String {
    page(
        "Authorization Successful",
        "#22c55e",
        "You can close this tab and return to the terminal.<script>window.close();</script>",
    )
}

fn denied_page(error: &str) -> String {
    let escaped = error
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    page(
        "Authorization Failed",
        "#ef4444",
        &format!("Error: {escaped}. Check the scopes requested by the app."),
    )
}

fn missing_code_page() -> String {
    page("Error", "#333", "No authorization code received.")
}

/// Decode `%XX` sequences and `+` in a query value. Invalid escapes are kept
/// literally; the result is interpreted as UTF-8.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn authorized(code: &str, state: &str) -> CallbackRequest {
        CallbackRequest::Authorized {
            code: code.to_string(),
            state: state.to_string(),
        }
    }

    #[test]
    fn parse_standard_redirect() {
        let request =
            "GET /callback?code=abc123&state=xyz789 HTTP/1.1\r\nHost: localhost:8080\r\n\r\n";
        assert_eq!(
            CallbackServer::parse_callback_request(request),
            authorized("abc123", "xyz789")
        );
    }

    #[test]
    fn parse_ignores_extra_params() {
        let request = "GET /cb?code=c1&lang=zh&state=s1 HTTP/1.1\r\n\r\n";
        assert_eq!(
            CallbackServer::parse_callback_request(request),
            authorized("c1", "s1")
        );
    }

    #[test]
    fn parse_percent_encoded_values() {
        let request = "GET /cb?code=abc%20def&state=123%2B456 HTTP/1.1\r\n\r\n";
        assert_eq!(
            CallbackServer::parse_callback_request(request),
            authorized("abc def", "123+456")
        );
    }

    #[test]
    fn parse_error_param_is_denied() {
        let request = "GET /cb?error=access_denied&state=xyz HTTP/1.1\r\n\r\n";
        assert_eq!(
            CallbackServer::parse_callback_request(request),
            CallbackRequest::Denied("access_denied".to_string())
        );
    }

    #[test]
    fn parse_missing_code_is_invalid() {
        let request = "GET /cb?state=xyz HTTP/1.1\r\n\r\n";
        let CallbackRequest::Invalid(reason) = CallbackServer::parse_callback_request(request)
        else {
            panic!("expected invalid request");
        };
        assert!(reason.contains("missing 'code'"));
    }

    #[test]
    fn parse_favicon_is_invalid() {
        let request = "GET /favicon.ico HTTP/1.1\r\n\r\n";
        assert!(matches!(
            CallbackServer::parse_callback_request(request),
            CallbackRequest::Invalid(_)
        ));
        assert!(matches!(
            CallbackServer::parse_callback_request(""),
            CallbackRequest::Invalid(_)
        ));
    }

    #[test]
    fn percent_decode_cases() {
        assert_eq!(percent_decode("hello%20world"), "hello world");
        assert_eq!(percent_decode("a+b"), "a b");
        assert_eq!(percent_decode("%E4%BD%A0"), "你");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode(""), "");
    }

    async fn send(port: u16, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn serve_skips_stray_requests_until_code_arrives() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = tokio::spawn(async move {
            let stray = send(port, "/favicon.ico").await;
            assert!(stray.starts_with("HTTP/1.1 400"));
            let ok = send(port, "/callback?code=test_code&state=test_state").await;
            assert!(ok.starts_with("HTTP/1.1 200 OK"));
            assert!(ok.contains("Authorization Successful"));
        });

        let result = CallbackServer::serve(&listener).await;
        client.await.unwrap();

        let (code, state) = result.unwrap();
        assert_eq!(code, "test_code");
        assert_eq!(state, "test_state");
    }

    #[tokio::test]
    async fn serve_survives_a_reset_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = tokio::spawn(async move {
            let preconnect = tokio::net::TcpStream::connect(("127.0.0.1", port))
                .await
                .unwrap();
            #[allow(deprecated)]
            preconnect
                .set_linger(Some(std::time::Duration::ZERO))
                .unwrap();
            drop(preconnect);

            let ok = send(port, "/callback?code=c&state=s").await;
            assert!(ok.starts_with("HTTP/1.1 200 OK"));
        });

        let result = CallbackServer::serve(&listener).await;
        client.await.unwrap();
        assert_eq!(result.unwrap(), ("c".to_string(), "s".to_string()));
    }

    #[tokio::test]
    async fn serve_waits_for_a_split_request_line() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
                .await
                .unwrap();
            stream.write_all(b"GET /callback?code=ab").await.unwrap();
            stream.flush().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            stream
                .write_all(b"cd&state=xy HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            assert!(response.starts_with("HTTP/1.1 200 OK"));
        });

        let result = CallbackServer::serve(&listener).await;
        client.await.unwrap();
        assert_eq!(result.unwrap(), ("abcd".to_string(), "xy".to_string()));
    }

    #[tokio::test]
    async fn serve_reports_denial() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let client = tokio::spawn(async move {
            let page = send(port, "/callback?error=access_denied").await;
            assert!(page.starts_with("HTTP/1.1 400"));
            assert!(page.contains("access_denied"));
        });

        let result = CallbackServer::serve(&listener).await;
        client.await.unwrap();

        match result {
            Err(AuthError::FlowFailed { reason }) => assert!(reason.contains("access_denied")),
            other => panic!("expected flow failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn start_times_out_without_redirect() {
        match CallbackServer::start(0, 1).await {
            Err(AuthError::CallbackTimeout { timeout_secs }) => assert_eq!(timeout_secs, 1),
            Err(AuthError::Io(_)) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
