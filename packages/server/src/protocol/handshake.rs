//! Opening handshake (RFC 6455 §4.2).
//!
//! Parses the client's HTTP/1.1 upgrade request and builds the
//! `101 Switching Protocols` response, or the HTTP error response that
//! rejects the connection.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// GUID appended to the client key before hashing.
pub const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this server speaks.
pub const WEBSOCKET_VERSION: &str = "13";

/// Default upper bound on the size of the request head.
pub const DEFAULT_MAX_HEAD: usize = 8 * 1024;

/// Reasons an upgrade request is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandshakeError {
    #[error("malformed HTTP request: {0}")]
    MalformedRequest(&'static str),

    #[error("method {0} not allowed for upgrade")]
    MethodNotAllowed(String),

    #[error("request is not a WebSocket upgrade")]
    NotUpgrade,

    #[error("unsupported Sec-WebSocket-Version: {0:?}")]
    UnsupportedVersion(Option<String>),

    #[error("missing Sec-WebSocket-Key header")]
    MissingKey,

    #[error("Sec-WebSocket-Key is not a base64 encoded 16-byte nonce")]
    InvalidKey,

    #[error("no WebSocket endpoint at {0}")]
    UnknownPath(String),

    #[error("request head exceeds {0} bytes")]
    HeadTooLarge(usize),
}

impl HandshakeError {
    /// HTTP status code and reason phrase for the rejection.
    pub fn status(&self) -> (u16, &'static str) {
        match self {
            Self::MalformedRequest(_) | Self::MissingKey | Self::InvalidKey => {
                (400, "Bad Request")
            }
            Self::UnknownPath(_) => (404, "Not Found"),
            Self::MethodNotAllowed(_) => (405, "Method Not Allowed"),
            Self::NotUpgrade | Self::UnsupportedVersion(_) => (426, "Upgrade Required"),
            Self::HeadTooLarge(_) => (431, "Request Header Fields Too Large"),
        }
    }

    /// Full HTTP response that rejects the connection.
    pub fn to_response(&self) -> String {
        let (code, reason) = self.status();
        let body = self.to_string();
        let mut extra = String::new();
        match self {
            Self::NotUpgrade | Self::UnsupportedVersion(_) => {
                extra.push_str("Upgrade: websocket\r\n");
                extra.push_str(&format!("Sec-WebSocket-Version: {WEBSOCKET_VERSION}\r\n"));
            }
            Self::MethodNotAllowed(_) => extra.push_str("Allow: GET\r\n"),
            _ => {}
        }
        format!(
            "HTTP/1.1 {code} {reason}\r\n{extra}Content-Type: text/plain; charset=utf-8\r\nContent-Length: {len}\r\nConnection: close\r\n\r\n{body}",
            len = body.len(),
        )
    }
}

/// A validated upgrade request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeRequest {
    pub path: String,
    pub key: String,
}

impl UpgradeRequest {
    pub fn accept_key(&self) -> String {
        derive_accept_key(&self.key)
    }

    /// The `101 Switching Protocols` response promoting the connection.
    pub fn response(&self) -> String {
        format!(
            "HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Accept: {}\r\n\r\n",
            self.accept_key()
        )
    }
}

/// `base64(SHA1(key + GUID))`.
pub fn derive_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WEBSOCKET_GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Offset just past the blank line ending the request head, if present.
pub fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|pos| pos + 4)
}

fn has_token(value: &str, token: &str) -> bool {
    value
        .split(',')
        .any(|part| part.trim().eq_ignore_ascii_case(token))
}

/// Validate an upgrade request head (request line and headers, without the
/// terminating blank line) against the endpoint at `expected_path`.
pub fn parse_upgrade_request(
    head: &str,
    expected_path: &str,
) -> Result<UpgradeRequest, HandshakeError> {
    let mut lines = head.split("\r\n");
    let request_line = lines
        .next()
        .filter(|line| !line.is_empty())
        .ok_or(HandshakeError::MalformedRequest("empty request line"))?;

    let mut parts = request_line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(HandshakeError::MalformedRequest("invalid request line"));
    };
    if version != "HTTP/1.1" {
        return Err(HandshakeError::MalformedRequest("HTTP/1.1 required"));
    }

    let mut upgrade = None;
    let mut connection = None;
    let mut ws_version = None;
    let mut key = None;
    for line in lines.filter(|line| !line.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or(HandshakeError::MalformedRequest("header without colon"))?;
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "upgrade" => upgrade = Some(value),
            "connection" => connection = Some(value),
            "sec-websocket-version" => ws_version = Some(value),
            "sec-websocket-key" => key = Some(value),
            _ => {}
        }
    }

    let is_upgrade = upgrade.is_some_and(|v| has_token(v, "websocket"))
        && connection.is_some_and(|v| has_token(v, "upgrade"));
    if !is_upgrade {
        return Err(HandshakeError::NotUpgrade);
    }
    if method != "GET" {
        return Err(HandshakeError::MethodNotAllowed(method.to_string()));
    }

    let path = target.split('?').next().unwrap_or(target);
    if path != expected_path {
        return Err(HandshakeError::UnknownPath(path.to_string()));
    }
    if ws_version != Some(WEBSOCKET_VERSION) {
        return Err(HandshakeError::UnsupportedVersion(
            ws_version.map(str::to_string),
        ));
    }

    let key = key.ok_or(HandshakeError::MissingKey)?;
    match STANDARD.decode(key) {
        Ok(nonce) if nonce.len() == 16 => Ok(UpgradeRequest {
            path: path.to_string(),
            key: key.to_string(),
        }),
        _ => Err(HandshakeError::InvalidKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_KEY: &str = "dGhlIHNhbXBsZSBub25jZQ==";

    fn request(extra_headers: &[&str]) -> String {
        let mut head = String::from("GET /ws HTTP/1.1\r\nHost: localhost:3000");
        for header in extra_headers {
            head.push_str("\r\n");
            head.push_str(header);
        }
        head
    }

    fn valid_headers() -> Vec<&'static str> {
        vec![
            "Upgrade: websocket",
            "Connection: keep-alive, Upgrade",
            "Sec-WebSocket-Version: 13",
            "Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==",
        ]
    }

    #[test]
    fn test_derive_accept_key_for_rfc_sample() {
        // テスト項目: RFC 6455 のサンプルキーから既知の accept キーが得られる
        // given (前提条件):
        let key = SAMPLE_KEY;

        // when (操作):
        let accept = derive_accept_key(key);

        // then (期待する結果):
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_parse_valid_upgrade_request() {
        // テスト項目: 正しいアップグレード要求が受理され、101 レスポンスが生成される
        // given (前提条件):
        let head = request(&valid_headers());

        // when (操作):
        let result = parse_upgrade_request(&head, "/ws");

        // then (期待する結果):
        let upgrade = result.expect("request should be accepted");
        assert_eq!(upgrade.key, SAMPLE_KEY);
        let response = upgrade.response();
        assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(response.contains("Upgrade: websocket\r\n"));
        assert!(response.contains("Connection: Upgrade\r\n"));
        assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        assert!(response.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_header_names_are_case_insensitive_and_query_is_ignored() {
        // テスト項目: ヘッダ名の大小文字やクエリ文字列に影響されない
        // given (前提条件):
        let head = "GET /ws?room=main HTTP/1.1\r\nupgrade: WebSocket\r\nCONNECTION: upgrade\r\nsec-websocket-version: 13\r\nSEC-WEBSOCKET-KEY: dGhlIHNhbXBsZSBub25jZQ==";

        // when (操作):
        let result = parse_upgrade_request(head, "/ws");

        // then (期待する結果):
        assert_eq!(result.map(|r| r.path), Ok("/ws".to_string()));
    }

    #[test]
    fn test_missing_key_is_rejected_with_400() {
        // テスト項目: Sec-WebSocket-Key がない場合は 400 で拒否される
        // given (前提条件):
        let head = request(&valid_headers()[..3]);

        // when (操作):
        let err = parse_upgrade_request(&head, "/ws").unwrap_err();

        // then (期待する結果):
        assert_eq!(err, HandshakeError::MissingKey);
        assert_eq!(err.status().0, 400);
        assert!(err.to_response().starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[test]
    fn test_malformed_keys_are_rejected() {
        // テスト項目: base64 でない、または 16 バイトでないキーは拒否される
        // given (前提条件):
        for key in ["not base64!!", "c2hvcnQ=", ""] {
            let key_header = format!("Sec-WebSocket-Key: {key}");
            let mut headers: Vec<&str> = valid_headers()[..3].to_vec();
            headers.push(&key_header);
            let head = request(&headers);

            // when (操作):
            let result = parse_upgrade_request(&head, "/ws");

            // then (期待する結果):
            assert_eq!(result, Err(HandshakeError::InvalidKey), "key = {key:?}");
        }
    }

    #[test]
    fn test_plain_http_request_is_not_an_upgrade() {
        // テスト項目: Upgrade ヘッダのない通常のリクエストは 426 になる
        // given (前提条件):
        let head = request(&["Accept: text/html"]);

        // when (操作):
        let err = parse_upgrade_request(&head, "/ws").unwrap_err();

        // then (期待する結果):
        assert_eq!(err, HandshakeError::NotUpgrade);
        let response = err.to_response();
        assert!(response.starts_with("HTTP/1.1 426 Upgrade Required\r\n"));
        assert!(response.contains("Sec-WebSocket-Version: 13\r\n"));
    }

    #[test]
    fn test_unsupported_version_is_rejected() {
        // テスト項目: バージョン 13 以外は 426 で拒否される
        // given (前提条件):
        let head = request(&[
            "Upgrade: websocket",
            "Connection: Upgrade",
            "Sec-WebSocket-Version: 8",
            "Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==",
        ]);

        // when (操作):
        let result = parse_upgrade_request(&head, "/ws");

        // then (期待する結果):
        assert_eq!(
            result,
            Err(HandshakeError::UnsupportedVersion(Some("8".to_string())))
        );
    }

    #[test]
    fn test_wrong_method_and_path_are_rejected() {
        // テスト項目: GET 以外のメソッドや別パスへの要求は拒否される
        // given (前提条件):
        let headers = valid_headers().join("\r\n");
        let post = format!("POST /ws HTTP/1.1\r\n{headers}");
        let other_path = format!("GET /chat HTTP/1.1\r\n{headers}");

        // when (操作):
        let post_result = parse_upgrade_request(&post, "/ws");
        let path_result = parse_upgrade_request(&other_path, "/ws");

        // then (期待する結果):
        assert_eq!(
            post_result,
            Err(HandshakeError::MethodNotAllowed("POST".to_string()))
        );
        assert_eq!(path_result, Err(HandshakeError::UnknownPath("/chat".to_string())));
        assert_eq!(path_result.unwrap_err().status().0, 404);
    }

    #[test]
    fn test_malformed_request_line() {
        // テスト項目: 不正なリクエスト行は 400 になる
        // given (前提条件):
        for head in ["", "GET /ws", "GET /ws HTTP/1.0", "GET /ws HTTP/1.1 extra"] {
            // when (操作):
            let result = parse_upgrade_request(head, "/ws");

            // then (期待する結果):
            assert!(
                matches!(result, Err(HandshakeError::MalformedRequest(_))),
                "head = {head:?}"
            );
        }
    }

    #[test]
    fn test_find_head_end() {
        // テスト項目: 空行の直後の位置を返し、未完了なら None を返す
        // given (前提条件):
        let buf = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n\x81\x80";

        // when (操作):
        let end = find_head_end(buf);

        // then (期待する結果):
        assert_eq!(end, Some(buf.len() - 2));
        assert_eq!(find_head_end(b"GET / HTTP/1.1\r\nHost: x\r\n"), None);
    }
}
