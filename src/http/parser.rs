use crate::error::ProtocolError;
use crate::http::request::{is_token, Headers, Method};

/// Request line and headers of a request whose body is not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub version: String,
    pub headers: Headers,
}

/// Parses a request head.
///
/// `head` is everything before the `\r\n\r\n` terminator: one request line
/// followed by zero or more header lines, separated by `\r\n`.
pub fn parse_head(head: &[u8]) -> Result<RequestHead, ProtocolError> {
    let head = std::str::from_utf8(head)
        .map_err(|_| ProtocolError::MalformedRequest("head is not valid UTF-8"))?;

    let mut lines = head.split("\r\n");

    let request_line = lines
        .next()
        .ok_or(ProtocolError::MalformedRequest("missing request line"))?;
    let (method, target, version) = parse_request_line(request_line)?;

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path, Some(query.to_string())),
        None => (target, None),
    };

    let mut headers = Headers::new();
    for line in lines {
        let (name, value) = parse_header_line(line)?;
        headers.append(name, value);
    }

    Ok(RequestHead {
        method,
        path: path.to_string(),
        query,
        version: version.to_string(),
        headers,
    })
}

/// Parses `METHOD SP TARGET SP VERSION`.
fn parse_request_line(line: &str) -> Result<(Method, &str, &str), ProtocolError> {
    let mut parts = line.splitn(3, ' ');

    let method_str = parts.next().unwrap_or_default();
    let target = parts
        .next()
        .ok_or(ProtocolError::MalformedRequest("missing request target"))?;
    let version = parts
        .next()
        .ok_or(ProtocolError::MalformedRequest("missing HTTP version"))?;

    let method =
        Method::from_str(method_str).ok_or(ProtocolError::MalformedRequest("invalid method"))?;

    if target.is_empty() || target.bytes().any(|b| b.is_ascii_control() || b == b' ') {
        return Err(ProtocolError::MalformedRequest("invalid request target"));
    }

    if !is_http1_version(version) {
        return Err(ProtocolError::MalformedRequest("unsupported HTTP version"));
    }

    Ok((method, target, version))
}

fn is_http1_version(version: &str) -> bool {
    match version.strip_prefix("HTTP/1.") {
        Some(minor) => minor.len() == 1 && minor.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Parses `Name: value`, trimming optional whitespace around the value.
fn parse_header_line(line: &str) -> Result<(&str, &str), ProtocolError> {
    if line.starts_with([' ', '\t']) {
        return Err(ProtocolError::MalformedRequest("obsolete header line folding"));
    }

    let (name, value) = line
        .split_once(':')
        .ok_or(ProtocolError::MalformedRequest("header line without colon"))?;

    if !is_token(name) {
        return Err(ProtocolError::MalformedRequest("invalid header name"));
    }

    let value = value.trim_matches([' ', '\t']);
    if value.bytes().any(|b| b.is_ascii_control() && b != b'\t') {
        return Err(ProtocolError::MalformedRequest("invalid header value"));
    }

    Ok((name, value))
}
