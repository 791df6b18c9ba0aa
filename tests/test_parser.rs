use keel::error::ProtocolError;
use keel::http::parser::parse_head;
use keel::http::request::Method;

#[test]
fn test_parse_simple_get_request() {
    let head = parse_head(b"GET / HTTP/1.1\r\nHost: example.com").unwrap();

    assert_eq!(head.method, Method::GET);
    assert_eq!(head.path, "/");
    assert_eq!(head.version, "HTTP/1.1");
    assert_eq!(head.headers.get("Host"), Some("example.com"));
}

#[test]
fn test_parse_multiple_headers() {
    let head = parse_head(
        b"GET /path HTTP/1.1\r\nHost: example.com\r\nUser-Agent: test-client\r\nAccept: */*",
    )
    .unwrap();

    assert_eq!(head.headers.get("Host"), Some("example.com"));
    assert_eq!(head.headers.get("User-Agent"), Some("test-client"));
    assert_eq!(head.headers.get("Accept"), Some("*/*"));
    assert_eq!(head.headers.len(), 3);
}

#[test]
fn test_parse_request_with_path_and_query_string() {
    let head = parse_head(b"GET /search?q=rust&page=2 HTTP/1.1\r\nHost: example.com").unwrap();

    assert_eq!(head.path, "/search");
    assert_eq!(head.query.as_deref(), Some("q=rust&page=2"));
}

#[test]
fn test_parse_request_line_only() {
    let head = parse_head(b"GET / HTTP/1.0").unwrap();

    assert_eq!(head.version, "HTTP/1.0");
    assert!(head.headers.is_empty());
}

#[test]
fn test_parse_header_lookup_is_case_insensitive() {
    let head = parse_head(b"GET / HTTP/1.1\r\ncontent-type: application/json").unwrap();

    assert_eq!(head.headers.get("Content-Type"), Some("application/json"));
    assert_eq!(head.headers.get("CONTENT-TYPE"), Some("application/json"));
}

#[test]
fn test_parse_repeated_headers_keep_arrival_order() {
    let head = parse_head(b"GET / HTTP/1.1\r\nAccept: a\r\nX: 1\r\naccept: b").unwrap();

    let values: Vec<&str> = head.headers.get_all("Accept").collect();
    assert_eq!(values, ["a", "b"]);
    assert_eq!(head.headers.get("accept"), Some("a"));
}

#[test]
fn test_parse_header_value_whitespace_trimmed() {
    let head = parse_head(b"GET / HTTP/1.1\r\nHost: \t example.com \t").unwrap();

    assert_eq!(head.headers.get("Host"), Some("example.com"));
}

#[test]
fn test_parse_empty_header_value() {
    let head = parse_head(b"GET / HTTP/1.1\r\nX-Empty:").unwrap();

    assert_eq!(head.headers.get("X-Empty"), Some(""));
}

#[test]
fn test_parse_various_http_methods() {
    let methods = vec![
        ("GET", Method::GET),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("HEAD", Method::HEAD),
        ("OPTIONS", Method::OPTIONS),
        ("PATCH", Method::PATCH),
        ("PROPFIND", Method::Other("PROPFIND".to_string())),
    ];

    for (method_str, expected_method) in methods {
        let req = format!("{} / HTTP/1.1", method_str);
        let head = parse_head(req.as_bytes()).unwrap();
        assert_eq!(head.method, expected_method);
    }
}

fn assert_malformed(head: &[u8]) {
    let result = parse_head(head);
    assert!(
        matches!(result, Err(ProtocolError::MalformedRequest(_))),
        "expected MalformedRequest for {:?}, got {:?}",
        String::from_utf8_lossy(head),
        result
    );
}

#[test]
fn test_parse_malformed_request_lines() {
    assert_malformed(b"");
    assert_malformed(b"GET");
    assert_malformed(b"GET /");
    assert_malformed(b"GET  / HTTP/1.1");
    assert_malformed(b"GET / HTTP/1.1 extra");
    assert_malformed(b"G(T / HTTP/1.1");
    assert_malformed(b"GET / HTTP/2.0");
    assert_malformed(b"GET / HTTP/1.12");
    assert_malformed(b"GET / FTP/1.1");
}

#[test]
fn test_parse_malformed_header() {
    assert_malformed(b"GET / HTTP/1.1\r\nBrokenHeader");
    assert_malformed(b"GET / HTTP/1.1\r\n: no-name");
    assert_malformed(b"GET / HTTP/1.1\r\nBad Name: x");
    assert_malformed(b"GET / HTTP/1.1\r\nHost: x\r\n folded");
}

#[test]
fn test_parse_rejects_invalid_utf8() {
    assert_malformed(b"GET / HTTP/1.1\r\nX: \xff\xfe");
}
