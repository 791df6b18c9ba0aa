use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use keel::error::{ConfigError, NotFound};
use keel::http::protocol::State;
use keel::http::response::Response;
use keel::http::static_files::PublicFolder;
use keel::http::{HttpProtocol, HttpSettings, RequestOutcome};
use keel::protocol::{ConnectionHandle, Outbound, OutboundQueue, Protocol};

const INDEX: &str = "<h1>hello</h1>";

/// Fresh `<tmp>/keel-static-<pid>-<name>/{public,outside}` tree.
fn site(name: &str) -> (PathBuf, PathBuf) {
    let base = std::env::temp_dir().join(format!("keel-static-{}-{}", std::process::id(), name));
    let _ = fs::remove_dir_all(&base);

    let public = base.join("public");
    fs::create_dir_all(public.join("docs")).unwrap();
    fs::write(public.join("index.html"), INDEX).unwrap();
    fs::write(public.join("docs/readme.txt"), "read me").unwrap();
    fs::write(public.join("docs/a b.txt"), "spaced").unwrap();

    let outside = base.join("outside");
    fs::create_dir_all(&outside).unwrap();
    fs::write(outside.join("secret.txt"), "top secret").unwrap();

    (public, outside)
}

fn static_only(public: &Path) -> (HttpProtocol, OutboundQueue) {
    let settings = HttpSettings::builder()
        .public_folder(PublicFolder::new(public).unwrap())
        .build()
        .unwrap();
    let (conn, rx) = ConnectionHandle::channel(1, None);
    (HttpProtocol::new(Arc::new(settings), conn), rx)
}

fn drain(rx: &mut OutboundQueue) -> Vec<Outbound> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}

/// Response head text plus the streamed file contents, if any.
fn materialize(items: &[Outbound]) -> (String, Option<Vec<u8>>) {
    let mut head = String::new();
    let mut file = None;
    for item in items {
        match item {
            Outbound::Data(bytes) => head.push_str(std::str::from_utf8(bytes).unwrap()),
            Outbound::File { path, len } => {
                let contents = fs::read(path).unwrap();
                assert_eq!(contents.len() as u64, *len);
                file = Some(contents);
            }
            Outbound::Close => {}
        }
    }
    (head, file)
}

#[test]
fn serves_index_html_without_callback() {
    let (public, _) = site("index");
    let (mut http, mut rx) = static_only(&public);

    http.on_data(b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n").unwrap();

    let (head, file) = materialize(&drain(&mut rx));
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Content-Type: text/html; charset=utf-8\r\n"));
    assert!(head.contains(&format!("Content-Length: {}\r\n", INDEX.len())));
    assert_eq!(file.as_deref(), Some(INDEX.as_bytes()));
    assert_eq!(http.state(), State::AwaitingHead);
}

#[test]
fn directory_resolves_to_index() {
    let (public, _) = site("dir");
    let (mut http, mut rx) = static_only(&public);

    http.on_data(b"GET / HTTP/1.1\r\n\r\n").unwrap();

    let (_, file) = materialize(&drain(&mut rx));
    assert_eq!(file.as_deref(), Some(INDEX.as_bytes()));
}

#[test]
fn nested_and_percent_encoded_paths() {
    let (public, _) = site("nested");
    let (mut http, mut rx) = static_only(&public);

    http.on_data(b"GET /docs/./readme.txt?v=1 HTTP/1.1\r\n\r\n").unwrap();
    let (head, file) = materialize(&drain(&mut rx));
    assert!(head.contains("Content-Type: text/plain; charset=utf-8\r\n"));
    assert_eq!(file.as_deref(), Some(&b"read me"[..]));

    http.on_data(b"GET /docs/a%20b.txt HTTP/1.1\r\n\r\n").unwrap();
    let (_, file) = materialize(&drain(&mut rx));
    assert_eq!(file.as_deref(), Some(&b"spaced"[..]));
}

#[test]
fn traversal_is_not_found_and_connection_stays_open() {
    let (public, _) = site("traversal");
    let (mut http, mut rx) = static_only(&public);

    for path in [
        "/../../etc/passwd",
        "/../outside/secret.txt",
        "/docs/../../outside/secret.txt",
        "/%2e%2e/outside/secret.txt",
        "/docs/..%2f..%2foutside%2fsecret.txt",
        "/missing.html",
    ] {
        let wire = format!("GET {path} HTTP/1.1\r\n\r\n");
        http.on_data(wire.as_bytes()).unwrap();

        let out = drain(&mut rx);
        let (head, file) = materialize(&out);
        assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"), "{path}");
        assert!(file.is_none(), "{path}");
        assert!(!out.contains(&Outbound::Close), "{path}");
        assert_eq!(http.state(), State::AwaitingHead);
    }
}

#[test]
fn traversal_and_missing_file_are_indistinguishable() {
    let (public, _) = site("same");
    let folder = PublicFolder::new(&public).unwrap();

    assert_eq!(folder.resolve("/../../etc/passwd"), Err(NotFound));
    assert_eq!(folder.resolve("/nope.txt"), Err(NotFound));
    assert_eq!(folder.resolve("/docs"), Err(NotFound));
}

#[cfg(unix)]
#[test]
fn symlink_out_of_root_is_not_served() {
    let (public, outside) = site("symlink");
    std::os::unix::fs::symlink(outside.join("secret.txt"), public.join("leak.txt")).unwrap();

    let folder = PublicFolder::new(&public).unwrap();
    assert_eq!(folder.resolve("/leak.txt"), Err(NotFound));
}

#[test]
fn head_request_sends_no_file_body() {
    let (public, _) = site("head");
    let (mut http, mut rx) = static_only(&public);

    http.on_data(b"HEAD /index.html HTTP/1.1\r\n\r\n").unwrap();

    let (head, file) = materialize(&drain(&mut rx));
    assert!(head.contains(&format!("Content-Length: {}\r\n", INDEX.len())));
    assert!(file.is_none());
}

#[test]
fn only_get_and_head_are_served() {
    let (public, _) = site("post");
    let (mut http, mut rx) = static_only(&public);

    http.on_data(b"POST /index.html HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi").unwrap();

    let (head, file) = materialize(&drain(&mut rx));
    assert!(head.starts_with("HTTP/1.1 404 "));
    assert!(file.is_none());
}

#[test]
fn unhandled_callback_falls_back_to_folder() {
    let (public, _) = site("fallback");
    let settings = HttpSettings::builder()
        .public_folder(PublicFolder::new(&public).unwrap())
        .on_request(|req| match req.path.as_str() {
            "/api" => RequestOutcome::Respond(Response::ok("api")),
            _ => RequestOutcome::Unhandled,
        })
        .build()
        .unwrap();
    let (conn, mut rx) = ConnectionHandle::channel(1, None);
    let mut http = HttpProtocol::new(Arc::new(settings), conn);

    http.on_data(b"GET /api HTTP/1.1\r\n\r\nGET /index.html HTTP/1.1\r\nConnection: close\r\n\r\n")
        .unwrap();

    let out = drain(&mut rx);
    let (head, file) = materialize(&out);
    assert!(head.contains("\r\n\r\napi"));
    assert!(head.contains("Connection: close\r\n"));
    assert_eq!(file.as_deref(), Some(INDEX.as_bytes()));
    assert_eq!(out.last(), Some(&Outbound::Close));
}

#[test]
fn public_folder_must_be_a_directory() {
    let (public, _) = site("notdir");

    let err = PublicFolder::new(public.join("index.html")).unwrap_err();
    assert!(matches!(err, ConfigError::NotADirectory { .. }));

    let err = PublicFolder::new(public.join("absent")).unwrap_err();
    assert!(matches!(err, ConfigError::PublicFolder { .. }));
}
