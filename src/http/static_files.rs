//! Static file fallback.
//!
//! A [`PublicFolder`] binds a root directory once at configuration time and is
//! then shared read-only by every connection. Request paths are normalised
//! segment by segment; a path that climbs above the root, a missing file and
//! an unreadable file are all the same [`NotFound`].

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::error::{ConfigError, NotFound};
use crate::http::mime;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};

const INDEX_FILE: &str = "index.html";

/// Root directory served by the static fallback.
#[derive(Debug, Clone)]
pub struct PublicFolder {
    root: PathBuf,
}

/// A file resolved under the public folder, ready to stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub path: PathBuf,
    pub len: u64,
}

impl PublicFolder {
    /// Binds `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let display = root.as_ref().display().to_string();
        let root = root
            .as_ref()
            .canonicalize()
            .map_err(|source| ConfigError::PublicFolder {
                path: display.clone(),
                source,
            })?;
        if !root.is_dir() {
            return Err(ConfigError::NotADirectory { path: display });
        }
        Ok(Self { root })
    }

    /// Canonical root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path to a regular file under the root.
    ///
    /// Directories resolve to their `index.html`.
    pub fn resolve(&self, request_path: &str) -> Result<StaticFile, NotFound> {
        let relative = normalize(request_path)?;

        let mut candidate = self.root.join(relative);
        if candidate.is_dir() {
            candidate.push(INDEX_FILE);
        }

        // Canonicalising also follows symlinks, which must not leave the root.
        let path = candidate.canonicalize().map_err(|_| NotFound)?;
        if !path.starts_with(&self.root) {
            return Err(NotFound);
        }

        let meta = path.metadata().map_err(|_| NotFound)?;
        if !meta.is_file() {
            return Err(NotFound);
        }
        Ok(StaticFile {
            path,
            len: meta.len(),
        })
    }

    /// Resolves the file for a `GET` or `HEAD` request.
    pub fn lookup(&self, req: &Request) -> Result<StaticFile, NotFound> {
        if !matches!(req.method, Method::GET | Method::HEAD) {
            return Err(NotFound);
        }
        self.resolve(&req.path)
    }
}

impl StaticFile {
    /// Response head for this file; the body is streamed separately.
    pub fn response(&self) -> Response {
        ResponseBuilder::new(StatusCode::Ok)
            .header("Content-Type", mime::content_type(&self.path))
            .header("Content-Length", self.len.to_string())
            .build()
    }
}

/// Percent-decodes and resolves `.`/`..` without touching the filesystem.
fn normalize(request_path: &str) -> Result<PathBuf, NotFound> {
    let rest = request_path.strip_prefix('/').ok_or(NotFound)?;

    let mut segments: Vec<String> = Vec::new();
    for raw in rest.split('/') {
        let segment = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| NotFound)?;

        match &*segment {
            "" | "." => {}
            ".." => {
                segments.pop().ok_or(NotFound)?;
            }
            s if s.contains(['/', '\\', '\0']) => return Err(NotFound),
            s => {
                let mut components = Path::new(s).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => segments.push(s.to_string()),
                    _ => return Err(NotFound),
                }
            }
        }
    }

    Ok(segments.iter().collect())
}
