use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::error::{ConfigError, NotFound, ProtocolError};
use crate::http::body::{body_framing, BodyCollector};
use crate::http::buffer::Accumulator;
use crate::http::parser::{parse_head, RequestHead};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::static_files::PublicFolder;
use crate::http::writer::{serialize_head, serialize_response};
use crate::http::HTTP_HEAD_MAX_SIZE;
use crate::protocol::{ConnectionHandle, Protocol, ProtocolFactory};

/// Default `maximum_body_size`, in Mb.
pub const DEFAULT_MAX_BODY_MB: usize = 32;

const MB: usize = 1024 * 1024;

/// What the application did with a request.
#[derive(Debug)]
pub enum RequestOutcome {
    /// Write this response.
    Respond(Response),
    /// The application wrote a response through [`Request::connection`].
    Written,
    /// Not handled; use the static fallback, or answer 404 without one.
    Unhandled,
}

/// Application callback invoked once per complete request.
pub type RequestHandler = Arc<dyn Fn(&Request) -> RequestOutcome + Send + Sync>;

/// Immutable HTTP protocol configuration, shared by all connections.
pub struct HttpSettings {
    maximum_body_size: usize,
    on_request: Option<RequestHandler>,
    public_folder: Option<PublicFolder>,
}

impl fmt::Debug for HttpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSettings")
            .field("maximum_body_size", &self.maximum_body_size)
            .field("on_request", &self.on_request.is_some())
            .field("public_folder", &self.public_folder)
            .finish()
    }
}

impl HttpSettings {
    pub fn builder() -> HttpSettingsBuilder {
        HttpSettingsBuilder::default()
    }

    /// Body limit in Mb.
    pub fn maximum_body_size(&self) -> usize {
        self.maximum_body_size
    }

    /// Body limit in bytes.
    pub fn max_body_bytes(&self) -> usize {
        self.maximum_body_size.saturating_mul(MB)
    }

    pub fn on_request(&self) -> Option<&RequestHandler> {
        self.on_request.as_ref()
    }

    pub fn public_folder(&self) -> Option<&PublicFolder> {
        self.public_folder.as_ref()
    }
}

pub struct HttpSettingsBuilder {
    maximum_body_size: usize,
    on_request: Option<RequestHandler>,
    public_folder: Option<PublicFolder>,
}

impl Default for HttpSettingsBuilder {
    fn default() -> Self {
        Self {
            maximum_body_size: DEFAULT_MAX_BODY_MB,
            on_request: None,
            public_folder: None,
        }
    }
}

impl HttpSettingsBuilder {
    /// Sets the body limit, in Mb.
    pub fn maximum_body_size(mut self, mb: usize) -> Self {
        self.maximum_body_size = mb;
        self
    }

    pub fn on_request<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Request) -> RequestOutcome + Send + Sync + 'static,
    {
        self.on_request = Some(Arc::new(handler));
        self
    }

    pub fn public_folder(mut self, folder: PublicFolder) -> Self {
        self.public_folder = Some(folder);
        self
    }

    pub fn build(self) -> Result<HttpSettings, ConfigError> {
        if self.maximum_body_size == 0 {
            return Err(ConfigError::ZeroBodySize);
        }
        if self.on_request.is_none() && self.public_folder.is_none() {
            return Err(ConfigError::NoHandler);
        }
        Ok(HttpSettings {
            maximum_body_size: self.maximum_body_size,
            on_request: self.on_request,
            public_folder: self.public_folder,
        })
    }
}

/// Observable parsing state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitingHead,
    AwaitingBody,
    Dispatching,
    Closed,
}

enum Phase {
    AwaitingHead,
    AwaitingBody {
        head: RequestHead,
        body: BodyCollector,
    },
    Dispatching,
    Closed,
}

/// HTTP/1.x protocol instance owned by a single connection.
///
/// Bytes go in through [`Protocol::on_data`]; complete requests are handed to
/// the configured callback one at a time. Pipelined bytes that arrive while a
/// request is in flight stay buffered and are parsed as soon as the callback
/// returns.
pub struct HttpProtocol {
    settings: Arc<HttpSettings>,
    conn: ConnectionHandle,
    buf: Accumulator,
    phase: Phase,
    served: u64,
}

impl HttpProtocol {
    pub fn new(settings: Arc<HttpSettings>, conn: ConnectionHandle) -> Self {
        Self {
            settings,
            conn,
            buf: Accumulator::new(),
            phase: Phase::AwaitingHead,
            served: 0,
        }
    }

    pub fn state(&self) -> State {
        match self.phase {
            Phase::AwaitingHead => State::AwaitingHead,
            Phase::AwaitingBody { .. } => State::AwaitingBody,
            Phase::Dispatching => State::Dispatching,
            Phase::Closed => State::Closed,
        }
    }

    /// Unparsed bytes currently held for this connection.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Requests dispatched so far.
    pub fn served(&self) -> u64 {
        self.served
    }

    /// Parses and dispatches as many requests as the buffer holds.
    fn advance(&mut self) -> Result<(), ProtocolError> {
        loop {
            let request = match self.phase {
                Phase::Closed | Phase::Dispatching => return Ok(()),
                Phase::AwaitingHead => self.read_head()?,
                Phase::AwaitingBody { .. } => self.read_body()?,
            };
            match request {
                Some(request) => self.dispatch(request),
                None => return Ok(()),
            }
        }
    }

    fn read_head(&mut self) -> Result<Option<Request>, ProtocolError> {
        self.buf.skip_leading_crlf();

        let Some(end) = self.buf.find_head_terminator() else {
            if self.buf.len() >= HTTP_HEAD_MAX_SIZE {
                return Err(ProtocolError::HeadTooLarge {
                    limit: HTTP_HEAD_MAX_SIZE,
                });
            }
            return Ok(None);
        };

        let head_len = end + 4;
        if head_len > HTTP_HEAD_MAX_SIZE {
            return Err(ProtocolError::HeadTooLarge {
                limit: HTTP_HEAD_MAX_SIZE,
            });
        }

        let raw = self.buf.split_to(head_len);
        let head = parse_head(&raw[..end])?;
        let framing = body_framing(&head.headers)?;
        let body = BodyCollector::new(framing, self.settings.max_body_bytes())?;

        trace!(
            conn = self.conn.id(),
            method = head.method.as_str(),
            path = %head.path,
            framing = ?framing,
            "request head parsed"
        );

        self.phase = Phase::AwaitingBody { head, body };
        self.read_body()
    }

    fn read_body(&mut self) -> Result<Option<Request>, ProtocolError> {
        let Phase::AwaitingBody { body, .. } = &mut self.phase else {
            return Ok(None);
        };
        if !body.feed(&mut self.buf)? {
            return Ok(None);
        }

        match std::mem::replace(&mut self.phase, Phase::Dispatching) {
            Phase::AwaitingBody { head, body } => Ok(Some(Request::from_parts(
                head,
                body.into_body(),
                self.conn.clone(),
            ))),
            other => {
                self.phase = other;
                Ok(None)
            }
        }
    }

    fn dispatch(&mut self, request: Request) {
        self.phase = Phase::Dispatching;

        debug!(
            conn = self.conn.id(),
            method = request.method.as_str(),
            path = %request.path,
            body_len = request.body.len(),
            "dispatching request"
        );

        let outcome = match self.settings.on_request() {
            Some(handler) => handler(&request),
            None => RequestOutcome::Unhandled,
        };

        let keep_alive = request.keep_alive();
        match outcome {
            RequestOutcome::Respond(response) => self.respond(&request, response, keep_alive),
            RequestOutcome::Written => {}
            RequestOutcome::Unhandled => self.serve_static(&request, keep_alive),
        }
        self.served += 1;

        if keep_alive {
            self.phase = Phase::AwaitingHead;
        } else {
            self.conn.close();
            self.release();
        }
    }

    fn respond(&self, request: &Request, mut response: Response, keep_alive: bool) {
        if !keep_alive {
            response
                .headers
                .insert("Connection".to_string(), "close".to_string());
        }

        debug!(
            conn = self.conn.id(),
            status = response.status.as_u16(),
            path = %request.path,
            "writing response"
        );

        if request.method == Method::HEAD {
            self.conn.write(serialize_head(&response).freeze());
        } else {
            self.conn.write(serialize_response(&response));
        }
    }

    fn serve_static(&self, request: &Request, keep_alive: bool) {
        let Some(folder) = self.settings.public_folder() else {
            self.respond(request, Response::not_found(), keep_alive);
            return;
        };

        match folder.lookup(request) {
            Ok(file) => {
                let mut response = file.response();
                if !keep_alive {
                    response
                        .headers
                        .insert("Connection".to_string(), "close".to_string());
                }

                debug!(
                    conn = self.conn.id(),
                    file = %file.path.display(),
                    len = file.len,
                    "serving static file"
                );

                self.conn.write(serialize_head(&response).freeze());
                if request.method != Method::HEAD {
                    self.conn.send_file(file.path, file.len);
                }
            }
            Err(NotFound) => {
                debug!(conn = self.conn.id(), path = %request.path, "static file not found");
                self.respond(request, Response::not_found(), keep_alive);
            }
        }
    }

    fn release(&mut self) {
        self.phase = Phase::Closed;
        self.buf.clear();
    }
}

impl Protocol for HttpProtocol {
    fn on_data(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        if matches!(self.phase, Phase::Closed) {
            trace!(conn = self.conn.id(), len = data.len(), "dropping bytes after close");
            return Ok(());
        }

        self.buf.append(data);
        if let Err(err) = self.advance() {
            warn!(conn = self.conn.id(), error = %err, "closing connection on protocol error");
            self.conn.write(serialize_response(&Response::fatal(err.status())));
            self.conn.close();
            self.release();
            return Err(err);
        }
        Ok(())
    }

    fn on_close(&mut self) {
        debug!(conn = self.conn.id(), served = self.served, "connection closed");
        self.release();
    }

    fn on_shutdown(&mut self) {
        debug!(conn = self.conn.id(), state = ?self.state(), "server shutting down");
    }
}

/// Opens an [`HttpProtocol`] for every accepted connection.
#[derive(Debug, Clone)]
pub struct HttpProtocolFactory {
    settings: Arc<HttpSettings>,
}

impl HttpProtocolFactory {
    pub fn new(settings: HttpSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &Arc<HttpSettings> {
        &self.settings
    }
}

impl From<Arc<HttpSettings>> for HttpProtocolFactory {
    fn from(settings: Arc<HttpSettings>) -> Self {
        Self { settings }
    }
}

impl ProtocolFactory for HttpProtocolFactory {
    fn on_open(&self, conn: ConnectionHandle) -> Box<dyn Protocol> {
        trace!(conn = conn.id(), peer = ?conn.peer(), "opening http protocol");
        Box::new(HttpProtocol::new(Arc::clone(&self.settings), conn))
    }
}
