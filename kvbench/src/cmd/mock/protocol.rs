//! Server side of the request protocol: head parsing and response rendering.

use rama::error::{ErrorContext as _, OpaqueError};

use crate::protocol::{DIRECTIVE_CLOSE, HEADER_CONNECTION, KvOperation};

/// Parsed request head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    /// Path without the leading slash and without the query.
    pub path: String,
    /// Operation and parameters, if the path and query describe a valid one.
    pub route: Option<Route>,
    /// Whether the client wants the connection kept open after the response.
    pub keep_alive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub op: KvOperation,
    pub key: String,
    pub value: Option<String>,
}

/// Parse the request line and headers of a single request.
///
/// Only `GET` is accepted. The connection is kept alive
/// unless a `Connection: close` header is present.
pub fn parse_request_head(head: &[u8]) -> Result<RequestHead, OpaqueError> {
    let head = std::str::from_utf8(head).context("request head is not valid utf-8")?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().context("missing request line")?;
    let mut parts = request_line.split_ascii_whitespace();
    let method = parts.next().context("missing method")?;
    let target = parts.next().context("missing request target")?;
    parts.next().context("missing protocol version")?;

    if method != "GET" {
        return Err(OpaqueError::from_display("unsupported request method"));
    }
    let target = target
        .strip_prefix('/')
        .context("request target is not an absolute path")?;

    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    let keep_alive = !lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .any(|(name, value)| {
            name.trim().eq_ignore_ascii_case(HEADER_CONNECTION)
                && value.trim().eq_ignore_ascii_case(DIRECTIVE_CLOSE)
        });

    Ok(RequestHead {
        path: path.to_owned(),
        route: parse_route(path, query),
        keep_alive,
    })
}

fn parse_route(path: &str, query: &str) -> Option<Route> {
    let op = KvOperation::from_path(path)?;

    let mut key = None;
    let mut value = None;
    for (name, v) in query.split('&').filter_map(|pair| pair.split_once('=')) {
        match name {
            "key" => key = Some(v),
            "value" => value = Some(v),
            _ => (),
        }
    }

    let key = key.filter(|k| !k.is_empty())?.to_owned();
    let value = match op {
        KvOperation::Set => Some(value?.to_owned()),
        KvOperation::Get | KvOperation::Delete => None,
    };

    Some(Route { op, key, value })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotFound,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "200 OK",
            Status::BadRequest => "400 Bad Request",
            Status::NotFound => "404 Not Found",
        }
    }
}

pub fn encode_response(status: Status, body: &str, keep_alive: bool) -> Vec<u8> {
    let connection = if keep_alive { "keep-alive" } else { "close" };
    format!(
        "HTTP/1.1 {}\r\nServer: {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: {connection}\r\n\r\n{body}",
        status.as_str(),
        crate::utils::env::server_identifier(),
        body.len(),
    )
    .into_bytes()
}
