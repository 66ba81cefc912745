//! Wire shape of the requests understood by the target service.
//!
//! Every request is a single HTTP/1.1 style request head:
//!
//! ```text
//! GET /<operation>?key=<key>[&value=<value>] HTTP/1.1\r\n
//! Connection: <directive>\r\n
//! \r\n
//! ```

use std::fmt;

pub const HEADER_CONNECTION: &str = "Connection";
pub const DIRECTIVE_KEEP_ALIVE: &str = "keep-alive";
pub const DIRECTIVE_CLOSE: &str = "close";

/// Terminates a request or response head.
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KvOperation {
    Get,
    Set,
    Delete,
}

impl KvOperation {
    pub const fn path(self) -> &'static str {
        match self {
            KvOperation::Get => "get",
            KvOperation::Set => "set",
            KvOperation::Delete => "delete",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "get" => Some(KvOperation::Get),
            "set" => Some(KvOperation::Set),
            "delete" => Some(KvOperation::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for KvOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A single planned key/value request, before it is put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvRequest {
    pub op: KvOperation,
    pub key: u64,
    pub value: Option<String>,
}

impl KvRequest {
    pub fn get(key: u64) -> Self {
        Self {
            op: KvOperation::Get,
            key,
            value: None,
        }
    }

    pub fn set(key: u64, value: impl Into<String>) -> Self {
        Self {
            op: KvOperation::Set,
            key,
            value: Some(value.into()),
        }
    }

    pub fn delete(key: u64) -> Self {
        Self {
            op: KvOperation::Delete,
            key,
            value: None,
        }
    }

    /// Render the request head, with `directive` embedded verbatim
    /// as the `Connection` header value.
    pub fn encode(&self, directive: &str) -> RequestPayload {
        let value_len = self.value.as_ref().map(|v| v.len() + 7).unwrap_or_default();
        let mut buf = String::with_capacity(64 + value_len + directive.len());

        buf.push_str("GET /");
        buf.push_str(self.op.path());
        buf.push_str("?key=");
        buf.push_str(&self.key.to_string());
        if let Some(value) = self.value.as_deref() {
            buf.push_str("&value=");
            buf.push_str(value);
        }
        buf.push_str(" HTTP/1.1\r\n");
        buf.push_str(HEADER_CONNECTION);
        buf.push_str(": ");
        buf.push_str(directive);
        buf.push_str("\r\n\r\n");

        RequestPayload(buf.into_bytes())
    }
}

/// Encoded bytes of one request. Produced fresh for every exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPayload(Vec<u8>);

impl RequestPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for RequestPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
