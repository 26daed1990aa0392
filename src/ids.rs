//! Request ids: one ULID per dispatch cycle, echoed in `X-Request-ID`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Header a request id is read from and echoed back in.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Inbound ids longer than this are not worth parsing.
const MAX_INBOUND_LEN: usize = 64;

/// Request identifier. Sortable by creation time, serialized as its
/// 26-character Crockford base32 string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RequestId(Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// The id a client or proxy sent in [`REQUEST_ID_HEADER`] (matched on
    /// the lowercased key), or a fresh one when it is absent or not a ULID.
    #[must_use]
    pub fn from_headers(headers: &HashMap<String, String>) -> Self {
        headers
            .get(&REQUEST_ID_HEADER.to_ascii_lowercase())
            .map(String::as_str)
            .and_then(Self::parse_inbound)
            .unwrap_or_default()
    }

    fn parse_inbound(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > MAX_INBOUND_LEN {
            return None;
        }
        raw.parse().ok()
    }

    /// Milliseconds since the Unix epoch at which the id was minted.
    #[must_use]
    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestId({})", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

impl TryFrom<String> for RequestId {
    type Error = ulid::DecodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.to_string()
    }
}
