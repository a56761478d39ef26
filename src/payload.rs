//! Payload Type Tags
//!
//! Every stored payload starts with a short type tag (`json`, `xml` or `text`)
//! followed by the raw body. The tag decides the content type returned on read
//! and the bucket metrics are recorded under.

use std::fmt;
use std::str::FromStr;

use crate::error::CacheError;

// == Payload Type ==
/// Content type carried by a payload's leading tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    Json,
    Xml,
    Text,
}

impl PayloadType {
    /// All known tags, in lookup order.
    pub const ALL: [PayloadType; 3] = [PayloadType::Json, PayloadType::Xml, PayloadType::Text];

    /// The tag bytes written in front of the body.
    pub fn tag(&self) -> &'static str {
        match self {
            PayloadType::Json => "json",
            PayloadType::Xml => "xml",
            PayloadType::Text => "text",
        }
    }

    /// HTTP content type used when serving the body.
    pub fn content_type(&self) -> &'static str {
        match self {
            PayloadType::Json => "application/json",
            PayloadType::Xml => "application/xml",
            PayloadType::Text => "text/plain",
        }
    }

    /// Detects the tag at the start of a stored payload.
    pub fn detect(payload: &[u8]) -> Option<PayloadType> {
        Self::ALL
            .into_iter()
            .find(|kind| payload.starts_with(kind.tag().as_bytes()))
    }

    /// Builds a tagged payload from a body.
    pub fn encode(&self, body: &[u8]) -> Vec<u8> {
        let tag = self.tag().as_bytes();
        let mut payload = Vec::with_capacity(tag.len() + body.len());
        payload.extend_from_slice(tag);
        payload.extend_from_slice(body);
        payload
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for PayloadType {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(PayloadType::Json),
            "xml" => Ok(PayloadType::Xml),
            "text" => Ok(PayloadType::Text),
            other => Err(CacheError::InvalidRequest(format!(
                "Type must be one of [\"json\", \"xml\", \"text\"]. Found \"{}\"",
                other
            ))),
        }
    }
}

/// Splits a stored payload into its type and body.
pub fn decode(payload: &[u8]) -> Option<(PayloadType, &[u8])> {
    let kind = PayloadType::detect(payload)?;
    Some((kind, &payload[kind.tag().len()..]))
}
