//! Error types for document decoding and aggregation.
//!
//! * [`DecodeError`] is fatal for the one document being decoded.
//! * [`FetchError`] means the remote store could not be read at all.
//! * [`NodeError`] tags either of the above with the series/instance it
//!   came from, so the aggregator can report it next to a partial total.
//!
//! A document that does not exist is not an error; fetchers return
//! `Ok(None)` for it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// A required structural region (body, table, thead, small) is missing.
    #[error("can't find <{region}> region")]
    MissingRegion { region: &'static str },

    #[error("table has no '{column}' column")]
    MissingColumn { column: &'static str },

    #[error("can't find <a> tag in row: {row}")]
    MissingAnchor { row: String },

    #[error("can't find href= in <a> tag: {anchor}")]
    MissingHref { anchor: String },

    /// The legacy data block is present but is not valid JSON.
    #[error("legacy data block is not valid JSON: {0}")]
    MalformedData(#[from] serde_json::Error),

    /// Valid JSON, but not shaped like the record it should hold.
    #[error("legacy data block is malformed: {0}")]
    MalformedRecord(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request for '{url}' failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("'{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Why a node (series page or instance page) contributed nothing.
#[derive(Debug, Error)]
pub enum NodeErrorKind {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A failure pinned to the remote document that caused it.
#[derive(Debug, Error)]
#[error("{path}: {kind}")]
pub struct NodeError {
    pub path: String,
    pub kind: NodeErrorKind,
}

impl NodeError {
    pub fn new(path: impl Into<String>, kind: impl Into<NodeErrorKind>) -> Self {
        NodeError {
            path: path.into(),
            kind: kind.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_region_display() {
        let e = DecodeError::MissingRegion { region: "body" };
        assert_eq!(e.to_string(), "can't find <body> region");
    }

    #[test]
    fn node_error_carries_path() {
        let e = NodeError::new(
            "/Boskone/Boskone 1",
            DecodeError::MissingRegion { region: "fanac-table" },
        );
        let msg = e.to_string();
        assert!(msg.starts_with("/Boskone/Boskone 1: "), "got: {msg}");
        assert!(msg.contains("fanac-table"));
    }

    #[test]
    fn malformed_json_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let e: DecodeError = err.into();
        assert!(matches!(e, DecodeError::MalformedData(_)));
    }
}
