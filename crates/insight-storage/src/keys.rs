//! Key encoding and decoding for the storage layer.
//!
//! Key format: `{prefix}:{timestamp_ms}:{ulid}`
//! - prefix: identifies the key type (doc, qry, sess)
//! - timestamp_ms: milliseconds since Unix epoch, zero-padded to 13 digits
//! - ulid: 26-character ULID for uniqueness within the same millisecond
//!
//! Zero-padded timestamps make lexicographic key order equal to time
//! order, so newest-first history listing is a reverse iteration.

use ulid::Ulid;

use crate::error::StorageError;

/// Key for document metadata
/// Format: doc:{ulid}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey {
    pub ulid: Ulid,
}

impl DocumentKey {
    /// Parse a document id (ULID string) into a key
    pub fn from_document_id(document_id: &str) -> Result<Self, StorageError> {
        let ulid: Ulid = document_id
            .parse()
            .map_err(|e| StorageError::Key(format!("Invalid document_id ULID: {}", e)))?;
        Ok(Self { ulid })
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("doc:{}", self.ulid).into_bytes()
    }
}

/// Key for query run records
/// Format: qry:{timestamp_ms:013}:{ulid}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKey {
    /// Run start time in milliseconds
    pub timestamp_ms: i64,
    /// Unique identifier (also serves as query_id)
    pub ulid: Ulid,
}

impl QueryKey {
    pub fn from_parts(timestamp_ms: i64, ulid: Ulid) -> Self {
        Self { timestamp_ms, ulid }
    }

    /// Create a query key from a query_id string (the ULID portion).
    /// Uses the ULID's embedded timestamp, which matches the timestamp
    /// the record was keyed under at write time.
    pub fn from_query_id(query_id: &str) -> Result<Self, StorageError> {
        let ulid: Ulid = query_id
            .parse()
            .map_err(|e| StorageError::Key(format!("Invalid query_id ULID: {}", e)))?;
        let timestamp_ms = ulid.timestamp_ms() as i64;
        Ok(Self { timestamp_ms, ulid })
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("qry:{:013}:{}", self.timestamp_ms, self.ulid).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 || parts[0] != "qry" {
            return Err(StorageError::Key(format!("Invalid query key format: {}", s)));
        }
        let timestamp_ms: i64 = parts[1]
            .parse()
            .map_err(|e| StorageError::Key(format!("Invalid timestamp: {}", e)))?;
        let ulid: Ulid = parts[2]
            .parse()
            .map_err(|e| StorageError::Key(format!("Invalid ULID: {}", e)))?;
        Ok(Self { timestamp_ms, ulid })
    }

    /// The query_id (ULID string) for this key
    pub fn query_id(&self) -> String {
        self.ulid.to_string()
    }
}

/// Key for session index entries
/// Format: sess:{session_id}:{timestamp_ms:013}:{ulid}
///
/// The value stored under a session key is the encoded query key, so
/// session keys are never parsed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub session_id: String,
    pub timestamp_ms: i64,
    pub ulid: Ulid,
}

impl SessionKey {
    pub fn new(session_id: impl Into<String>, query_key: &QueryKey) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp_ms: query_key.timestamp_ms,
            ulid: query_key.ulid,
        }
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "sess:{}:{:013}:{}",
            self.session_id, self.timestamp_ms, self.ulid
        )
        .into_bytes()
    }

    /// Prefix matching every entry for a session
    pub fn prefix(session_id: &str) -> Vec<u8> {
        format!("sess:{}:", session_id).into_bytes()
    }

    /// First byte sequence past the session's prefix (';' is ':' + 1),
    /// used as the start point for reverse iteration.
    pub fn prefix_upper(session_id: &str) -> Vec<u8> {
        format!("sess:{};", session_id).into_bytes()
    }
}
