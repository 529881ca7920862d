//! Column family definitions for RocksDB.
//!
//! Each column family isolates data with different access patterns:
//! - documents: Document metadata records (default compaction)
//! - queries: Append-only query run history (Zstd compression)
//! - sessions: Session index pointing into the queries column family

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family for document metadata
pub const CF_DOCUMENTS: &str = "documents";

/// Column family for query run records
pub const CF_QUERIES: &str = "queries";

/// Column family mapping session ids to query keys
pub const CF_SESSIONS: &str = "sessions";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_DOCUMENTS, CF_QUERIES, CF_SESSIONS];

/// Options for the query history (append-only, compressed)
fn queries_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_DOCUMENTS, Options::default()),
        ColumnFamilyDescriptor::new(CF_QUERIES, queries_options()),
        ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default()),
    ]
}
