//! Fatal, single-shot failures from loading a binary, distinct from the
//! warning-level conditions the runtime only logs (§7 "Binary load" vs
//! "Runtime").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("bad magic bytes")]
    BadMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("truncated section {0:?}")]
    TruncatedSection(kryon_krb::SectionTag),
    #[error("dangling string-table reference {0}")]
    DanglingStringRef(u32),
    #[error("dangling element reference {0}")]
    DanglingElementRef(u32),
    #[error("trailer checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { expected: u32, computed: u32 },
    #[error("unknown child-kind tag {0:#04x}")]
    UnknownChildKind(u8),
    #[error(transparent)]
    Table(#[from] kryon_krb::TableError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
