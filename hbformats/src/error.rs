use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unexpected EOF reading {needed} byte(s) at offset {offset:#x} (len={len})")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        len: usize,
    },

    #[error("seek to {offset:#x} is past the end of the buffer (len={len})")]
    SeekOutOfBounds { offset: usize, len: usize },

    #[error("offset cursor pop with no saved position")]
    CursorUnderflow,

    #[error("{format}: invalid magic number {found:#010x} (expected {expected:#010x})")]
    InvalidMagic {
        format: &'static str,
        expected: u32,
        found: u32,
    },

    #[error("{format}: invalid {what} signature {found:#010x} at offset {offset:#x}")]
    InvalidSignature {
        format: &'static str,
        what: &'static str,
        found: u32,
        offset: usize,
    },

    #[error("object set: unknown index format {value} in object {object}, mesh {mesh}, submesh {submesh}")]
    UnknownIndexFormat {
        value: u32,
        object: usize,
        mesh: usize,
        submesh: usize,
    },

    #[error("object set: unknown primitive type {value} in object {object}, mesh {mesh}, submesh {submesh}")]
    UnknownPrimitive {
        value: u32,
        object: usize,
        mesh: usize,
        submesh: usize,
    },

    #[error("replay: unknown event type {tag} for event {index}")]
    UnknownEventType { tag: u8, index: usize },

    #[error("replay: {message}")]
    InvalidReplay { message: String },

    #[error("replay: {what} length {len} does not fit in a u32")]
    ReplayTooLarge { what: &'static str, len: usize },

    #[error("key-value table line {line}: {message}")]
    KvParse { line: usize, message: String },

    #[error("key-value table: key '{path}' not found")]
    KvKeyNotFound { path: String },

    #[error("key-value table: key '{path}' is a group with {children} children, not a value")]
    KvNotLeaf { path: String, children: usize },

    #[error("key-value table: child index {index} out of range for '{path}' ({count} children)")]
    KvChildIndexOutOfRange {
        path: String,
        index: usize,
        count: usize,
    },

    #[error("key-value table: child {index} of '{path}' has no key '{key}'")]
    KvChildKeyNotFound {
        path: String,
        index: usize,
        key: String,
    },

    #[error("invalid interval: start {start} is after end {end}")]
    InvalidInterval { start: i64, end: i64 },

    #[error("{what} index {index} out of range (len={len})")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "json")]
    #[error("failed to serialize JSON dump: {0}")]
    Json(#[from] serde_json::Error),
}
