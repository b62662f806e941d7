// error.rs — save/restore error taxonomy

use thiserror::Error;

/// Everything that can go wrong inside a save or restore operation.
///
/// Missing entity references on decode and unmatched field records are
/// deliberately *not* represented here: both are expected, recoverable
/// conditions handled in place (null handle / skip-by-size) with at most a
/// log line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaveError {
    /// Buffer capacity exceeded. Writes truncate and log at the point of
    /// overflow; this variant surfaces when the finished blob is claimed.
    /// The result is corrupt and must be treated as a failed save.
    #[error("save buffer overflow: {used} of {capacity} bytes used")]
    Overflow { used: usize, capacity: usize },

    /// A function field points at something the function registry has no
    /// name for. Fatal to the object: silently dropping it would corrupt
    /// restored behavior.
    #[error("invalid function pointer in field `{field}`")]
    UnregisteredFunction { field: String },

    /// Read past the end of the buffer on restore.
    #[error("read past the end of the save buffer")]
    Underflow,

    /// The next block in the stream belongs to some other object. The
    /// buffer is rewound so the caller can retry against the right schema.
    #[error("field block header does not match object `{expected}`")]
    HeaderMismatch { expected: String },

    /// The retained-field count record is malformed.
    #[error("malformed field count record for object `{expected}`")]
    BadCount { expected: String },
}
