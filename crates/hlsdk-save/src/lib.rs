// hlsdk-save — generic field-table save/restore serialization core.
//
// Object types describe their persistent state with a table of typed field
// descriptors (schema.rs); the writer (save.rs) walks a table and emits a
// count-prefixed run of length-prefixed, token-keyed records into a fixed
// buffer (buffer.rs), and the reader (restore.rs) decodes such a run back
// into object storage, tolerating schema drift by skipping unmatched
// records. Entity references, pooled strings and function pointers go
// through the collaborator interfaces in context.rs; tables.rs has the
// standalone registry implementations.

pub mod buffer;
pub mod context;
pub mod error;
pub mod restore;
pub mod save;
pub mod schema;
pub mod tables;
