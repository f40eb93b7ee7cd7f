//! Process exit codes

/// Successful termination
pub const OK: i32 = 0;

/// Any failed operation
pub const FAILURE: i32 = 1;

/// Flags that could not be parsed
pub const USAGE: i32 = 2;

/// `exists` found no blob
pub const BLOB_MISSING: i32 = 3;
