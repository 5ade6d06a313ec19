//! Constants for the download module (timeouts, temp files, hashing).

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large files).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Suffix appended to the final path while a download is in flight.
pub const TEMP_SUFFIX: &str = ".part";

/// Extension used when the artifact URL path carries none.
pub const DEFAULT_EXTENSION: &str = "pdf";

/// Read buffer size when hashing an existing file.
pub(crate) const HASH_BUFFER_SIZE: usize = 64 * 1024;
