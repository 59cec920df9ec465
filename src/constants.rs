//! Global constants used throughout refscope.
//!
//! Cache sizes, expiry times and signer parameters live here so configuration defaults
//! and tests agree on the same numbers.

use std::time::Duration;

/// Default maximum number of cached visibility decisions.
pub const VISIBILITY_CACHE_MAX_ENTRIES: u64 = 1 << 10;

/// Default lifetime of a cached visibility decision, counted from when it was written.
pub const VISIBILITY_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

/// Default ceiling on commits a reachability walk may read before giving up.
///
/// Hitting it makes the object "not visible" for that request.
pub const MAX_REACHABILITY_WALK: usize = 1_000_000;

/// Default total weight of the blame cache, counted in regions.
pub const BLAME_CACHE_MAX_WEIGHT: u64 = 10 << 10;

/// Default lifetime of a signed raw-content URL.
pub const URL_SIGNER_MAX_AGE: Duration = Duration::from_secs(5);

/// At most this many bytes of the key file are used as key material.
pub const URL_SIGNER_KEY_FILE_MAX_BYTES: usize = 128;

/// Size of the key generated when none is configured.
pub const URL_SIGNER_GENERATED_KEY_LEN: usize = 20;

/// Query parameter carrying the raw-content token.
pub const AUTHKEY_PARAM: &str = "authkey";

/// Query parameter selecting the output format.
pub const FORMAT_PARAM: &str = "format";

/// Identity used for callers that are not signed in.
pub const ANONYMOUS_USER: &str = "anonymous user";

/// Timeout for a single git subprocess (30 seconds).
///
/// Every store read is local, so anything slower than this is a wedged process.
pub const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
