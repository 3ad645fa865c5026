//! Workspace limits and process-wide defaults
//!
//! Values the workspace API publishes (or that were established empirically
//! against it) live here so every layer agrees on them.

/// Maximum direct children per append submission
pub const MAX_CHILDREN_PER_APPEND: usize = 100;

/// Maximum code points per rich-text run
pub const MAX_TEXT_RUN_LEN: usize = 2000;

/// Nesting levels accepted beneath a top-level list context
pub const MAX_NESTING_BEYOND_LIST: usize = 2;

/// Maximum table rows sent with the initial table submission
pub const DEFAULT_TABLE_ROW_BATCH: usize = 50;

/// Maximum accepted source document size in bytes (16 MiB)
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 16 * 1024 * 1024;

/// Data-URI images at or below this size are passed through inline
pub const DATA_URI_INLINE_LIMIT: usize = 8 * 1024;

/// Default workspace request budget per second
pub const DEFAULT_REQ_PER_SEC: u32 = 3;

/// Default retry attempts for transient workspace failures
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Initial retry backoff in milliseconds
pub const RETRY_BASE_DELAY_MS: u64 = 500;

/// Retry backoff ceiling in milliseconds
pub const RETRY_MAX_DELAY_MS: u64 = 8_000;

/// Jitter applied to backoff delays
pub const RETRY_JITTER: f64 = 0.2;

/// Ceiling for honoring a workspace retry-after hint, in seconds
pub const RETRY_AFTER_CAP_SECS: u64 = 30;

/// Parallel delete batch size during the purge phase
pub const PURGE_BATCH_SIZE: usize = 10;

/// List/delete rounds before purge gives up
pub const PURGE_MAX_ROUNDS: usize = 5;

/// Marker-strip retries per block during the sweep phase
pub const SWEEP_MAX_RETRIES: usize = 5;

/// Base delay between sweep retries, multiplied by the attempt number
pub const SWEEP_RETRY_DELAY_MS: u64 = 500;

/// Job-local bound on concurrent workspace calls
pub const JOB_IO_PERMITS: usize = 4;

/// Default validator pass threshold for text coverage
pub const DEFAULT_COVERAGE_THRESHOLD: f64 = 0.97;

/// Default maximum missing segments permitted by the validator
pub const DEFAULT_MAX_MISSING_SPANS: usize = 0;

/// Default maximum group size for fuzzy segment matching
pub const DEFAULT_GROUP_MAX: usize = 8;

/// Default Levenshtein ratio accepted by fuzzy matching
pub const DEFAULT_LEV_RATIO: f64 = 0.88;

/// Default Jaccard token overlap accepted by fuzzy matching
pub const DEFAULT_TOKEN_OVERLAP: f64 = 0.65;

/// Default confidence for a fuzzy match to credit adjusted coverage
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

/// Segment inversions tolerated before the validator warns loudly
pub const DEFAULT_INVERSION_WARN: usize = 3;

/// Default per-attempt HTTP timeout in seconds
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 60;

/// Default per-operation timeout (a call plus its retries) in seconds
pub const DEFAULT_OP_TIMEOUT_SECS: u64 = 120;

/// Job deadline ladder: base / elevated / maximum, in seconds
pub const JOB_DEADLINE_LADDER_SECS: [u64; 3] = [180, 300, 480];

/// Block count above which a job gets the elevated deadline
pub const DEADLINE_BLOCKS_ELEVATED: usize = 300;

/// Block count above which a job gets the maximum deadline
pub const DEADLINE_BLOCKS_MAX: usize = 500;

/// Table count above which a job gets the elevated deadline
pub const DEADLINE_TABLES_ELEVATED: usize = 30;

/// Table count above which a job gets the maximum deadline
pub const DEADLINE_TABLES_MAX: usize = 50;

/// Terminal jobs older than this are evicted from the registry, in seconds
pub const DEFAULT_JOB_TTL_SECS: u64 = 600;

/// Default worker pool cap for concurrent jobs
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 8;

/// Idle connections kept per host by the shared HTTP client
pub const HTTP_POOL_MAX_IDLE: usize = 32;

/// Default bind address for the HTTP listener
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3004";

/// Workspace API version sent when none is configured
pub const DEFAULT_API_VERSION: &str = "2024-06-28";
