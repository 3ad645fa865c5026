//! Configuration
//!
//! All runtime tuning arrives through process environment variables, merged
//! over typed defaults with figment and validated before use. The resolved
//! [`AppConfig`] lives behind an [`arc_swap`] snapshot so the admin reload
//! endpoint can swap it atomically while readers keep a consistent view.

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use docpress_domain::constants as c;
use docpress_domain::error::{Error, Result};
use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub listen_addr: String,
    /// Worker pool cap for concurrent jobs
    pub max_concurrent_jobs: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: c::DEFAULT_LISTEN_ADDR.to_owned(),
            max_concurrent_jobs: c::DEFAULT_MAX_CONCURRENT_JOBS,
        }
    }
}

/// Workspace API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Bearer token (required)
    pub token: String,
    /// Version header value
    pub api_version: String,
    /// API origin
    pub base_url: String,
    /// Outbound request budget per second
    pub req_per_sec: u32,
    /// Retry attempts per operation
    pub max_retries: usize,
    /// Per-attempt HTTP timeout in seconds
    pub attempt_timeout_secs: u64,
    /// Per-operation timeout in seconds
    pub op_timeout_secs: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_version: c::DEFAULT_API_VERSION.to_owned(),
            base_url: "https://api.workspace.com/v1".to_owned(),
            req_per_sec: c::DEFAULT_REQ_PER_SEC,
            max_retries: c::DEFAULT_MAX_RETRIES,
            attempt_timeout_secs: c::DEFAULT_ATTEMPT_TIMEOUT_SECS,
            op_timeout_secs: c::DEFAULT_OP_TIMEOUT_SECS,
        }
    }
}

/// Validator thresholds and fuzzy tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorSettings {
    /// Coverage below this is an error
    pub coverage_threshold: f64,
    /// Missing segments above this are an error
    pub max_missing_spans: usize,
    /// Maximum segments per fuzzy group
    pub group_max: usize,
    /// Accepted normalized Levenshtein ratio
    pub lev_ratio: f64,
    /// Accepted Jaccard token overlap
    pub token_overlap: f64,
    /// Confidence for a fuzzy match to credit the adjusted score
    pub fuzzy_threshold: f64,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            coverage_threshold: c::DEFAULT_COVERAGE_THRESHOLD,
            max_missing_spans: c::DEFAULT_MAX_MISSING_SPANS,
            group_max: c::DEFAULT_GROUP_MAX,
            lev_ratio: c::DEFAULT_LEV_RATIO,
            token_overlap: c::DEFAULT_TOKEN_OVERLAP,
            fuzzy_threshold: c::DEFAULT_FUZZY_THRESHOLD,
        }
    }
}

/// Job and upload behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Terminal jobs are evicted after this many seconds
    pub ttl_secs: u64,
    /// Residual markers fail the job instead of warning
    pub strict_marker_sweep: bool,
    /// Table rows per initial submission
    pub table_row_batch: usize,
    /// Maximum accepted source size in bytes
    pub max_source_bytes: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            ttl_secs: c::DEFAULT_JOB_TTL_SECS,
            strict_marker_sweep: false,
            table_row_batch: c::DEFAULT_TABLE_ROW_BATCH,
            max_source_bytes: c::DEFAULT_MAX_SOURCE_BYTES,
        }
    }
}

/// Resolved application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener
    pub server: ServerConfig,
    /// Workspace API
    pub workspace: WorkspaceConfig,
    /// Validator
    pub validator: ValidatorSettings,
    /// Jobs
    pub jobs: JobsConfig,
    /// Log level (trace/debug/info/warn/error)
    pub log_level: String,
}

/// Environment variables the loader honors, with their config paths
const ENV_KEYS: &[(&str, &str)] = &[
    ("WORKSPACE_TOKEN", "workspace.token"),
    ("WORKSPACE_API_VERSION", "workspace.api_version"),
    ("WORKSPACE_BASE_URL", "workspace.base_url"),
    ("LISTEN_ADDR", "server.listen_addr"),
    ("MAX_CONCURRENT_JOBS", "server.max_concurrent_jobs"),
    ("REQ_PER_SEC", "workspace.req_per_sec"),
    ("MAX_RETRIES", "workspace.max_retries"),
    ("PER_ATTEMPT_TIMEOUT_SECS", "workspace.attempt_timeout_secs"),
    ("PER_OP_TIMEOUT_SECS", "workspace.op_timeout_secs"),
    ("COVERAGE_THRESHOLD", "validator.coverage_threshold"),
    ("MAX_MISSING_SPANS", "validator.max_missing_spans"),
    ("GROUP_MAX", "validator.group_max"),
    ("LEV_RATIO", "validator.lev_ratio"),
    ("TOKEN_OVERLAP", "validator.token_overlap"),
    ("FUZZY_THRESHOLD", "validator.fuzzy_threshold"),
    ("STRICT_MARKER_SWEEP", "jobs.strict_marker_sweep"),
    ("TABLE_ROW_BATCH", "jobs.table_row_batch"),
    ("MAX_SOURCE_BYTES", "jobs.max_source_bytes"),
    ("JOB_TTL_SECS", "jobs.ttl_secs"),
    ("LOG_LEVEL", "log_level"),
];

/// Load configuration from defaults plus the process environment
///
/// # Errors
///
/// Returns a configuration error when a variable fails to parse or a value
/// fails validation.
pub fn load() -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig {
        log_level: "info".to_owned(),
        ..AppConfig::default()
    }));
    for (env_key, config_path) in ENV_KEYS {
        figment = figment.merge(
            Env::raw()
                .only(&[*env_key])
                .map(move |_| (*config_path).into())
                .split("."),
        );
    }
    let config: AppConfig = figment
        .extract()
        .map_err(|e| Error::config(format!("environment: {e}")))?;
    validate(&config)?;
    Ok(config)
}

/// Validate resolved values
fn validate(config: &AppConfig) -> Result<()> {
    if config.workspace.token.is_empty() {
        return Err(Error::ConfigInvalid {
            key: "WORKSPACE_TOKEN".to_owned(),
            message: "workspace token is required".to_owned(),
        });
    }
    if config.server.listen_addr.parse::<SocketAddr>().is_err() {
        return Err(Error::ConfigInvalid {
            key: "LISTEN_ADDR".to_owned(),
            message: format!("'{}' is not a bind address", config.server.listen_addr),
        });
    }
    if config.workspace.req_per_sec == 0 {
        return Err(Error::ConfigInvalid {
            key: "REQ_PER_SEC".to_owned(),
            message: "request budget cannot be zero".to_owned(),
        });
    }
    if !(0.0..=1.0).contains(&config.validator.coverage_threshold) {
        return Err(Error::ConfigInvalid {
            key: "COVERAGE_THRESHOLD".to_owned(),
            message: "threshold must be within [0, 1]".to_owned(),
        });
    }
    if config.server.max_concurrent_jobs == 0 {
        return Err(Error::ConfigInvalid {
            key: "MAX_CONCURRENT_JOBS".to_owned(),
            message: "worker pool cannot be empty".to_owned(),
        });
    }
    Ok(())
}

/// Process-wide configuration snapshot
///
/// Readers take a cheap consistent snapshot; the admin reload swaps in a
/// freshly loaded configuration atomically.
#[derive(Debug)]
pub struct ConfigHandle {
    current: ArcSwap<AppConfig>,
}

impl ConfigHandle {
    /// Wrap an initial configuration
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<AppConfig> {
        self.current.load_full()
    }

    /// Re-read the environment and swap the snapshot
    ///
    /// # Errors
    ///
    /// Leaves the previous snapshot in place when loading fails.
    pub fn reload(&self) -> Result<Arc<AppConfig>> {
        let fresh = load()?;
        let shared = Arc::new(fresh);
        self.current.store(Arc::clone(&shared));
        Ok(shared)
    }
}

/// Redact a secret for status output
#[must_use]
pub fn redact(secret: &str) -> String {
    if secret.len() <= 4 {
        "****".to_owned()
    } else {
        format!("{}****", &secret[..4])
    }
}
