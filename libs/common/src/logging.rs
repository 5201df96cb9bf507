//! Unified logging module for the IPAM services
//!
//! Console output plus daily-rolling business and API log files, all driven by
//! one `EnvFilter` that respects `RUST_LOG`.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter,
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Target used by [`http_request_logger`]; routed to the API log file
pub const API_ACCESS_TARGET: &str = "api_access";

/// Custom format for log level with brackets: `[INFO]`, `[WARN]`, etc.
fn format_level(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "[TRACE]",
        Level::DEBUG => "[DEBUG]",
        Level::INFO => "[INFO]",
        Level::WARN => "[WARN]",
        Level::ERROR => "[ERROR]",
    }
}

/// Custom event formatter that outputs: `timestamp [LEVEL] message`
///
/// Example output: `2026-03-02T00:50:44.809123Z [INFO] Synced connector 3`
struct BracketedLevelFormat;

impl<S, N> FormatEvent<S, N> for BracketedLevelFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let now = chrono::Utc::now();
        write!(writer, "{} ", now.format("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::TRACE => "\x1b[35m",
                Level::DEBUG => "\x1b[34m",
                Level::INFO => "\x1b[32m",
                Level::WARN => "\x1b[33m",
                Level::ERROR => "\x1b[31m",
            };
            write!(writer, "{}{}\x1b[0m ", color, format_level(&level))?;
        } else {
            write!(writer, "{} ", format_level(&level))?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

// Non-blocking writers stop flushing once their guard drops
static GUARDS: OnceLock<Mutex<Vec<WorkerGuard>>> = OnceLock::new();

/// Global log root directory
/// Priority: IPAMSRV_LOG_DIR env > config_dir > default "logs"
static LOG_ROOT: OnceLock<PathBuf> = OnceLock::new();

const LOG_DIR_ENV: &str = "IPAMSRV_LOG_DIR";

/// Initialize log root directory from config or environment
///
/// Call this before [`init_with_config`]; later calls are ignored.
pub fn init_log_root(config_dir: Option<&str>) {
    LOG_ROOT.get_or_init(|| {
        std::env::var(LOG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                config_dir
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("logs"))
            })
    });
}

/// Get log root directory
pub fn get_log_root() -> PathBuf {
    LOG_ROOT.get().cloned().unwrap_or_else(|| {
        std::env::var(LOG_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("logs"))
    })
}

/// Logger configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Service name (e.g., "ipamsrv")
    pub service_name: String,
    /// Base directory for logs
    pub log_dir: PathBuf,
    /// Default level used when `RUST_LOG` is not set
    pub console_level: Level,
    /// Enable JSON format for the business log file
    pub enable_json: bool,
    /// Rolled files kept per log
    pub max_log_files: usize,
    /// Enable API log separation (default: true)
    pub enable_api_log: bool,
    /// API log level (default: INFO)
    pub api_log_level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".to_string(),
            log_dir: get_log_root(),
            console_level: Level::INFO,
            enable_json: false,
            max_log_files: 30,
            enable_api_log: true,
            api_log_level: Level::INFO,
        }
    }
}

/// Build the filter directive string used when `RUST_LOG` is not set
fn default_filter(config: &LogConfig) -> String {
    let api_level = if config.enable_api_log {
        config.api_log_level.as_str().to_lowercase()
    } else {
        "off".to_string()
    };
    format!(
        "{},{}=debug,{}={}",
        config.console_level.as_str().to_lowercase(),
        config.service_name,
        API_ACCESS_TARGET,
        api_level
    )
}

fn rolling_writer(
    config: &LogConfig,
    prefix: &str,
) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(config.max_log_files.max(1))
        .build(&config.log_dir)?;
    Ok(appender)
}

fn keep_guard(guard: WorkerGuard) {
    let guards = GUARDS.get_or_init(|| Mutex::new(Vec::new()));
    match guards.lock() {
        Ok(mut guards) => guards.push(guard),
        Err(poisoned) => poisoned.into_inner().push(guard),
    }
}

/// Initialize logging system with configuration
pub fn init_with_config(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(&config.log_dir)?;

    // RUST_LOG wins; api_access is appended unless the user set it explicitly
    let filter_str = match std::env::var("RUST_LOG") {
        Ok(env_str) if env_str.contains(API_ACCESS_TARGET) => env_str,
        Ok(env_str) => format!(
            "{},{}={}",
            env_str,
            API_ACCESS_TARGET,
            if config.enable_api_log { "info" } else { "off" }
        ),
        Err(_) => default_filter(&config),
    };
    let env_filter = EnvFilter::try_new(&filter_str)?;

    let console_layer = fmt::layer()
        .with_ansi(true)
        .event_format(BracketedLevelFormat)
        .boxed();

    let (business_writer, guard) =
        tracing_appender::non_blocking(rolling_writer(&config, &config.service_name)?);
    keep_guard(guard);

    let business_file_layer = if config.enable_json {
        fmt::layer()
            .json()
            .with_writer(business_writer)
            .with_target(true)
            .with_filter(filter::filter_fn(|metadata| {
                metadata.target() != API_ACCESS_TARGET
            }))
            .boxed()
    } else {
        fmt::layer()
            .with_writer(business_writer)
            .with_ansi(false)
            .event_format(BracketedLevelFormat)
            .with_filter(filter::filter_fn(|metadata| {
                metadata.target() != API_ACCESS_TARGET
            }))
            .boxed()
    };

    let api_file_layer = if config.enable_api_log {
        let prefix = format!("{}_api", config.service_name);
        let (api_writer, api_guard) =
            tracing_appender::non_blocking(rolling_writer(&config, &prefix)?);
        keep_guard(api_guard);

        Some(
            fmt::layer()
                .with_writer(api_writer)
                .with_ansi(false)
                .event_format(BracketedLevelFormat)
                .with_filter(filter::filter_fn(|metadata| {
                    metadata.target() == API_ACCESS_TARGET
                }))
                .boxed(),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(business_file_layer)
        .with(api_file_layer)
        .try_init()?;

    tracing::info!("Logging: {} @ {:?}", config.service_name, config.log_dir);
    tracing::debug!("Log filter: {}", filter_str);

    Ok(())
}

// ==================== HTTP API Request Logging ====================

/// Redact sensitive fields from a JSON request body
///
/// Keys are matched case-insensitively by substring, so `appCode`,
/// `app_code` and `phpipam-token` are all hidden.
#[allow(clippy::disallowed_methods)] // json! macro internally uses unwrap (compile-time safe, never panics)
fn redact_sensitive_fields(json_str: &str) -> String {
    use serde_json::{json, Value};

    const SENSITIVE_KEYS: &[&str] = &[
        "password",
        "token",
        "secret",
        "appcode",
        "app_code",
        "authorization",
    ];

    let Ok(mut value) = serde_json::from_str::<Value>(json_str) else {
        return json_str.to_string();
    };

    fn redact_recursive(value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    if SENSITIVE_KEYS.iter().any(|&k| key_lower.contains(k)) {
                        *val = json!("***REDACTED***");
                    } else {
                        redact_recursive(val);
                    }
                }
            },
            Value::Array(arr) => {
                for item in arr.iter_mut() {
                    redact_recursive(item);
                }
            },
            _ => {},
        }
    }

    redact_recursive(&mut value);

    serde_json::to_string(&value).unwrap_or_else(|_| json_str.to_string())
}

/// Truncate body string to at most `max_length` bytes on a char boundary
fn truncate_body(body: &str, max_length: usize) -> String {
    if body.len() <= max_length {
        return body.to_string();
    }
    let mut cut = max_length;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}[truncated {} bytes]", &body[..cut], body.len() - cut)
}

/// HTTP API request logger middleware
///
/// - **INFO**: POST/PUT/PATCH/DELETE requests (no body)
/// - **DEBUG**: all requests, JSON bodies of modifying requests included
///   (redacted, truncated to 500 bytes)
///
/// Events go to the `api_access` target so they land in the API log file.
///
/// Add this middleware to the router **before** `.with_state()`:
/// ```rust,ignore
/// let app = Router::new()
///     // ... routes ...
///     .layer(axum::middleware::from_fn(common::logging::http_request_logger))
///     .with_state(state);
/// ```
#[cfg(feature = "axum")]
pub async fn http_request_logger(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::body::Body;
    use std::time::Instant;
    use tracing::{debug, info, level_enabled};

    const MAX_BODY_LENGTH: usize = 500;

    let method = req.method().clone();
    let uri = req.uri().clone();
    let modifying = matches!(method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE");
    let is_json = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    let start = Instant::now();

    let (req, body_str) = if level_enabled!(Level::DEBUG) && modifying && is_json {
        let (parts, body) = req.into_parts();
        let bytes = match axum::body::to_bytes(body, usize::MAX).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!("Failed to read request body: {}", e);
                let new_req = axum::extract::Request::from_parts(parts, Body::empty());
                return next.run(new_req).await;
            },
        };

        let body_str = match std::str::from_utf8(&bytes) {
            Ok(s) => truncate_body(&redact_sensitive_fields(s), MAX_BODY_LENGTH),
            Err(_) => "<binary data>".to_string(),
        };

        let new_req = axum::extract::Request::from_parts(parts, Body::from(bytes));
        (new_req, Some(body_str))
    } else {
        (req, None)
    };

    let response = next.run(req).await;

    let duration = start.elapsed();
    let status = response.status();

    if modifying {
        info!(
            target: "api_access",
            method = %method,
            path = %uri.path(),
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "HTTP request"
        );
    }

    match body_str {
        Some(body) => debug!(
            target: "api_access",
            method = %method,
            path = %uri.path(),
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            request_body = %body,
            "HTTP request (detailed)"
        ),
        None if !modifying => debug!(
            target: "api_access",
            method = %method,
            path = %uri.path(),
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "HTTP request"
        ),
        None => {},
    }

    response
}
