//! # Logging & Tracing Infrastructure
//!
//! Installs the global `tracing` subscriber for the scrobble sync core:
//! - Pretty, JSON or compact output on stdout
//! - An `EnvFilter` covering the workspace crates, with the HTTP stack held at `warn`
//! - Optional mirroring of events into a host [`LoggerSink`], with session keys,
//!   secrets and signatures redacted
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
//! use bridge_traits::logger::{ConsoleLogger, LogLevel};
//! use std::sync::Arc;
//!
//! let config = LoggingConfig::from_env()?
//!     .with_level(LogLevel::Debug)
//!     .with_sink(Arc::new(ConsoleLogger::default()));
//!
//! init_logging(config)?;
//! tracing::info!("Scrobble sync started");
//! ```

use crate::error::{Error, Result};

use bridge_traits::logger::{LogEntry, LogLevel, LoggerSink};

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::{LookupSpan, Registry};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable holding filter directives (`EnvFilter` syntax)
pub const LOG_FILTER_ENV: &str = "SCROBBLE_LOG";
/// Environment variable selecting the output format
pub const LOG_FORMAT_ENV: &str = "SCROBBLE_LOG_FORMAT";

const WORKSPACE_TARGETS: &[&str] = &[
    "core_runtime",
    "core_scrobble",
    "core_sync",
    "core_service",
    "bridge_desktop",
];
const QUIET_TARGETS: &[&str] = &["h2", "hyper", "reqwest", "rustls"];

const REDACTED: &str = "[REDACTED]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,
    /// One JSON object per event
    Json,
    /// Single line per event
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(Error::Config(format!("Unknown log format: {other}"))),
        }
    }
}

/// Subscriber settings consumed by [`init_logging`]
#[derive(Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level applied to the workspace crates when no directives are given
    pub level: LogLevel,
    /// Full `EnvFilter` directives; replaces the default per-crate filter
    pub directives: Option<String>,
    pub sink: Option<Arc<dyn LoggerSink>>,
    pub span_events: bool,
    pub show_target: bool,
    pub show_threads: bool,
}

impl fmt::Debug for LoggingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingConfig")
            .field("format", &self.format)
            .field("level", &self.level)
            .field("directives", &self.directives)
            .field("sink", &self.sink.as_ref().map(|_| "LoggerSink { ... }"))
            .field("span_events", &self.span_events)
            .field("show_target", &self.show_target)
            .field("show_threads", &self.show_threads)
            .finish()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: LogLevel::Info,
            directives: None,
            sink: None,
            span_events: true,
            show_target: true,
            show_threads: false,
        }
    }
}

impl LoggingConfig {
    /// Defaults overridden by `SCROBBLE_LOG` and `SCROBBLE_LOG_FORMAT`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown format name.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(directives) = std::env::var(LOG_FILTER_ENV) {
            if !directives.trim().is_empty() {
                config.directives = Some(directives);
            }
        }
        if let Ok(format) = std::env::var(LOG_FORMAT_ENV) {
            config.format = format.parse()?;
        }
        Ok(config)
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = Some(directives.into());
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn LoggerSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_target(mut self, show: bool) -> Self {
        self.show_target = show;
        self
    }

    pub fn with_threads(mut self, show: bool) -> Self {
        self.show_threads = show;
        self
    }

    fn filter(&self) -> Result<EnvFilter> {
        let directives = match &self.directives {
            Some(custom) => custom.clone(),
            None => default_directives(self.level),
        };
        EnvFilter::try_new(&directives)
            .map_err(|e| Error::Config(format!("Invalid log filter '{directives}': {e}")))
    }
}

fn default_directives(level: LogLevel) -> String {
    WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{target}={}", level.as_str()))
        .chain(QUIET_TARGETS.iter().map(|target| format!("{target}=warn")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. Call once at host startup.
///
/// # Errors
///
/// - `Error::Config` if the filter directives do not parse
/// - `Error::Config` if a global subscriber is already installed
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = config.filter()?;
    let output = output_layer(&config);

    tracing_subscriber::registry()
        .with(output)
        .with(SinkForwarder::new(config.sink))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Logging already initialized: {e}")))
}

fn output_layer(config: &LoggingConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let base = tracing_subscriber::fmt::layer()
        .with_target(config.show_target)
        .with_thread_ids(config.show_threads)
        .with_thread_names(config.show_threads);

    match config.format {
        LogFormat::Pretty => base
            .pretty()
            .with_span_events(if config.span_events {
                FmtSpan::ACTIVE
            } else {
                FmtSpan::NONE
            })
            .boxed(),
        LogFormat::Json => base
            .json()
            .flatten_event(true)
            .with_current_span(config.span_events)
            .with_span_list(config.span_events)
            .boxed(),
        LogFormat::Compact => base.compact().boxed(),
    }
}

/// Mirrors events at or above the sink's level into a [`LoggerSink`].
struct SinkForwarder {
    sink: Option<Arc<dyn LoggerSink>>,
}

impl SinkForwarder {
    fn new(sink: Option<Arc<dyn LoggerSink>>) -> Self {
        Self { sink }
    }

    fn deliver(sink: Arc<dyn LoggerSink>, entry: LogEntry) {
        let send = async move {
            if let Err(e) = sink.log(entry).await {
                eprintln!("LoggerSink rejected entry: {e}");
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(send);
            }
            Err(_) => futures::executor::block_on(send),
        }
    }
}

impl<S> Layer<S> for SinkForwarder
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let Some(sink) = &self.sink else {
            return;
        };

        let metadata = event.metadata();
        let level = log_level(metadata.level());
        if level < sink.min_level() {
            return;
        }

        let mut fields = FieldCollector::default();
        event.record(&mut fields);

        let message = fields
            .message
            .take()
            .unwrap_or_else(|| metadata.name().to_string());
        let mut entry = LogEntry::new(level, metadata.target(), message);
        entry.fields = fields
            .values
            .into_iter()
            .map(|(key, value)| {
                let value = redact_if_sensitive(&key, &value);
                (key, value)
            })
            .collect();
        entry.span_id = ctx.lookup_current().map(|span| span.name().to_string());

        Self::deliver(Arc::clone(sink), entry);
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    values: HashMap<String, String>,
}

impl FieldCollector {
    fn store(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            name => {
                self.values.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.store(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.store(field, format!("{value:?}"));
    }
}

fn log_level(level: &Level) -> LogLevel {
    match *level {
        Level::TRACE => LogLevel::Trace,
        Level::DEBUG => LogLevel::Debug,
        Level::INFO => LogLevel::Info,
        Level::WARN => LogLevel::Warn,
        Level::ERROR => LogLevel::Error,
    }
}

/// Whether a field or request parameter named `key` carries a credential.
///
/// Matches `sk` and `api_sig` exactly and anything containing `secret`,
/// `token`, `password`, `session`, `api_key` or `authorization`.
pub fn is_sensitive_key(key: &str) -> bool {
    const EXACT: &[&str] = &["sk", "api_sig"];
    const CONTAINS: &[&str] = &[
        "secret",
        "token",
        "password",
        "session",
        "api_key",
        "authorization",
    ];

    let key = key.to_ascii_lowercase();
    EXACT.contains(&key.as_str()) || CONTAINS.iter().any(|part| key.contains(part))
}

/// Value safe to log for `key`: credentials are replaced and email
/// addresses keep only their first character.
///
/// ```ignore
/// for (key, value) in params.iter() {
///     trace!(param = key, value = %redact_if_sensitive(key, value), "Request parameter");
/// }
/// ```
pub fn redact_if_sensitive(key: &str, value: &str) -> String {
    if is_sensitive_key(key) {
        return REDACTED.to_string();
    }
    mask_email(value).unwrap_or_else(|| value.to_string())
}

fn mask_email(value: &str) -> Option<String> {
    let (local, domain) = value.split_once('@')?;
    if local.is_empty() || !domain.contains('.') {
        return None;
    }
    let first = local.chars().next()?;
    Some(format!("{first}***@{REDACTED}"))
}
