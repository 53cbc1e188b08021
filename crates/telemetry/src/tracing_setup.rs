//! Tracing setup for structured logging.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter (e.g., "info", "attribution=debug")
    pub filter: String,
    /// Whether to output JSON format
    pub json: bool,
    /// Whether to include span open/close events
    pub span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
            span_events: false,
        }
    }
}

impl TracingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `RUST_LOG` and `LOG_JSON` (`1` or `true`).
    pub fn from_env() -> Self {
        let json = std::env::var("LOG_JSON")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self::new().with_filter(filter).with_json(json)
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_span_events(mut self, span_events: bool) -> Self {
        self.span_events = span_events;
        self
    }
}

/// Installs the global subscriber.
///
/// Returns false if a subscriber was already installed (tests call this
/// repeatedly).
pub fn init_tracing(config: TracingConfig) -> bool {
    let env_filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let json_layer = config.json.then(|| {
        fmt::layer()
            .json()
            .with_span_events(span_events.clone())
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
    });

    let text_layer = (!config.json).then(|| {
        fmt::layer()
            .with_span_events(span_events)
            .with_target(true)
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(filter = %config.filter, json = config.json, "Tracing initialized");
    }
    installed
}

/// Initialize tracing from environment variables.
pub fn init_tracing_from_env() -> bool {
    init_tracing(TracingConfig::from_env())
}
