use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use tracing_chrome::{ChromeLayerBuilder, FlushGuard};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

const CHROME_TRACE_VAR: &str = "CHARRNN_TRACE_CHROME";
const DEFAULT_FILTER: &str = "info";

static INITIALISED: OnceLock<()> = OnceLock::new();
static CHROME_GUARD: Mutex<Option<FlushGuard>> = Mutex::new(None);

/// What the subscriber should emit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracingOptions {
    /// Directive used when `RUST_LOG` is unset or unparsable.
    pub default_filter: String,
    /// Chrome trace output, if any.
    pub chrome_trace: Option<PathBuf>,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            default_filter: DEFAULT_FILTER.to_string(),
            chrome_trace: None,
        }
    }
}

impl TracingOptions {
    /// Defaults plus the chrome trace path from `CHARRNN_TRACE_CHROME`.
    pub fn from_env() -> Result<Self, InitError> {
        Ok(Self {
            chrome_trace: parse_chrome_trace(std::env::var(CHROME_TRACE_VAR))?,
            ..Self::default()
        })
    }
}

fn parse_chrome_trace(
    raw: Result<String, std::env::VarError>,
) -> Result<Option<PathBuf>, InitError> {
    match raw {
        Ok(raw) if !raw.trim().is_empty() => Ok(Some(PathBuf::from(raw.trim()))),
        Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(InitError::Env(err)),
    }
}

/// Installs the global subscriber configured from the environment.
pub fn init_tracing() -> Result<(), InitError> {
    init_tracing_with(TracingOptions::from_env()?)
}

/// Installs a fmt subscriber filtered by `RUST_LOG` (falling back to
/// `options.default_filter`), plus a chrome layer when requested. Only the
/// first call in a process succeeds.
pub fn init_tracing_with(options: TracingOptions) -> Result<(), InitError> {
    INITIALISED
        .set(())
        .map_err(|_| InitError::AlreadyInitialised)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.default_filter))
        .map_err(|err| InitError::Filter(err.to_string()))?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stdout().is_terminal());
    let chrome_layer = options.chrome_trace.map(|path| {
        let (layer, guard) = ChromeLayerBuilder::new()
            .file(path)
            .include_args(true)
            .build();
        if let Ok(mut slot) = CHROME_GUARD.lock() {
            *slot = Some(guard);
        }
        layer
    });

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(chrome_layer)
        .try_init()
        .map_err(|err| InitError::Subscriber(err.to_string()))
}

/// Finishes the chrome trace file, if one is being written. Returns whether
/// there was anything to flush.
pub fn flush_tracing() -> bool {
    match CHROME_GUARD.lock() {
        Ok(mut slot) => slot.take().is_some(),
        Err(_) => false,
    }
}

/// Errors emitted when configuring the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("tracing has already been initialised")]
    AlreadyInitialised,
    #[error("failed to read CHARRNN_TRACE_CHROME: {0}")]
    Env(std::env::VarError),
    #[error("invalid log filter: {0}")]
    Filter(String),
    #[error("failed to install the tracing subscriber: {0}")]
    Subscriber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chrome_trace_path_is_optional() {
        assert_eq!(parse_chrome_trace(Err(std::env::VarError::NotPresent)).unwrap(), None);
        assert_eq!(parse_chrome_trace(Ok("  ".to_string())).unwrap(), None);
        assert_eq!(
            parse_chrome_trace(Ok(" trace.json ".to_string())).unwrap(),
            Some(PathBuf::from("trace.json"))
        );
    }

    #[test]
    fn second_initialisation_is_rejected() {
        let _ = init_tracing_with(TracingOptions::default());
        assert!(matches!(
            init_tracing_with(TracingOptions::default()),
            Err(InitError::AlreadyInitialised)
        ));
        assert!(!flush_tracing());
    }
}
