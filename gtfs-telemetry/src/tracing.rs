use std::sync::Once;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter directive used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_DIRECTIVE: &str = "info";

// Tests from different modules share one process, so the test subscriber is installed once.
static TEST_TRACING: Once = Once::new();

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    /// The default filter directive could not be parsed.
    #[error("invalid log directive `{directive}`: {source}")]
    InvalidDirective {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },

    /// A global subscriber was already installed.
    #[error("failed to install the tracing subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Keeps the non-blocking log writer alive.
///
/// Buffered log lines are written out when the flusher is dropped, so it must be held until
/// the process is about to exit.
#[must_use = "dropping the flusher stops log output"]
pub struct LogFlusher {
    _guard: WorkerGuard,
}

/// Installs the global subscriber for a binary.
///
/// Log lines go to stderr through a non-blocking writer. `RUST_LOG` takes precedence over
/// `default_directive`.
pub fn init_tracing(service: &str, default_directive: &str) -> Result<LogFlusher, TracingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive).map_err(|source| {
            TracingError::InvalidDirective {
                directive: default_directive.to_string(),
                source,
            }
        })?,
    };

    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_target(false))
        .try_init()?;

    tracing::debug!(%service, "tracing initialized");

    Ok(LogFlusher { _guard: guard })
}

/// Installs a subscriber that writes through the test harness capture.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    TEST_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}
