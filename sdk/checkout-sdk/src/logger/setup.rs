//! Setup logging subsystem.
use std::collections::HashSet;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

use super::config;

/// Crates of this workspace, always logged at the configured level.
const WORKSPACE_MEMBERS: [&str; 4] = [
    "checkout_sdk",
    "domain_types",
    "checkout_common_utils",
    "checkout_common_enums",
];

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    #[error("Invalid logging directive: {0}")]
    InvalidDirective(#[from] tracing_subscriber::filter::ParseError),
    #[error("Failed to install the global subscriber: {0}")]
    SubscriberInit(#[from] tracing_subscriber::util::TryInitError),
}

/// Contains guards necessary for logging
#[derive(Debug)]
pub struct TelemetryGuard {
    _log_guards: Vec<WorkerGuard>,
}

/// Setup logging sub-system specifying the logging configuration, the name of the embedding
/// application, and a list of external crates for which a more verbose logging must be enabled.
/// All crates within the current cargo workspace are always considered for verbose logging.
pub fn setup(
    config: &config::Log,
    app_name: &str,
    crates_to_filter: impl AsRef<[&'static str]>,
) -> Result<TelemetryGuard, LoggerError> {
    let mut guards = Vec::new();

    let console_layer = if config.console.enabled {
        let directive = config
            .console
            .filtering_directive
            .clone()
            .unwrap_or_else(|| {
                get_envfilter_directive(
                    tracing::Level::WARN,
                    config.console.level.into_level(),
                    crates_to_filter.as_ref(),
                )
            });
        let filter = EnvFilter::try_new(directive)?;

        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        guards.push(guard);

        let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.console.log_format {
            config::LogFormat::Default => tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .boxed(),
            config::LogFormat::Json => {
                // Disable color or emphasis related ANSI escape codes for JSON formats
                error_stack::Report::set_color_mode(error_stack::fmt::ColorMode::None);

                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(writer)
                    .boxed()
            }
        };
        Some(layer.with_filter(filter))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .try_init()?;

    tracing::info!(
        app_name,
        sdk_name = crate::sdk_name!(),
        sdk_version = crate::version!(),
        "Logging subsystem initialized"
    );

    // Logs are flushed until the returned guard is dropped
    Ok(TelemetryGuard {
        _log_guards: guards,
    })
}

fn get_envfilter_directive(
    default_log_level: tracing::Level,
    filter_log_level: tracing::Level,
    crates_to_filter: impl AsRef<[&'static str]>,
) -> String {
    let explicitly_handled_targets = WORKSPACE_MEMBERS
        .into_iter()
        .chain(crates_to_filter.as_ref().iter().copied())
        .map(|crate_name| crate_name.replace('-', "_"))
        .collect::<HashSet<_>>();

    let mut targets = explicitly_handled_targets.into_iter().collect::<Vec<_>>();
    targets.sort();

    std::iter::once(default_log_level.to_string())
        .chain(
            targets
                .into_iter()
                .map(|target| format!("{target}={filter_log_level}")),
        )
        .collect::<Vec<_>>()
        .join(",")
}
