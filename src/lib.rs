pub mod config;
pub mod glossary;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

pub use glossary::Glossary;
pub use pipeline::{ReportProcessor, StructuredReport};

/// Install the global tracing subscriber. Logs go to stderr so stdout stays
/// free for report output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
