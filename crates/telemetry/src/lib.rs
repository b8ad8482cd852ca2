use std::{fs::File, sync::Arc};

use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, MakeWriter, writer::BoxMakeWriter},
    prelude::*,
};

/// Destinations for log output. Both writers are optional so the binary can
/// run fully quiet.
#[derive(Default)]
pub struct TelemetryConfig {
    console_writer: Option<BoxMakeWriter>,
    file_writer: Option<BoxMakeWriter>,
}

impl TelemetryConfig {
    pub fn with_console_writer<W>(mut self, writer: W) -> Self
    where
        W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
    {
        self.console_writer = Some(BoxMakeWriter::new(writer));
        self
    }

    pub fn with_file_writer(mut self, file: File) -> Self {
        self.file_writer = Some(BoxMakeWriter::new(Arc::new(file)));
        self
    }
}

/// Keeps the installed subscriber alive for the lifetime of the process.
#[must_use]
pub struct TelemetryGuard(());

pub fn install(config: TelemetryConfig) -> TelemetryGuard {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(filter_layer)
        .with(config.console_writer.map(|writer| {
            fmt::layer()
                .compact()
                .with_ansi(true)
                .without_time()
                .with_writer(writer)
        }))
        .with(config.file_writer.map(|writer| {
            fmt::layer()
                .pretty()
                .with_ansi(false)
                .with_writer(writer)
        }))
        .init();

    TelemetryGuard(())
}

pub fn install_error_handler() {
    let _ = color_eyre::config::HookBuilder::default()
        .issue_url(concat!(env!("CARGO_PKG_REPOSITORY"), "/issues/new"))
        .add_issue_metadata("version", env!("CARGO_PKG_VERSION"))
        .install();
}

pub fn with_root_span<T>(app: &str, task: &str, f: impl FnOnce() -> T) -> T {
    tracing::info_span!("root", app = app, task = task).in_scope(f)
}
