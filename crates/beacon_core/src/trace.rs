use cap_std::fs_utf8::Dir;
use miette::{Context, IntoDiagnostic, Result};

/// env variable with the tracing filter directives
pub const LOG_FILTER_ENV: &str = "WAYPOINT_BEACON_LOG";
pub const LOG_FILE_NAME: &str = "waypoint_beacon.log";

/// Installs the global subscriber. logs go to [LOG_FILE_NAME] inside the data dir.
/// The returned guard must be kept alive until shutdown, otherwise buffered lines are lost.
pub fn install_tracing(beacon_dir: &Dir) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};
    let filter_layer = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .or_else(|_| EnvFilter::try_new("info"))
        .into_diagnostic()
        .wrap_err("failed to create log filter")?;
    // creating the file also checks that the directory is writeable by us
    let writer = std::io::BufWriter::new(
        beacon_dir
            .create(LOG_FILE_NAME)
            .into_diagnostic()
            .wrap_err("failed to create log file")?,
    );
    let (nb, guard) = tracing_appender::non_blocking(writer);
    let fmt_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(nb);
    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .into_diagnostic()
        .wrap_err("failed to install tracing subscriber")?;
    Ok(guard)
}

/// code stolen from miette::set_panic_hook
pub fn install_miette_panic_hooks() -> Result<()> {
    miette::set_hook(Box::new(|diagnostic| {
        let handler = Box::new(miette::NarratableReportHandler::new());
        let mut report = String::new();
        if let Err(e) = handler.render_report(&mut report, diagnostic) {
            tracing::error!("failed to render report: {e}");
        }
        tracing::error!("diagnostic: {:#?}", &report);
        handler
    }))
    .wrap_err("failed to install miette hook")?;

    #[derive(Debug, thiserror::Error, miette::Diagnostic)]
    #[error("{0}")]
    #[diagnostic(help("set the `RUST_BACKTRACE=1` environment variable to display a backtrace."))]
    struct Panic(String);

    std::panic::set_hook(Box::new(|panic_info| {
        let mut message = "Something went wrong".to_string();
        let payload = panic_info.payload();
        if let Some(msg) = payload.downcast_ref::<&str>() {
            message = msg.to_string();
        }
        if let Some(msg) = payload.downcast_ref::<String>() {
            message = msg.clone();
        }
        let mut report: Result<()> = Err(Panic(message).into());
        if let Some(loc) = panic_info.location() {
            report = report
                .with_context(|| format!("at {}:{}:{}", loc.file(), loc.line(), loc.column()));
        }
        if let Err(err) = report.with_context(|| "waypoint beacon panicked.".to_string()) {
            eprintln!("Error: {:?}", err);
            tracing::error!("crashing: {:?}", &err);
        }
    }));
    Ok(())
}
