//! Report generation command.
//!
//! Records come from the database (`LOTWISE_DATABASE_URL`) unless
//! `--snapshot` names a JSON snapshot file. Report settings (calendar
//! offset, fetch deadline, storage) are read from the same environment
//! variables the server uses.

use std::path::PathBuf;

use chrono::NaiveDate;
use lotwise_core::TenantId;
use lotwise_server::config::{ReportConfig, ServerConfig};
use lotwise_server::db::{self, PgReportSource};
use lotwise_server::render::ReportFormat;
use lotwise_server::service::{ReportRequest, ReportService};
use lotwise_server::source::{ReportSource, SnapshotSource};

/// Parsed `report` arguments.
#[derive(Debug)]
pub struct ReportArgs {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub tenant: Option<TenantId>,
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
    pub store: bool,
    pub snapshot: Option<PathBuf>,
}

/// Generate one report and write it out.
///
/// The document is written to `--output`, or to `fifo_<from>_to_<to>.<ext>`
/// in the current directory. A stored report is only written locally when
/// `--output` is given.
///
/// # Errors
///
/// Returns an error if configuration is invalid, data cannot be loaded, or
/// the document cannot be written.
pub async fn run(args: ReportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let report_config = ReportConfig::from_env()?;

    let source = match &args.snapshot {
        Some(path) => {
            tracing::info!(path = %path.display(), "Reading snapshot file");
            ReportSource::Snapshot(SnapshotSource::open(path, report_config.utc_offset).await?)
        }
        None => {
            let config = ServerConfig::from_env()?;
            let pool = db::create_pool(&config.database_url).await?;
            tracing::info!("Connected to database");
            ReportSource::Postgres(PgReportSource::new(pool, report_config.utc_offset))
        }
    };

    let service = ReportService::new(source, &report_config);
    let request = ReportRequest {
        from: args.from,
        to: args.to,
        tenant: args.tenant,
        format: args.format,
        store: args.store,
    };

    let generated = service.generate(&request).await?;

    if let Some(reference) = &generated.reference {
        tracing::info!(%reference, "Report stored");
    }

    let output = match (args.output, generated.reference.is_some()) {
        (Some(path), _) => Some(path),
        (None, false) => Some(PathBuf::from(
            request.file_name(generated.document.extension),
        )),
        (None, true) => None,
    };

    if let Some(path) = output {
        tokio::fs::write(&path, &generated.document.bytes).await?;
        tracing::info!(
            path = %path.display(),
            runs = generated.summary.stats.runs_in_window,
            shortfall_lines = generated.summary.stats.shortfall_lines,
            "Report written"
        );
    }

    Ok(())
}
