use std::path::PathBuf;

use crate::cli::{login_session, ExportCommands};
use crate::error::Result;
use crate::exporter::{self, ReportDocument};
use crate::session::Session;

fn default_path(session: &Session, name: &str, ext: &str) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    session
        .store()
        .dir()
        .exports()
        .join(format!("{name}-{}-{date}.{ext}", session.user()))
}

fn report(session: &Session) -> Result<ReportDocument> {
    let snapshot = session.snapshot()?;
    let currency = session.preferences().currency;
    Ok(ReportDocument::new(
        session.user(),
        &snapshot.records,
        &currency,
        chrono::Local::now().naive_local(),
    ))
}

pub fn run(user: Option<String>, command: ExportCommands) -> Result<()> {
    let session = login_session(user)?;
    let path = match command {
        ExportCommands::Csv { output } => {
            let path = output.map(PathBuf::from).unwrap_or_else(|| default_path(&session, "transactions", "csv"));
            let snapshot = session.snapshot()?;
            let count = exporter::write_csv(&snapshot.records, &path)?;
            println!("Exported {count} transaction(s)");
            path
        }
        ExportCommands::Text { output } => {
            let path = output.map(PathBuf::from).unwrap_or_else(|| default_path(&session, "report", "txt"));
            exporter::write_text(&report(&session)?, &path)?;
            path
        }
        #[cfg(feature = "pdf")]
        ExportCommands::Pdf { output } => {
            let path = output.map(PathBuf::from).unwrap_or_else(|| default_path(&session, "report", "pdf"));
            exporter::write_pdf(&report(&session)?, &path)?;
            path
        }
    };
    println!("Wrote {}", path.display());
    Ok(())
}
