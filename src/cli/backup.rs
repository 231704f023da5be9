use std::path::{Path, PathBuf};

use log::info;

use crate::cli::open_store;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::store::DataDir;

pub struct Backup {
    pub path: PathBuf,
    pub files: usize,
    pub bytes: u64,
}

/// Copy every existing data file, unchanged, into a new
/// `tally-backup-YYYYMMDD_HHMMSS` directory under `dest_root`.
pub fn create_backup(dir: &DataDir, dest_root: &Path) -> Result<Backup> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let mut path = dest_root.join(format!("tally-backup-{stamp}"));
    let mut n = 1;
    while path.exists() {
        path = dest_root.join(format!("tally-backup-{stamp}-{n}"));
        n += 1;
    }
    std::fs::create_dir_all(&path)?;

    let mut files = 0;
    let mut bytes = 0;
    for source in dir.data_files().iter().filter(|p| p.exists()) {
        if let Some(name) = source.file_name() {
            bytes += std::fs::copy(source, path.join(name))?;
            files += 1;
        }
    }
    info!("backed up {files} file(s) to {}", path.display());
    Ok(Backup { path, files, bytes })
}

pub fn run(output: Option<String>) -> Result<()> {
    let store = open_store()?;
    let dest_root = output
        .map(PathBuf::from)
        .unwrap_or_else(|| store.dir().backups());
    let backup = {
        let _guard = store.lock();
        create_backup(store.dir(), &dest_root)?
    };
    println!("Backup saved to {}", backup.path.display());
    println!("Files: {}", backup.files);
    println!("Size: {}", format_bytes(backup.bytes));
    Ok(())
}
