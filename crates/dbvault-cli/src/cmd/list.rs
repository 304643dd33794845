use crate::output::{print_json, print_table, snapshot_rows, SNAPSHOT_HEADERS};
use crate::settings::with_backup_dir;
use anyhow::Context;
use dbvault_core::config::Settings;
use dbvault_core::snapshot::list_snapshots;
use std::path::PathBuf;

pub fn run(settings: Settings, backup_dir: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let settings = with_backup_dir(settings, backup_dir)?;
    let snapshots = list_snapshots(&settings.backup_dir, &settings.prefix).with_context(|| {
        format!("failed to list snapshots in {}", settings.backup_dir.display())
    })?;

    if json {
        return print_json(&snapshots);
    }

    if snapshots.is_empty() {
        println!("No snapshots in {}", settings.backup_dir.display());
    } else {
        print_table(&SNAPSHOT_HEADERS, &snapshot_rows(&snapshots));
    }
    Ok(())
}
