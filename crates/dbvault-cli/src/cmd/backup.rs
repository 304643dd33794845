use crate::output::{format_size, print_json, print_table, snapshot_rows, SNAPSHOT_HEADERS};
use crate::settings::with_backup_dir;
use anyhow::Context;
use dbvault_core::config::Settings;
use dbvault_core::snapshot::Producer;
use std::path::PathBuf;

pub fn run(settings: Settings, backup_dir: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let settings = with_backup_dir(settings, backup_dir)?;

    if !json {
        println!(
            "Backing up {} into {}",
            settings.db_path.display(),
            settings.backup_dir.display()
        );
    }

    let report = Producer::new(&settings).run().context("backup failed")?;

    if json {
        return print_json(&report);
    }

    println!(
        "Backup created: {} ({})",
        report.snapshot.display(),
        format_size(report.size_bytes)
    );
    match report.pruned.len() {
        0 => println!("No snapshots older than {} days", settings.retention_days),
        n => {
            println!("Pruned {n} snapshot(s) older than {} days:", settings.retention_days);
            for p in &report.pruned {
                println!("  removed: {}", p.display());
            }
        }
    }
    if !report.recent.is_empty() {
        println!("\nRecent backups:");
        print_table(&SNAPSHOT_HEADERS, &snapshot_rows(&report.recent));
    }

    Ok(())
}
