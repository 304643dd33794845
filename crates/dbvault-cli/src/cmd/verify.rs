use crate::output::print_json;
use dbvault_core::verify::verify_snapshot;
use std::path::Path;

pub fn run(backup_file: &Path, json: bool) -> anyhow::Result<()> {
    let report = verify_snapshot(backup_file)?;

    if json {
        print_json(&serde_json::json!({
            "snapshot": backup_file,
            "integrity": report,
        }))?;
    } else {
        println!("Integrity check: {}", report.summary());
        for msg in report.messages.iter().skip(1) {
            println!("  {msg}");
        }
    }

    if !report.ok {
        anyhow::bail!("snapshot {} failed the integrity check", backup_file.display());
    }
    Ok(())
}
