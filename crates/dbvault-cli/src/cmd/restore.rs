use crate::output::print_json;
use anyhow::Context;
use dbvault_core::config::Settings;
use dbvault_core::restore::{RestoreOutcome, Restorer};
use dbvault_core::VaultError;
use std::path::Path;

pub fn run(settings: &Settings, backup_file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let Some(backup_file) = backup_file else {
        return Err(VaultError::Usage(
            "missing backup file\nusage: dbvault restore <backup_file>".to_string(),
        )
        .into());
    };

    let restorer = Restorer::new(settings, backup_file)?;

    // Prompt on stderr so stdout stays clean for --json.
    let stdin = std::io::stdin();
    let outcome = restorer
        .run(&mut stdin.lock(), &mut std::io::stderr())
        .context("restore failed; the live database may need manual recovery from its .before_restore_ copy")?;

    if json {
        return print_json(&outcome);
    }

    let report = match outcome {
        RestoreOutcome::Cancelled => {
            eprintln!();
            println!("Restore cancelled. No changes made.");
            return Ok(());
        }
        RestoreOutcome::Restored(report) => report,
    };

    match &report.safety_copy {
        Some(copy) => println!("Safety copy: {}", copy.display()),
        None => println!(
            "No database at {}; nothing to save before restoring",
            report.restored_to.display()
        ),
    }
    println!(
        "Restored {} -> {}",
        report.snapshot.display(),
        report.restored_to.display()
    );
    println!("Integrity check: {}", report.integrity.summary());

    if !report.integrity.ok {
        eprintln!("warning: the restored database failed its integrity check");
        if let Some(copy) = &report.safety_copy {
            eprintln!(
                "warning: recover manually with: cp {} {}",
                copy.display(),
                report.restored_to.display()
            );
        }
    }

    println!("Restart the service to pick up the restored database.");
    Ok(())
}
