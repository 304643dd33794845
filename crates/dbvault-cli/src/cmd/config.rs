use crate::output::print_json;
use clap::Subcommand;
use dbvault_core::config::{Settings, WarnLevel};

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective settings
    Show,

    /// Validate the settings for common mistakes
    Validate,
}

pub fn run(settings: &Settings, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(settings, json),
        ConfigSubcommand::Validate => validate(settings, json),
    }
}

fn show(settings: &Settings, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(settings)
    } else {
        print!("{}", serde_yaml::to_string(settings)?);
        Ok(())
    }
}

fn validate(settings: &Settings, json: bool) -> anyhow::Result<()> {
    let warnings = settings.validate();

    if json {
        print_json(&serde_json::json!({
            "warnings": warnings,
        }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config has errors");
    }
    Ok(())
}
