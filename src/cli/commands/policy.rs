//! `warden policy`: inspect, validate, and reload policy source files.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::cli::output::TableFormatter;
use crate::domain::models::{PolicyDocument, WardenConfig};

fn load_document(file: &Path) -> Result<PolicyDocument> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    PolicyDocument::from_yaml(&raw)
        .with_context(|| format!("Failed to parse {}", file.display()))
}

pub fn handle_list(file: &Path, json: bool) -> Result<()> {
    let document = load_document(file)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&document.policies)?);
    } else {
        println!("{}", TableFormatter::new().format_policies(&document.policies));
    }
    Ok(())
}

pub fn handle_show(file: &Path, name: &str, json: bool) -> Result<()> {
    let document = load_document(file)?;
    let Some(policy) = document.policies.iter().find(|p| p.name == name) else {
        bail!("policy `{name}` not found in {}", file.display());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(policy)?);
    } else {
        println!("{}", serde_yaml::to_string(policy)?);
    }
    Ok(())
}

pub fn handle_validate(file: &Path, json: bool) -> Result<()> {
    let document = load_document(file)?;
    let mut rejected: Vec<(String, String)> = Vec::new();
    for policy in &document.policies {
        if let Err(err) = policy.validate() {
            rejected.push((policy.name.clone(), err.to_string()));
        }
    }

    if json {
        let report = serde_json::json!({
            "ok": rejected.is_empty(),
            "policies": document.policies.len(),
            "rejected": rejected
                .iter()
                .map(|(name, reason)| serde_json::json!({"name": name, "reason": reason}))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if rejected.is_empty() {
        println!(
            "{}: {} policies OK",
            file.display(),
            document.policies.len()
        );
    } else {
        for (name, reason) in &rejected {
            eprintln!("{name}: {reason}");
        }
    }

    if rejected.is_empty() {
        Ok(())
    } else {
        bail!("{} invalid policies in {}", rejected.len(), file.display());
    }
}

/// Apply the file through the same transactional reload the daemon uses,
/// then nudge a running daemon to re-read its configured policy source. An
/// invalid document aborts before the daemon is touched.
pub async fn handle_reload(config: &WardenConfig, file: &Path, json: bool) -> Result<()> {
    let plane = super::build_control_plane(config.clone()).await?;
    let loaded = plane
        .reload_policies_from_path(file)
        .with_context(|| format!("Failed to reload policies from {}", file.display()))?;

    let daemon_pid = super::signal_daemon_reload(config)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "policies": loaded,
                "daemon_pid": daemon_pid,
            })
        );
    } else {
        println!("{loaded} policies loaded from {}", file.display());
        match daemon_pid {
            Some(pid) => println!("daemon (pid {pid}) told to re-read its policy source"),
            None => println!("no running daemon found; the file is picked up on next start"),
        }
    }
    Ok(())
}
