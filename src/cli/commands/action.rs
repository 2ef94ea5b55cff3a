//! `warden action`: inspect and cancel remediation actions.

use anyhow::{bail, Result};

use crate::adapters::sqlite::SqliteActionRepository;
use crate::cli::output::TableFormatter;
use crate::domain::models::{ActionStatus, WardenConfig};
use crate::domain::ports::{ActionFilter, ActionRepository};

use super::open_database;

pub async fn handle_list(
    config: &WardenConfig,
    status: Option<String>,
    target: Option<String>,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let status = match status {
        Some(raw) => match ActionStatus::from_str(&raw) {
            Some(status) => Some(status),
            None => bail!("unknown status `{raw}`"),
        },
        None => None,
    };

    let pool = open_database(config).await?;
    let repo = SqliteActionRepository::new(pool);
    let records = repo
        .list(ActionFilter {
            status,
            target,
            limit,
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        println!("{}", TableFormatter::new().format_actions(&records));
        println!("{} action(s)", records.len());
    }
    Ok(())
}

pub async fn handle_show(config: &WardenConfig, id: i64, json: bool) -> Result<()> {
    let pool = open_database(config).await?;
    let repo = SqliteActionRepository::new(pool);
    let record = repo.get(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", TableFormatter::new().format_actions(&[record]));
    }
    Ok(())
}

pub async fn handle_cancel(config: &WardenConfig, id: i64, json: bool) -> Result<()> {
    let pool = open_database(config).await?;
    let repo = SqliteActionRepository::new(pool);
    repo.cancel(id).await?;

    if json {
        println!("{}", serde_json::json!({"ok": true, "id": id}));
    } else {
        println!("action {id} cancelled");
    }
    Ok(())
}
