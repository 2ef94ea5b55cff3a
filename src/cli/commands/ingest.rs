//! `warden ingest`: persist a single sample for the running control plane.

use anyhow::{bail, Result};
use chrono::Utc;
use std::collections::HashMap;

use crate::adapters::sqlite::SqliteMetricRepository;
use crate::domain::models::{MetricSample, WardenConfig};
use crate::domain::ports::MetricRepository;

use super::open_database;

pub async fn handle_ingest(
    config: &WardenConfig,
    name: String,
    value: f64,
    tags: Vec<String>,
    json: bool,
) -> Result<()> {
    let mut tag_map = HashMap::new();
    for raw in tags {
        let Some((key, tag_value)) = raw.split_once('=') else {
            bail!("tag `{raw}` is not key=value");
        };
        tag_map.insert(key.to_string(), tag_value.to_string());
    }

    let sample = MetricSample::new(name, value, tag_map, Utc::now());
    sample.validate()?;

    let pool = open_database(config).await?;
    let repo = SqliteMetricRepository::new(pool);
    let metric_id = repo.insert(&sample).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"ok": true, "metric_id": metric_id})
        );
    } else {
        println!(
            "metric {metric_id} stored; a running control plane evaluates it on the next tick"
        );
    }
    Ok(())
}
