//! Seam to the external time-series storage engine.
//!
//! The engine itself is a separate component; this crate only decides
//! whether a request may reach it. [`MemoryDatastore`] exists so the server
//! can run and tests can observe upload summaries without the real engine.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

/// Upload outcome as reported back to the uploader: cumulative per-channel
/// bounds for the feed, and the bounds of just this import.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub channel_bounds: Value,
    pub imported_bounds: Value,
}

#[async_trait]
pub trait Datastore: Send + Sync {
    /// Persist an upload payload for a feed. The payload carries
    /// `channel_names` and `data` rows of `[timestamp, v1, v2, ...]`.
    async fn import(&self, feed_id: i64, payload: &Value) -> anyhow::Result<ImportSummary>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min_time_secs: f64,
    max_time_secs: f64,
    min_value: f64,
    max_value: f64,
}

impl Bounds {
    fn fold(&mut self, time: f64, value: f64) {
        self.min_time_secs = self.min_time_secs.min(time);
        self.max_time_secs = self.max_time_secs.max(time);
        self.min_value = self.min_value.min(value);
        self.max_value = self.max_value.max(value);
    }

    fn merge(&mut self, other: &Bounds) {
        self.min_time_secs = self.min_time_secs.min(other.min_time_secs);
        self.max_time_secs = self.max_time_secs.max(other.max_time_secs);
        self.min_value = self.min_value.min(other.min_value);
        self.max_value = self.max_value.max(other.max_value);
    }

    fn from_point(time: f64, value: f64) -> Self {
        Self {
            min_time_secs: time,
            max_time_secs: time,
            min_value: value,
            max_value: value,
        }
    }
}

/// In-memory stand-in for the storage engine.
#[derive(Default)]
pub struct MemoryDatastore {
    channels: Mutex<HashMap<i64, HashMap<String, Bounds>>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn import(&self, feed_id: i64, payload: &Value) -> anyhow::Result<ImportSummary> {
        let imported = parse_bounds(payload)?;

        let mut channels = self
            .channels
            .lock()
            .map_err(|_| anyhow::anyhow!("datastore lock poisoned"))?;
        let feed_channels = channels.entry(feed_id).or_default();
        for (name, bounds) in &imported {
            feed_channels
                .entry(name.clone())
                .and_modify(|b| b.merge(bounds))
                .or_insert(*bounds);
        }

        Ok(ImportSummary {
            channel_bounds: bounds_json(feed_channels),
            imported_bounds: bounds_json(&imported),
        })
    }
}

/// Per-channel bounds of one upload payload. An empty payload (no channels
/// or no rows) yields no bounds, which serializes as `{}`.
fn parse_bounds(payload: &Value) -> anyhow::Result<HashMap<String, Bounds>> {
    let mut result = HashMap::new();

    let names: Vec<String> = match payload.get("channel_names").and_then(Value::as_array) {
        Some(names) => names
            .iter()
            .map(|n| {
                n.as_str()
                    .map(String::from)
                    .ok_or_else(|| anyhow::anyhow!("channel_names must be strings"))
            })
            .collect::<anyhow::Result<_>>()?,
        None => return Ok(result),
    };

    let rows = match payload.get("data").and_then(Value::as_array) {
        Some(rows) => rows,
        None => return Ok(result),
    };

    for row in rows {
        let row = row
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("data rows must be arrays"))?;
        let time = row
            .first()
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow::anyhow!("data rows must start with a timestamp"))?;
        for (i, name) in names.iter().enumerate() {
            // Sparse rows are allowed; nulls simply skip the channel.
            let Some(value) = row.get(i + 1).and_then(Value::as_f64) else {
                continue;
            };
            result
                .entry(name.clone())
                .and_modify(|b: &mut Bounds| b.fold(time, value))
                .or_insert_with(|| Bounds::from_point(time, value));
        }
    }

    Ok(result)
}

fn bounds_json(channels: &HashMap<String, Bounds>) -> Value {
    if channels.is_empty() {
        return json!({});
    }
    let mut min_time = f64::INFINITY;
    let mut max_time = f64::NEG_INFINITY;
    let mut by_channel = serde_json::Map::new();
    for (name, b) in channels {
        min_time = min_time.min(b.min_time_secs);
        max_time = max_time.max(b.max_time_secs);
        by_channel.insert(
            name.clone(),
            json!({
                "minTimeSecs": b.min_time_secs,
                "maxTimeSecs": b.max_time_secs,
                "minValue": b.min_value,
                "maxValue": b.max_value,
            }),
        );
    }
    json!({
        "channels": by_channel,
        "minTimeSecs": min_time,
        "maxTimeSecs": max_time,
    })
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_upload_reports_empty_bounds() {
        let ds = MemoryDatastore::new();
        let summary = ds.import(1, &json!({})).await.unwrap();
        assert_eq!(summary.channel_bounds, json!({}));
        assert_eq!(summary.imported_bounds, json!({}));
    }

    #[tokio::test]
    async fn bounds_cover_all_rows() {
        let ds = MemoryDatastore::new();
        let payload = json!({
            "channel_names": ["temperature", "humidity"],
            "data": [
                [100.0, 20.5, 41.0],
                [200.0, 19.0, 44.5],
                [300.0, 22.0, null],
            ]
        });
        let summary = ds.import(1, &payload).await.unwrap();

        let temp = &summary.imported_bounds["channels"]["temperature"];
        assert_eq!(temp["minTimeSecs"], 100.0);
        assert_eq!(temp["maxTimeSecs"], 300.0);
        assert_eq!(temp["minValue"], 19.0);
        assert_eq!(temp["maxValue"], 22.0);

        let hum = &summary.imported_bounds["channels"]["humidity"];
        assert_eq!(hum["maxTimeSecs"], 200.0);
        assert_eq!(summary.imported_bounds["minTimeSecs"], 100.0);
        assert_eq!(summary.imported_bounds["maxTimeSecs"], 300.0);
    }

    #[tokio::test]
    async fn channel_bounds_accumulate_across_uploads() {
        let ds = MemoryDatastore::new();
        let first = json!({
            "channel_names": ["temperature"],
            "data": [[100.0, 10.0]]
        });
        let second = json!({
            "channel_names": ["temperature"],
            "data": [[500.0, 30.0]]
        });
        ds.import(1, &first).await.unwrap();
        let summary = ds.import(1, &second).await.unwrap();

        let cumulative = &summary.channel_bounds["channels"]["temperature"];
        assert_eq!(cumulative["minTimeSecs"], 100.0);
        assert_eq!(cumulative["maxTimeSecs"], 500.0);
        // This import alone only saw the second point.
        let imported = &summary.imported_bounds["channels"]["temperature"];
        assert_eq!(imported["minTimeSecs"], 500.0);
    }

    #[tokio::test]
    async fn feeds_do_not_share_bounds() {
        let ds = MemoryDatastore::new();
        let payload = json!({
            "channel_names": ["temperature"],
            "data": [[100.0, 10.0]]
        });
        ds.import(1, &payload).await.unwrap();
        let summary = ds.import(2, &payload).await.unwrap();
        assert_eq!(
            summary.channel_bounds["channels"]["temperature"]["minTimeSecs"],
            100.0
        );
    }

    #[tokio::test]
    async fn malformed_rows_are_rejected() {
        let ds = MemoryDatastore::new();
        let payload = json!({
            "channel_names": ["temperature"],
            "data": [["not-a-number", 10.0]]
        });
        assert!(ds.import(1, &payload).await.is_err());
    }
}
