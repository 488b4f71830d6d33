//! Final response assembly.

use std::time::Instant;

use ee_client::ProjectInfo;
use serde_json::{Map, Value};

/// Elapsed seconds since `started`, rounded to two decimals.
pub fn elapsed_seconds(started: Instant) -> f64 {
    round2(started.elapsed().as_secs_f64())
}

fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

/// Merge task results with request metadata.
///
/// Task payloads are passed through untouched; metadata keys are appended
/// after them.
pub fn assemble(
    mut results: Map<String, Value>,
    started: Instant,
    project: &ProjectInfo,
) -> Map<String, Value> {
    results.insert(
        "processing_time_seconds".to_string(),
        Value::from(elapsed_seconds(started)),
    );
    results.insert("project_info".to_string(), project_info_value(project));
    results
}

pub fn project_info_value(project: &ProjectInfo) -> Value {
    serde_json::to_value(project).unwrap_or(Value::Null)
}
