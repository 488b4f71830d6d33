//! Named concurrent fan-out / fan-in.
//!
//! Every submitted unit of work runs on its own tokio task. `join` waits for
//! all of them and yields one entry per name: the task's payload on success,
//! `{"error": message}` on failure or panic. A failing task never cancels
//! its siblings, and there is no timeout.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;

use futures::future::join_all;
use serde_json::{json, Map, Value};
use tokio::task::{JoinError, JoinHandle};
use tracing::warn;

/// A set of named tasks awaited together.
#[derive(Default)]
pub struct TaskGroup {
    tasks: Vec<(String, JoinHandle<Result<Value, String>>)>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `task` under `name`. Names must be unique within a group.
    pub fn spawn<F, E>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = Result<Value, E>> + Send + 'static,
        E: Display,
    {
        let handle = tokio::spawn(async move { task.await.map_err(|e| e.to_string()) });
        self.tasks.push((name.into(), handle));
    }

    /// Number of tasks submitted.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task and collect results keyed by name, in
    /// submission order.
    pub async fn join(self) -> Map<String, Value> {
        let (names, handles): (Vec<_>, Vec<_>) = self.tasks.into_iter().unzip();
        let outcomes = join_all(handles).await;

        let mut results = Map::new();
        for (name, outcome) in names.into_iter().zip(outcomes) {
            let value = match outcome {
                Ok(Ok(payload)) => payload,
                Ok(Err(message)) => {
                    warn!(task = %name, error = %message, "Task failed");
                    metrics::counter!("ndvi_api_task_failures_total", "task" => name.clone())
                        .increment(1);
                    json!({ "error": message })
                }
                Err(join_error) => {
                    let message = join_error_message(join_error);
                    warn!(task = %name, error = %message, "Task aborted");
                    metrics::counter!("ndvi_api_task_failures_total", "task" => name.clone())
                        .increment(1);
                    json!({ "error": message })
                }
            };
            results.insert(name, value);
        }
        results
    }
}

fn join_error_message(err: JoinError) -> String {
    if err.is_panic() {
        let payload: Box<dyn Any + Send> = err.into_panic();
        if let Some(msg) = payload.downcast_ref::<String>() {
            return format!("task panicked: {}", msg);
        }
        if let Some(msg) = payload.downcast_ref::<&str>() {
            return format!("task panicked: {}", msg);
        }
        return "task panicked".to_string();
    }
    err.to_string()
}
