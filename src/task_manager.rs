//! Lifecycle management for the daemon's background tasks.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Tracks named background tasks and shuts them down as a group.
///
/// Every task receives a child of the global cancellation token; shutdown
/// cancels the group and then drains the join handles with a timeout so one
/// stuck task cannot hang the daemon.
pub struct TaskManager {
    tasks: HashMap<String, TaskInfo>,
    pub global_token: CancellationToken,
}

struct TaskInfo {
    handle: JoinHandle<Result<()>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            global_token: CancellationToken::new(),
        }
    }

    /// Spawns and registers a task under `name`.
    pub fn spawn_task<F, Fut>(&mut self, name: &str, task_fn: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let token = self.global_token.child_token();
        let task_name = name.to_string();

        let handle = tokio::spawn(async move {
            info!("task '{task_name}' started");
            match task_fn(token).await {
                Ok(()) => {
                    info!("task '{task_name}' completed");
                    Ok(())
                }
                Err(e) => {
                    error!("task '{task_name}' failed: {e}");
                    Err(e)
                }
            }
        });

        self.tasks.insert(name.to_string(), TaskInfo { handle });
    }

    /// Cancels and drains every registered task.
    ///
    /// Returns the first failure encountered; the remaining tasks are still
    /// drained either way.
    pub async fn shutdown_all(&mut self) -> Result<()> {
        info!("stopping {} background tasks", self.tasks.len());
        self.global_token.cancel();

        let mut first_error = None;
        for (name, info) in self.tasks.drain() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, info.handle).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    warn!("task '{name}' failed during shutdown: {e}");
                    first_error.get_or_insert(e);
                }
                Ok(Err(e)) => {
                    let error = anyhow::anyhow!("task '{name}' panicked: {e}");
                    error!("{error}");
                    first_error.get_or_insert(error);
                }
                Err(_) => {
                    let error = anyhow::anyhow!("task '{name}' exceeded the shutdown timeout");
                    error!("{error}");
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error).context("background task shutdown failed"),
            None => {
                info!("all background tasks stopped");
                Ok(())
            }
        }
    }

    #[cfg(test)]
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
