use futures_util::FutureExt;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

pub const DEFAULT_MAX_WORKERS: usize = 5;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub max_workers: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

/// Bounded fan-out over a batch, collecting results in completion order.
///
/// Each item yields exactly one output: a task that panics or is cancelled is
/// replaced by the `fallback` value for its item.
#[derive(Debug, Clone)]
pub struct BoundedExecutor {
    config: ExecutorConfig,
}

impl BoundedExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    /// `min(max_workers, batch size)`, never below 1.
    pub fn pool_size(&self, items: usize) -> usize {
        self.config.max_workers.min(items).max(1)
    }

    pub async fn run<I, T, F, Fut, D>(&self, items: Vec<I>, task: F, fallback: D) -> Vec<T>
    where
        I: Clone + Display + Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        D: Fn(&I) -> T,
    {
        let total = items.len();
        if total == 0 {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.pool_size(total)));
        let mut tasks = JoinSet::new();

        for (idx, item) in items.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let fut = task(item);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                (idx, AssertUnwindSafe(fut).catch_unwind().await)
            });
        }

        let mut completed = vec![false; total];
        let mut results = Vec::with_capacity(total);

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(value))) => {
                    completed[idx] = true;
                    results.push(value);
                    info!("processed {} ({}/{})", items[idx], results.len(), total);
                }
                Ok((idx, Err(_))) => {
                    completed[idx] = true;
                    error!("task for {} panicked, using degraded result", items[idx]);
                    results.push(fallback(&items[idx]));
                }
                Err(e) => {
                    error!("Task error: {}", e);
                }
            }
        }

        for (idx, done) in completed.iter().enumerate() {
            if !done {
                results.push(fallback(&items[idx]));
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_pool_size() {
        let ex = BoundedExecutor::new(ExecutorConfig { max_workers: 5 });
        assert_eq!(ex.pool_size(2), 2);
        assert_eq!(ex.pool_size(20), 5);
        assert_eq!(ex.pool_size(0), 1);
    }

    #[tokio::test]
    async fn test_completion_order() {
        let ex = BoundedExecutor::new(ExecutorConfig { max_workers: 3 });
        let items = vec!["slow".to_string(), "fast".to_string(), "medium".to_string()];
        let out = ex
            .run(
                items,
                |s: String| async move {
                    let ms = match s.as_str() {
                        "slow" => 150,
                        "medium" => 60,
                        _ => 5,
                    };
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    s
                },
                |s: &String| format!("{s}-fallback"),
            )
            .await;
        assert_eq!(out, vec!["fast", "medium", "slow"]);
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let ex = BoundedExecutor::new(ExecutorConfig { max_workers: 2 });
        let items: Vec<String> = vec!["A".into(), "BOOM".into(), "C".into()];
        let mut out = ex
            .run(
                items,
                |s: String| async move {
                    if s == "BOOM" {
                        panic!("boom");
                    }
                    format!("{s}-ok")
                },
                |s: &String| format!("{s}-fallback"),
            )
            .await;
        out.sort();
        assert_eq!(out, vec!["A-ok", "BOOM-fallback", "C-ok"]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let ex = BoundedExecutor::new(ExecutorConfig { max_workers: 2 });
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let items: Vec<u32> = (0..8).collect();

        let out = ex
            .run(
                items,
                |i: u32| {
                    let running = Arc::clone(&running);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        i
                    }
                },
                |i: &u32| *i,
            )
            .await;

        assert_eq!(out.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
