//! Bounded task pool
//!
//! Sub-tasks run as spawned tokio tasks, one per collaborator call, and
//! report into their own `JoinHandle`. Concurrency is bounded at the call
//! site: every collaborator call holds one semaphore permit while in
//! flight, so phase sub-tasks and self-consistency samples share the same
//! limit without nested permits.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::types::{AuditError, Result};

#[derive(Debug, Clone)]
pub struct TaskPool {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
}

impl TaskPool {
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run `call` while holding one permit
    pub async fn bounded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| AuditError::TaskAborted {
                task: "permit".to_string(),
                reason: e.to_string(),
            })?;
        call.await
    }

    /// Spawn a named task; its result lands in the returned handle
    pub fn spawn<T, F>(&self, name: &'static str, task: F) -> NamedHandle<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        NamedHandle {
            name,
            handle: tokio::spawn(task),
        }
    }
}

/// Spawned task tagged with its name
pub struct NamedHandle<T> {
    pub name: &'static str,
    handle: JoinHandle<Result<T>>,
}

impl<T> NamedHandle<T> {
    /// Wait for the task; a panic or cancellation becomes an error
    pub async fn join(self) -> (&'static str, Result<T>) {
        let result = match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(AuditError::TaskAborted {
                task: self.name.to_string(),
                reason: if e.is_panic() {
                    "panicked".to_string()
                } else {
                    e.to_string()
                },
            }),
        };
        (self.name, result)
    }
}

/// Wait for every handle, keeping declaration order
pub async fn join_all<T>(handles: Vec<NamedHandle<T>>) -> Vec<(&'static str, Result<T>)> {
    futures::future::join_all(handles.into_iter().map(NamedHandle::join)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_bounded_limits_concurrency() {
        let pool = TaskPool::new(2);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let pool_ref = pool.clone();
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                pool.spawn("call", async move {
                    pool_ref
                        .bounded(async {
                            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                            peak.fetch_max(now, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .await
                })
            })
            .collect();

        let results = join_all(handles).await;
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_join_keeps_order_and_reports_panics() {
        let pool = TaskPool::new(4);
        let handles = vec![
            pool.spawn("slow", async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(1)
            }),
            pool.spawn("boom", async {
                if true {
                    panic!("sub-task exploded");
                }
                Ok(2)
            }),
            pool.spawn("fast", async { Ok(3) }),
        ];

        let results = join_all(handles).await;
        let names: Vec<_> = results.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["slow", "boom", "fast"]);
        assert!(matches!(
            &results[1].1,
            Err(AuditError::TaskAborted { task, .. }) if task == "boom"
        ));
        assert_eq!(*results[2].1.as_ref().unwrap(), 3);
    }

    #[test]
    fn test_zero_concurrency_is_raised_to_one() {
        assert_eq!(TaskPool::new(0).max_concurrency(), 1);
    }
}
