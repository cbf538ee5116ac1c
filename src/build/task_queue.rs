//! Bounded-concurrency task queue.
//!
//! Tasks start immediately but hold a semaphore permit while they run, so
//! at most `limit` of them make progress at once. `wait_for_tasks` is the
//! barrier callers await before treating the work as done.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

pub struct TaskQueue<E> {
    limit: Arc<Semaphore>,
    tasks: JoinSet<Result<(), E>>,
}

impl<E> TaskQueue<E>
where
    E: From<JoinError> + Send + 'static,
{
    pub fn new(limit: usize) -> Self {
        Self {
            limit: Arc::new(Semaphore::new(limit.max(1))),
            tasks: JoinSet::new(),
        }
    }

    /// Queue `task`; it runs once a permit is free.
    pub fn add<F>(&mut self, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        let limit = self.limit.clone();
        self.tasks.spawn(async move {
            // The semaphore is never closed, so acquire only fails if it is.
            let _permit = limit.acquire_owned().await.ok();
            task.await
        });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every queued task. Returns the number completed, or the
    /// first failure after the remaining tasks are aborted.
    pub async fn wait_for_tasks(&mut self) -> Result<usize, E> {
        let mut completed = 0;
        while let Some(joined) = self.tasks.join_next().await {
            match joined.map_err(E::from).and_then(|result| result) {
                Ok(()) => completed += 1,
                Err(e) => {
                    self.tasks.abort_all();
                    while self.tasks.join_next().await.is_some() {}
                    return Err(e);
                }
            }
        }
        Ok(completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug)]
    enum TestError {
        Failed,
        Join,
    }

    impl From<JoinError> for TestError {
        fn from(_: JoinError) -> Self {
            TestError::Join
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut queue: TaskQueue<TestError> = TaskQueue::new(3);

        for _ in 0..20 {
            let running = running.clone();
            let peak = peak.clone();
            queue.add(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        }

        assert_eq!(queue.wait_for_tasks().await.unwrap(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_failure_is_reported() {
        let mut queue: TaskQueue<TestError> = TaskQueue::new(2);
        queue.add(async { Ok(()) });
        queue.add(async { Err(TestError::Failed) });
        assert!(matches!(queue.wait_for_tasks().await, Err(TestError::Failed)));
    }
}
