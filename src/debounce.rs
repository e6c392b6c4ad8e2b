use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Runs the most recently scheduled action once the quiet period elapses.
///
/// Scheduling again before the period ends aborts the pending action instead of queuing
/// another one. Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }

    /// Returns true when a pending action was aborted.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_last_action() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
        let mut debouncer = Debouncer::new(Duration::from_millis(250));

        for value in 1..=3 {
            let tx = tx.clone();
            debouncer.schedule(async move {
                let _ = tx.send(value);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(debouncer.is_pending());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(rx.try_recv().ok(), Some(3));
        assert!(rx.try_recv().is_err());
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_action() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u32>();
        let mut debouncer = Debouncer::new(Duration::from_millis(250));
        debouncer.schedule(async move {
            let _ = tx.send(1);
        });

        assert!(debouncer.cancel());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
        assert!(!debouncer.cancel());
    }
}
