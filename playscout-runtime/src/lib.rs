use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct PlayscoutHandle {
    inner: Handle,
    cancel: Arc<CancellationToken>,
}

pub struct PlayscoutRuntime {
    runtime: Runtime,
    cancel: Arc<CancellationToken>,
}

impl PlayscoutRuntime {
    /// Build a Tokio runtime for the CLI.
    ///
    /// ```
    /// use playscout_runtime::PlayscoutRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = PlayscoutRuntime::build("doctest-runtime", Some(1))
    ///     .expect("runtime builds");
    /// let value = runtime.block_on(async { 2 + 2 });
    /// assert_eq!(value, 4);
    /// runtime.shutdown(Duration::from_millis(10));
    /// ```
    pub fn build(thread_name: &str, worker_threads: Option<usize>) -> Result<Self> {
        let mut builder = Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name);

        if let Some(workers) = worker_threads {
            builder.worker_threads(workers.max(1));
        }

        let runtime = builder.build()?;
        let cancel = Arc::new(CancellationToken::new());
        Ok(Self { runtime, cancel })
    }

    /// Obtain a cloned handle for spawning tasks and sharing cancellation.
    pub fn handle(&self) -> PlayscoutHandle {
        PlayscoutHandle {
            inner: self.runtime.handle().clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Run a future to completion on the runtime.
    pub fn block_on<F: std::future::Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }

    /// Cancel outstanding work and shut the runtime down gracefully.
    pub fn shutdown(self, graceful: Duration) {
        self.cancel.cancel();
        self.runtime.shutdown_timeout(graceful);
    }
}

impl PlayscoutHandle {
    /// Spawn a future onto the shared runtime handle.
    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<T>
    where
        F: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.inner.spawn(fut)
    }

    /// Root cancellation token; cancelled when the runtime shuts down.
    pub fn cancellation(&self) -> Arc<CancellationToken> {
        self.cancel.clone()
    }

    /// Child token of the runtime root that also fires after `deadline`.
    ///
    /// ```
    /// use playscout_runtime::PlayscoutRuntime;
    /// use std::time::Duration;
    ///
    /// let runtime = PlayscoutRuntime::build("deadline-example", Some(1)).unwrap();
    /// let scope = runtime.handle().deadline_scope(Duration::from_millis(5));
    /// let token = scope.token();
    /// runtime.block_on(async move { token.cancelled().await });
    /// assert!(scope.token().is_cancelled());
    /// runtime.shutdown(Duration::from_millis(5));
    /// ```
    pub fn deadline_scope(&self, deadline: Duration) -> CancelScope {
        CancelScope::with_deadline(&self.inner, self.cancel.child_token(), deadline)
    }
}

/// A cancellation token bound to a deadline.
///
/// The timer task is aborted when the scope is dropped, so a finished walk
/// leaves nothing running behind it.
pub struct CancelScope {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl CancelScope {
    pub fn with_deadline(handle: &Handle, token: CancellationToken, deadline: Duration) -> Self {
        let fire = token.clone();
        let timer = handle.spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    tracing::warn!(deadline_ms = deadline.as_millis() as u64, "runtime.deadline.elapsed");
                    fire.cancel();
                }
                _ = fire.cancelled() => {}
            }
        });
        Self { token, timer }
    }

    /// Cancel the scope when the process receives Ctrl-C.
    pub fn cancel_on_ctrl_c(&self, handle: &PlayscoutHandle) {
        let fire = self.token.clone();
        handle.spawn(async move {
            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    if res.is_ok() {
                        tracing::info!("runtime.ctrl_c");
                        fire.cancel();
                    }
                }
                _ = fire.cancelled() => {}
            }
        });
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for CancelScope {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_cancels_token() {
        let runtime = PlayscoutRuntime::build("deadline-test", Some(1)).unwrap();
        let scope = runtime.handle().deadline_scope(Duration::from_millis(10));
        let token = scope.token();
        runtime.block_on(async move {
            tokio::time::timeout(Duration::from_secs(2), token.cancelled())
                .await
                .expect("deadline fires");
        });
        runtime.shutdown(Duration::from_millis(10));
    }

    #[test]
    fn shutdown_cancels_children() {
        let runtime = PlayscoutRuntime::build("shutdown-test", Some(1)).unwrap();
        let scope = runtime.handle().deadline_scope(Duration::from_secs(60));
        let token = scope.token();
        assert!(!token.is_cancelled());
        runtime.shutdown(Duration::from_millis(10));
        assert!(token.is_cancelled());
    }
}
