//! Parallel job runner.
//!
//! Encode and decode work runs on tokio's blocking thread pool; storage
//! futures run on the runtime's workers. Callers get a handle they can poll
//! with [`is_complete`](JobHandle::is_complete), `.await`, or block on.
//!
//! A [`MeshJob`] is split in two phases:
//!
//! - [`execute`](MeshJob::execute) does the heavy lifting off-thread and
//!   owns all of its buffers exclusively;
//! - [`finalize`](MeshJob::finalize) runs on whichever context collects the
//!   result, for work that must happen there (assembling a renderable mesh,
//!   for instance).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot;

use crate::error::{SerializerError, SerializerResult};

/// One schedulable unit of codec work.
pub trait MeshJob: Send + 'static {
    /// Result of the off-thread phase.
    type Output: Send + 'static;
    /// Result handed to the caller after finalization.
    type Finished;

    /// Heavy lifting. Runs on a pool thread.
    fn execute(self) -> Self::Output;

    /// Single-threaded finalization on the collecting context.
    fn finalize(output: Self::Output) -> SerializerResult<Self::Finished>;
}

/// Handle to a task running on the [`JobRunner`].
///
/// Resolves to `Err(JobFailed)` if the task panicked or was dropped before
/// sending its result.
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<T>,
    ready: Option<T>,
    disconnected: bool,
}

// The result is only ever moved out, never pinned.
impl<T> Unpin for TaskHandle<T> {}

impl<T> TaskHandle<T> {
    fn new(receiver: oneshot::Receiver<T>) -> Self {
        Self {
            receiver,
            ready: None,
            disconnected: false,
        }
    }

    /// Returns whether the task has finished, without blocking.
    ///
    /// A completed result is buffered inside the handle, so checking does
    /// not consume it.
    pub fn is_complete(&mut self) -> bool {
        if self.ready.is_some() || self.disconnected {
            return true;
        }
        match self.receiver.try_recv() {
            Ok(value) => {
                self.ready = Some(value);
                true
            }
            Err(oneshot::error::TryRecvError::Empty) => false,
            Err(oneshot::error::TryRecvError::Closed) => {
                self.disconnected = true;
                true
            }
        }
    }

    /// Take the result if the task has finished.
    pub fn try_take(&mut self) -> Option<SerializerResult<T>> {
        if !self.is_complete() {
            return None;
        }
        Some(self.ready.take().ok_or_else(dropped))
    }

    /// Block the current thread until the task finishes.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async context. Use `.await` there.
    pub fn wait(mut self) -> SerializerResult<T> {
        if let Some(value) = self.ready.take() {
            return Ok(value);
        }
        if self.disconnected {
            return Err(dropped());
        }
        self.receiver.blocking_recv().map_err(|_| dropped())
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = SerializerResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(value) = this.ready.take() {
            return Poll::Ready(Ok(value));
        }
        if this.disconnected {
            return Poll::Ready(Err(dropped()));
        }
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(value)) => Poll::Ready(Ok(value)),
            Poll::Ready(Err(_)) => {
                this.disconnected = true;
                Poll::Ready(Err(dropped()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

fn dropped() -> SerializerError {
    SerializerError::JobFailed("task panicked or was dropped before completing".into())
}

/// Handle to a scheduled [`MeshJob`].
pub struct JobHandle<J: MeshJob> {
    task: TaskHandle<J::Output>,
}

impl<J: MeshJob> JobHandle<J> {
    /// Returns whether the off-thread phase has finished.
    pub fn is_complete(&mut self) -> bool {
        self.task.is_complete()
    }

    /// Finalize and return the result.
    ///
    /// Must only be called once [`is_complete`](Self::is_complete) returned
    /// `true`; otherwise returns [`SerializerError::JobPending`] and the
    /// handle stays usable.
    pub fn complete_and_collect(&mut self) -> SerializerResult<J::Finished> {
        match self.task.try_take() {
            Some(output) => J::finalize(output?),
            None => Err(SerializerError::JobPending),
        }
    }

    /// Await completion cooperatively, then finalize on the awaiting context.
    pub async fn join(self) -> SerializerResult<J::Finished> {
        let output = self.task.await?;
        J::finalize(output)
    }

    /// Block until completion, then finalize on the calling thread.
    pub fn wait(self) -> SerializerResult<J::Finished> {
        J::finalize(self.task.wait()?)
    }
}

/// Await every handle, in order, collecting each result.
///
/// All tasks are already running, so awaiting them one after another is a
/// fan-in barrier, not serialization of the work.
pub async fn join_all<T>(handles: Vec<TaskHandle<T>>) -> Vec<SerializerResult<T>> {
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.await);
    }
    results
}

/// Await every job handle, finalizing each on the awaiting context.
pub async fn join_jobs<J: MeshJob>(handles: Vec<JobHandle<J>>) -> Vec<SerializerResult<J::Finished>> {
    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        results.push(handle.join().await);
    }
    results
}

/// Thread-pool-backed runner for codec jobs and storage futures.
///
/// Either owns a tokio multi-thread runtime or attaches to an existing one.
/// `Clone` is cheap (Arc internals).
#[derive(Clone)]
pub struct JobRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    runtime: Option<Runtime>,
    handle: Handle,
}

impl Drop for RunnerInner {
    fn drop(&mut self) {
        // Dropping a runtime from inside async code panics; shutting down in
        // the background is valid from any context.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl JobRunner {
    /// Start a dedicated runtime.
    ///
    /// `worker_threads` drive storage futures; `blocking_threads` bounds the
    /// pool that runs encode and decode jobs.
    pub fn new(worker_threads: usize, blocking_threads: usize) -> SerializerResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .max_blocking_threads(blocking_threads.max(1))
            .thread_name("mesh-serializer")
            .enable_all()
            .build()
            .map_err(SerializerError::Runtime)?;
        log::debug!(
            "Job runner started ({} workers, {} blocking threads)",
            worker_threads.max(1),
            blocking_threads.max(1)
        );
        let handle = runtime.handle().clone();
        Ok(Self {
            inner: Arc::new(RunnerInner {
                runtime: Some(runtime),
                handle,
            }),
        })
    }

    /// Attach to an existing runtime.
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                runtime: None,
                handle,
            }),
        }
    }

    /// Attach to the runtime of the current async context, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::from_handle)
    }

    /// Schedule a codec job on the blocking pool.
    pub fn schedule<J: MeshJob>(&self, job: J) -> JobHandle<J> {
        let (sender, receiver) = oneshot::channel();
        self.inner.handle.spawn_blocking(move || {
            let _ = sender.send(job.execute());
        });
        JobHandle {
            task: TaskHandle::new(receiver),
        }
    }

    /// Spawn a storage future on the runtime's workers.
    pub fn run_io<T, F>(&self, future: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        self.inner.handle.spawn(async move {
            let _ = sender.send(future.await);
        });
        TaskHandle::new(receiver)
    }

    /// Drive a future to completion from synchronous code.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an async context.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.inner.handle.block_on(future)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Square(u64);

    impl MeshJob for Square {
        type Output = u64;
        type Finished = String;

        fn execute(self) -> u64 {
            self.0 * self.0
        }

        fn finalize(output: u64) -> SerializerResult<String> {
            Ok(output.to_string())
        }
    }

    struct Sleepy(Duration);

    impl MeshJob for Sleepy {
        type Output = ();
        type Finished = ();

        fn execute(self) {
            std::thread::sleep(self.0);
        }

        fn finalize(_: ()) -> SerializerResult<()> {
            Ok(())
        }
    }

    struct Panics;

    impl MeshJob for Panics {
        type Output = ();
        type Finished = ();

        fn execute(self) {
            panic!("job exploded");
        }

        fn finalize(_: ()) -> SerializerResult<()> {
            Ok(())
        }
    }

    fn runner() -> JobRunner {
        JobRunner::new(2, 4).unwrap()
    }

    #[test]
    fn schedule_and_wait() {
        let runner = runner();
        let handle = runner.schedule(Square(7));
        assert_eq!(handle.wait().unwrap(), "49");
    }

    #[test]
    fn is_complete_does_not_consume() {
        let runner = runner();
        let mut handle = runner.schedule(Square(3));
        while !handle.is_complete() {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(handle.is_complete());
        assert_eq!(handle.complete_and_collect().unwrap(), "9");
    }

    #[test]
    fn collect_before_completion_is_an_error() {
        let runner = runner();
        let mut handle = runner.schedule(Sleepy(Duration::from_millis(200)));
        assert!(matches!(
            handle.complete_and_collect(),
            Err(SerializerError::JobPending)
        ));
        handle.wait().unwrap();
    }

    #[test]
    fn panicking_job_reports_failure() {
        let runner = runner();
        let handle = runner.schedule(Panics);
        assert!(matches!(handle.wait(), Err(SerializerError::JobFailed(_))));
    }

    #[test]
    fn join_all_preserves_order() {
        let runner = runner();
        let handles: Vec<_> = (1..=8u64).map(|n| runner.schedule(Square(n))).collect();
        let results = runner.block_on(join_jobs(handles));
        let values: Vec<String> = results.into_iter().map(Result::unwrap).collect();
        assert_eq!(values, vec!["1", "4", "9", "16", "25", "36", "49", "64"]);
    }

    #[test]
    fn jobs_run_in_parallel() {
        let runner = runner();
        let start = std::time::Instant::now();
        let handles: Vec<_> = (0..4)
            .map(|_| runner.schedule(Sleepy(Duration::from_millis(100))))
            .collect();
        for result in runner.block_on(join_jobs(handles)) {
            result.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(350));
    }

    #[test]
    fn run_io_future() {
        let runner = runner();
        let handle = runner.run_io(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            99u32
        });
        assert_eq!(runner.block_on(handle).unwrap(), 99);
    }

    #[test]
    fn attach_to_existing_runtime() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        rt.block_on(async {
            let runner = JobRunner::current().expect("inside runtime");
            let value = runner.schedule(Square(5)).join().await.unwrap();
            assert_eq!(value, "25");
        });
    }

    #[test]
    fn current_outside_runtime_is_none() {
        assert!(JobRunner::current().is_none());
    }
}
