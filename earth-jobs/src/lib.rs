#![warn(
    clippy::unwrap_used,
    clippy::cast_lossless,
    clippy::unimplemented,
    clippy::indexing_slicing,
    clippy::expect_used
)]
use std::{any, future, pin};

#[cfg(not(target_arch = "wasm32"))]
pub type AsyncReturn<Output> = pin::Pin<Box<dyn future::Future<Output = Output> + Send + 'static>>;
#[cfg(target_arch = "wasm32")]
pub type AsyncReturn<Output> = pin::Pin<Box<dyn future::Future<Output = Output> + 'static>>;

/// Unit of background work run on the [`bevy::tasks::AsyncComputeTaskPool`].
/// The outcome comes back through the [`JobHandle`] returned by [`Job::spawn`].
pub trait Job: any::Any + Sized + Send + Sync + 'static {
    type Outcome: any::Any + Send + Sync;

    fn name(&self) -> String;

    fn perform(self, context: Context) -> AsyncReturn<Self::Outcome>;

    fn spawn(self) -> JobHandle<Self::Outcome> {
        let (outcome_tx, outcome_recv) = async_channel::bounded::<Self::Outcome>(1);
        let (progress_tx, progress_recv) = async_channel::unbounded::<Progress>();

        let job_name = self.name();
        let name = job_name.clone();
        bevy::tasks::AsyncComputeTaskPool::get()
            .spawn(async move {
                let instant = instant::Instant::now();
                bevy::log::debug!("Starting job '{}'", job_name);
                let outcome = self.perform(Context { progress_tx }).await;
                bevy::log::debug!("Completed job '{}' in {:?}", job_name, instant.elapsed());
                if outcome_tx.send(outcome).await.is_err() {
                    // the handle was dropped; nobody wants the result any more
                    bevy::log::debug!("Discarding result of cancelled job '{}'", job_name);
                }
            })
            .detach();

        JobHandle {
            name,
            progress: 0,
            progress_recv,
            outcome_recv,
        }
    }
}

pub struct Context {
    pub progress_tx: async_channel::Sender<Progress>,
}

impl Context {
    pub fn send_progress(&self, progress: Progress) -> async_channel::Send<u8> {
        self.progress_tx.send(progress)
    }
}

pub type Progress = u8;
pub type ProgressSender = async_channel::Sender<Progress>;

#[derive(Debug, PartialEq, Eq)]
pub enum JobStatus<T> {
    Pending,
    Ready(T),
    /// The job ended without producing an outcome.
    Failed,
}

/// Receiving end of a spawned job. Dropping it cancels interest in the result.
#[derive(Debug)]
pub struct JobHandle<T> {
    pub name: String,
    pub progress: Progress,
    progress_recv: async_channel::Receiver<Progress>,
    outcome_recv: async_channel::Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Non-blocking check for completion; call once per frame.
    pub fn poll(&mut self) -> JobStatus<T> {
        while let Ok(progress) = self.progress_recv.try_recv() {
            self.progress = progress;
        }
        match self.outcome_recv.try_recv() {
            Ok(outcome) => JobStatus::Ready(outcome),
            Err(async_channel::TryRecvError::Empty) => JobStatus::Pending,
            Err(async_channel::TryRecvError::Closed) => {
                bevy::log::error!("Job '{}' ended without an outcome", self.name);
                JobStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::tasks::{AsyncComputeTaskPool, TaskPool};

    use super::*;

    struct Double(u32);
    impl Job for Double {
        type Outcome = u32;
        fn name(&self) -> String {
            format!("double {}", self.0)
        }
        fn perform(self, context: Context) -> AsyncReturn<u32> {
            Box::pin(async move {
                let _ = context.send_progress(50).await;
                self.0 * 2
            })
        }
    }

    fn wait<T>(handle: &mut JobHandle<T>) -> JobStatus<T> {
        let start = instant::Instant::now();
        loop {
            match handle.poll() {
                JobStatus::Pending if start.elapsed().as_secs() < 5 => {
                    std::thread::sleep(std::time::Duration::from_millis(1))
                }
                status => return status,
            }
        }
    }

    #[test]
    fn outcome_is_delivered_through_the_handle() {
        AsyncComputeTaskPool::init(TaskPool::default);
        let mut handle = Double(21).spawn();
        assert_eq!(handle.name, "double 21");
        assert_eq!(wait(&mut handle), JobStatus::Ready(42));
        assert_eq!(handle.progress, 50);
    }

    #[test]
    fn dropped_sender_reports_failure() {
        let (outcome_tx, outcome_recv) = async_channel::bounded::<u32>(1);
        let (_progress_tx, progress_recv) = async_channel::unbounded::<Progress>();
        let mut handle = JobHandle {
            name: "never".into(),
            progress: 0,
            progress_recv,
            outcome_recv,
        };
        assert_eq!(handle.poll(), JobStatus::Pending);
        drop(outcome_tx);
        assert_eq!(handle.poll(), JobStatus::Failed);
    }
}
