//! Background work with results handed back over a channel.
//!
//! Workers never see the scene or the tracker. The owning thread polls the
//! handle and applies the result itself.

use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

pub const RESULT_POLL_INTERVAL: Duration = Duration::from_millis(24);

#[derive(Debug, PartialEq, Eq)]
pub enum WorkerPoll<T> {
    Ready(T),
    Pending,
    /// The worker panicked or dropped its sender.
    Lost,
}

#[derive(Debug)]
pub struct WorkerHandle<T> {
    name: String,
    rx: mpsc::Receiver<T>,
    thread: Option<JoinHandle<()>>,
}

pub fn spawn_worker<T, W>(name: impl Into<String>, work: W) -> WorkerHandle<T>
where
    T: Send + 'static,
    W: FnOnce() -> T + Send + 'static,
{
    let name = name.into();
    let (tx, rx) = mpsc::channel::<T>();
    tracing::debug!(worker = %name, "spawning worker");
    let thread = std::thread::spawn(move || {
        let result = work();
        let _ = tx.send(result);
    });
    WorkerHandle {
        name,
        rx,
        thread: Some(thread),
    }
}

impl<T> WorkerHandle<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-blocking check for the result.
    pub fn try_result(&mut self) -> WorkerPoll<T> {
        match self.rx.try_recv() {
            Ok(result) => {
                self.join();
                WorkerPoll::Ready(result)
            }
            Err(mpsc::TryRecvError::Empty) => WorkerPoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                tracing::warn!(worker = %self.name, "worker exited without a result");
                self.join();
                WorkerPoll::Lost
            }
        }
    }

    /// Blocks until the worker finishes. `None` if it never sent a result.
    pub fn wait(mut self) -> Option<T> {
        let result = self.rx.recv().ok();
        self.join();
        result
    }

    /// Polls every `interval` until the worker is done, handing the result to
    /// `on_result`. Returns `false` if the worker was lost.
    pub fn poll_until_done(mut self, interval: Duration, on_result: impl FnOnce(T)) -> bool {
        loop {
            match self.try_result() {
                WorkerPoll::Ready(result) => {
                    on_result(result);
                    return true;
                }
                WorkerPoll::Pending => std::thread::sleep(interval),
                WorkerPoll::Lost => return false,
            }
        }
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!(worker = %self.name, "worker thread panicked");
            }
        }
    }
}
