//! Background flush cycle
//!
//! One thread per open WAL. It flushes on every tick and, when told to shut
//! down, flushes once more and reports that final result back to `close`.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{bounded, select, tick, Receiver, Sender};
use parking_lot::Mutex;
use tracing::error;

use crate::error::{DriftError, Result};

use super::log::WalState;

/// Handle to the running flush thread
pub(crate) struct Flusher {
    shutdown_tx: Sender<()>,
    stopped_rx: Receiver<Result<()>>,
    handle: JoinHandle<()>,
}

impl Flusher {
    /// Start flushing `state` every `interval`
    pub(crate) fn spawn(state: Arc<Mutex<WalState>>, interval: Duration) -> io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let (stopped_tx, stopped_rx) = bounded(1);

        let handle = thread::Builder::new()
            .name("driftkv-flush".to_string())
            .spawn(move || run(state, interval, shutdown_rx, stopped_tx))?;

        Ok(Self {
            shutdown_tx,
            stopped_rx,
            handle,
        })
    }

    /// Stop the cycle and wait for its final flush
    pub(crate) fn stop(self) -> Result<()> {
        // A send error means the thread is already gone; recv reports it
        let _ = self.shutdown_tx.send(());

        let result = self.stopped_rx.recv().unwrap_or_else(|_| {
            Err(DriftError::Flush(io::Error::new(
                io::ErrorKind::Other,
                "flush thread exited without a final flush",
            )))
        });

        if self.handle.join().is_err() {
            error!("flush thread panicked");
        }

        result
    }
}

fn run(
    state: Arc<Mutex<WalState>>,
    interval: Duration,
    shutdown_rx: Receiver<()>,
    stopped_tx: Sender<Result<()>>,
) {
    let ticker = tick(interval);

    loop {
        select! {
            recv(ticker) -> _ => {
                let mut state = state.lock();
                // A failed handle already reported its error once
                if !state.is_poisoned() {
                    if let Err(e) = state.flush() {
                        error!(error = %e, "background flush failed");
                    }
                }
            }
            recv(shutdown_rx) -> _ => {
                let result = state.lock().flush();
                let _ = stopped_tx.send(result);
                return;
            }
        }
    }
}
