//! # Execution Engine
//!
//! Every request, whatever transport it arrived on, is admitted into one
//! bounded FIFO queue and executed by one dedicated worker thread. Handlers
//! therefore never run concurrently, and a read issued after a write from
//! another connection always observes that write.
//!
//! ```text
//! TCP conn ─┐
//! TLS conn ─┼─► mpsc queue (FIFO) ─► worker thread ─► oneshot reply ─► conn
//! RTU port ─┘
//! ```
//!
//! The worker exits once every [`Submitter`] is gone and the queue is empty,
//! so in-flight requests always complete before [`Engine::drain`] returns.
//! A panicking handler is answered with `ServerDeviceFailure`; the worker
//! keeps running.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::constants::REQUEST_QUEUE_CAPACITY;
use crate::error::{ModbusError, ModbusResult};
use crate::frame::Frame;
use crate::protocol::ModbusException;

/// A queued request and the channel its response goes back on
struct Job {
    request: Frame,
    reply: oneshot::Sender<Frame>,
}

/// Cloneable handle for admitting requests into the queue.
#[derive(Debug, Clone)]
pub struct Submitter {
    queue: mpsc::Sender<Job>,
}

impl Submitter {
    /// Queue a request and wait for the worker's response.
    ///
    /// # Errors
    ///
    /// [`ModbusError::ServerClosed`] when the worker has already stopped.
    pub async fn submit(&self, request: Frame) -> ModbusResult<Frame> {
        let (reply, response) = oneshot::channel();
        self.queue
            .send(Job { request, reply })
            .await
            .map_err(|_| ModbusError::ServerClosed)?;
        response
            .await
            .map_err(|_| ModbusError::engine("worker dropped request without a response"))
    }
}

/// Owner of the admission queue and its worker thread
#[derive(Debug)]
pub struct Engine {
    queue: Option<mpsc::Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl Engine {
    /// Spawn the worker thread around `handler`.
    ///
    /// `handler` turns a request into its response; it is only ever called
    /// from the worker, one request at a time.
    pub fn start<H>(handler: H) -> ModbusResult<Self>
    where
        H: Fn(&Frame) -> Frame + Send + 'static,
    {
        let (queue, mut jobs) = mpsc::channel::<Job>(REQUEST_QUEUE_CAPACITY);

        let worker = thread::Builder::new()
            .name("modbus-engine".into())
            .spawn(move || {
                debug!("Engine worker started");
                while let Some(Job { request, reply }) = jobs.blocking_recv() {
                    let response = panic::catch_unwind(AssertUnwindSafe(|| handler(&request)))
                        .unwrap_or_else(|payload| {
                            error!(
                                "Handler for slave {} FC={:02X} panicked: {}",
                                request.slave_id,
                                request.function,
                                panic_message(payload.as_ref())
                            );
                            let mut failure = request.response();
                            failure.set_exception(ModbusException::ServerDeviceFailure);
                            failure
                        });
                    if reply.send(response).is_err() {
                        debug!(
                            "Requester for slave {} FC={:02X} went away before the response",
                            request.slave_id, request.function
                        );
                    }
                }
                debug!("Engine worker stopped");
            })?;

        Ok(Self {
            queue: Some(queue),
            worker: Some(worker),
        })
    }

    /// New handle onto the queue, `None` once draining has begun
    pub fn submitter(&self) -> Option<Submitter> {
        self.queue.as_ref().map(|queue| Submitter {
            queue: queue.clone(),
        })
    }

    /// Stop admitting new work and wait for the worker to finish the queue.
    ///
    /// Returns once every outstanding [`Submitter`] has been dropped and all
    /// queued requests have been answered.
    pub async fn drain(&mut self) -> ModbusResult<()> {
        drop(self.queue.take());

        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        tokio::task::spawn_blocking(move || worker.join())
            .await
            .map_err(|e| ModbusError::engine(format!("join task failed: {}", e)))?
            .map_err(|_| {
                warn!("Engine worker panicked");
                ModbusError::engine("worker thread panicked")
            })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
