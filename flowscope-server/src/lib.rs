//! In-process simulation backend for flowscope.
//!
//! Answers the client's request/reply protocol over a flume channel
//! pair and keeps a toy fluid field stepping in between requests. A
//! real deployment would put a network transport here instead; the
//! protocol surface is the same.

mod sim;

pub use sim::FluidSim;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, warn};

use flowscope_messages::{Interrupted, Reply, Request};

/// How long the request loop waits before taking a simulation step
/// anyway.
const STEP_INTERVAL: Duration = Duration::from_millis(10);

/// The simulation server: one connection, one simulation.
pub struct Server {
    request_rx: Receiver<Request>,
    reply_tx: Sender<Reply>,
    sim: FluidSim,
    interrupted: Option<Interrupted>,
    should_exit: bool,
}

impl Server {
    pub fn new(request_rx: Receiver<Request>, reply_tx: Sender<Reply>, sim: FluidSim) -> Self {
        Self {
            request_rx,
            reply_tx,
            sim,
            interrupted: None,
            should_exit: false,
        }
    }

    /// Let the server notice when its client has gone away.
    pub fn with_interrupted(mut self, interrupted: Interrupted) -> Self {
        self.interrupted = Some(interrupted);
        self
    }

    /// Run the request loop (blocking) until a quit action, a client
    /// disconnect, or the interruption flag.
    pub fn run(mut self) -> Result<()> {
        info!(
            "simulation server running on a {}x{} grid",
            self.sim.nx(),
            self.sim.ny()
        );
        let mut last_step = Instant::now();
        while !self.should_exit {
            match self.request_rx.recv_timeout(STEP_INTERVAL) {
                Ok(request) => {
                    let reply = self.handle_request(request);
                    if self.reply_tx.send(reply).is_err() {
                        debug!("client reply channel closed");
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("client request channel closed");
                    break;
                }
            }
            if self.interrupted.as_ref().is_some_and(|flag| flag.is_set()) {
                debug!("client interrupted, shutting down");
                break;
            }
            let dt = last_step.elapsed();
            last_step = Instant::now();
            self.sim.step(dt.as_secs_f64());
        }
        info!("simulation server stopped");
        Ok(())
    }

    fn handle_request(&mut self, request: Request) -> Reply {
        match request {
            Request::Get(keys) => {
                let mut values = HashMap::new();
                for key in keys {
                    match self.sim.get_param(&key) {
                        Some(value) => {
                            values.insert(key, value);
                        }
                        None => return Reply::Error(format!("unknown parameter {key}")),
                    }
                }
                Reply::Values(values)
            }
            Request::GetArray(name) => match name.as_str() {
                "density" => Reply::Array(self.sim.density()),
                other => Reply::Error(format!("unknown array {other}")),
            },
            Request::GetTracers => Reply::Tracers(self.sim.tracers()),
            Request::Set(values) => {
                for (name, value) in &values {
                    if !self.sim.set_param(name, value) {
                        warn!("ignoring unknown parameter {name}");
                    }
                }
                Reply::Ok
            }
            Request::Do(action) => match action.as_str() {
                "reset" => {
                    self.sim.reset();
                    Reply::Ok
                }
                "reset_tracers" => {
                    self.sim.reset_tracers();
                    Reply::Ok
                }
                "quit" => {
                    debug!("client asked us to quit");
                    self.should_exit = true;
                    Reply::Ok
                }
                other => Reply::Error(format!("unknown action {other}")),
            },
        }
    }
}
