use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use flume::{Receiver, RecvTimeoutError, Sender};

use flowscope_messages::{ControlValue, DensityFrame, Reply, Request, TracerFrame};

/// How long a single roundtrip may take before the server counts as gone.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Blocking view of the simulation server.
///
/// All calls may block on the connection. Read failures (`get`,
/// `get_array`, `get_tracers`) are fatal to a session; write failures
/// (`set`, `do_action`) are the caller's to log and shrug off — losing
/// one control update is recoverable, losing the video stream is not.
/// The connection is single-lane: callers must never overlap requests.
pub trait ServerProxy {
    /// Read named scalar parameters.
    fn get(&mut self, keys: &[&str]) -> Result<HashMap<String, ControlValue>>;

    /// Read a named 2-D field.
    fn get_array(&mut self, name: &str) -> Result<DensityFrame>;

    /// Read the tracer particle positions.
    fn get_tracers(&mut self) -> Result<TracerFrame>;

    /// Write control parameters. Fire-and-forget for the caller.
    fn set(&mut self, values: Vec<(String, ControlValue)>) -> Result<()>;

    /// Run a named server action ("reset", "reset_tracers", "quit").
    fn do_action(&mut self, action: &str) -> Result<()>;
}

/// `ServerProxy` over a flume request/reply channel pair.
pub struct ChannelProxy {
    request_tx: Sender<Request>,
    reply_rx: Receiver<Reply>,
    timeout: Duration,
}

impl ChannelProxy {
    pub fn new(request_tx: Sender<Request>, reply_rx: Receiver<Reply>) -> Self {
        Self {
            request_tx,
            reply_rx,
            timeout: REQUEST_TIMEOUT,
        }
    }

    fn roundtrip(&mut self, request: Request) -> Result<Reply> {
        self.request_tx
            .send(request)
            .map_err(|_| anyhow!("server connection closed"))?;
        match self.reply_rx.recv_timeout(self.timeout) {
            Ok(Reply::Error(msg)) => bail!("server refused request: {msg}"),
            Ok(reply) => Ok(reply),
            Err(RecvTimeoutError::Timeout) => {
                bail!("server did not reply within {:?}", self.timeout)
            }
            Err(RecvTimeoutError::Disconnected) => bail!("server connection closed"),
        }
    }
}

impl ServerProxy for ChannelProxy {
    fn get(&mut self, keys: &[&str]) -> Result<HashMap<String, ControlValue>> {
        let keys = keys.iter().map(|k| k.to_string()).collect();
        match self.roundtrip(Request::Get(keys))? {
            Reply::Values(values) => Ok(values),
            reply => bail!("unexpected reply to get: {reply:?}"),
        }
    }

    fn get_array(&mut self, name: &str) -> Result<DensityFrame> {
        match self.roundtrip(Request::GetArray(name.to_string()))? {
            Reply::Array(frame) => Ok(frame),
            reply => bail!("unexpected reply to get_array: {reply:?}"),
        }
    }

    fn get_tracers(&mut self) -> Result<TracerFrame> {
        match self.roundtrip(Request::GetTracers)? {
            Reply::Tracers(tracers) => Ok(tracers),
            reply => bail!("unexpected reply to get_tracers: {reply:?}"),
        }
    }

    fn set(&mut self, values: Vec<(String, ControlValue)>) -> Result<()> {
        match self.roundtrip(Request::Set(values))? {
            Reply::Ok => Ok(()),
            reply => bail!("unexpected reply to set: {reply:?}"),
        }
    }

    fn do_action(&mut self, action: &str) -> Result<()> {
        match self.roundtrip(Request::Do(action.to_string()))? {
            Reply::Ok => Ok(()),
            reply => bail!("unexpected reply to do: {reply:?}"),
        }
    }
}
