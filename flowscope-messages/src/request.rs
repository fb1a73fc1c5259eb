use crate::ControlValue;

/// Requests sent from the client to the simulation server.
///
/// The connection is a strict request/reply pipeline: the client never
/// issues a request before the previous reply arrived.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Read named scalar parameters (e.g. "Nx", "Ny", "cooling").
    Get(Vec<String>),
    /// Read a named 2-D field; "density" is the only field today.
    GetArray(String),
    /// Read the tracer particle positions.
    GetTracers,
    /// Write control parameters, applied idempotently in order.
    Set(Vec<(String, ControlValue)>),
    /// Run a named action: "reset", "reset_tracers", "quit".
    Do(String),
}
