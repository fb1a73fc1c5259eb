use std::collections::HashMap;

use crate::{ControlValue, DensityFrame, TracerFrame};

/// Replies sent from the simulation server back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Answer to `Request::Get`.
    Values(HashMap<String, ControlValue>),
    /// Answer to `Request::GetArray`.
    Array(DensityFrame),
    /// Answer to `Request::GetTracers`.
    Tracers(TracerFrame),
    /// Acknowledgement for `Set` and `Do`.
    Ok,
    /// The server could not serve the request.
    Error(String),
}
