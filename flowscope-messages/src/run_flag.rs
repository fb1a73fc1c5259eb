use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Run state of a client session: starts running, stops once, never
/// restarts. Cheap to clone; all clones share the same state.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    /// Handle for the server side of the connection.
    pub fn interrupted(&self) -> Interrupted {
        Interrupted(Arc::clone(&self.0))
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Tells a server that its client has gone away.
///
/// Reads only the client's own run state — deliberately not wired to
/// ctrl-c or any other process-level interrupt, which could stop the
/// server before the client has had a chance to clean up.
#[derive(Debug, Clone)]
pub struct Interrupted(Arc<AtomicBool>);

impl Interrupted {
    pub fn is_set(&self) -> bool {
        !self.0.load(Ordering::Relaxed)
    }
}
