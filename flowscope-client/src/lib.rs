//! Client core for flowscope: the frame-pacing and server-sync loop.
//!
//! A [`Session`] pulls density frames from a [`ServerProxy`] one at a
//! time, paces itself to a user-set frame rate, hands pixels to a
//! [`DensityDisplay`], and routes control input back to the server.
//! The host environment is abstracted behind [`HostPump`] (cooperative
//! scheduler turns) and [`FrameHost`] (per-frame callbacks), so the
//! core never links a GUI toolkit.

pub mod budget;
pub mod controls;
pub mod display;
pub mod pacing;
pub mod proxy;
pub mod render;
pub mod session;

pub use budget::FrameBudget;
pub use controls::PointerTracker;
pub use display::{DensityDisplay, NullDisplay};
pub use pacing::{FramePacer, HostPump, IdlePump};
pub use proxy::{ChannelProxy, ServerProxy};
pub use render::RgbaImage;
pub use session::{DriveMode, FrameHost, GridSize, Session, SessionConfig};
