mod frame;
mod reply;
mod request;
mod run_flag;
mod units;
mod value;

pub use frame::{DensityFrame, TracerFrame};
pub use reply::Reply;
pub use request::Request;
pub use run_flag::{Interrupted, RunFlag};
pub use units::FrameRate;
pub use value::ControlValue;
