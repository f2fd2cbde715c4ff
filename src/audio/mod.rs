pub mod capture;
pub mod wav;

pub use capture::{CaptureFile, CaptureKind, CaptureSummary};
pub use wav::{encode, inspect, ContainerInfo};
