//! Device and attendance ingress.

pub mod handlers;
pub mod types;

pub use handlers::{attendance, device_status};
pub use types::{AttendanceRequest, BroadcastResponse, DeviceStatusRequest, UserRef};
