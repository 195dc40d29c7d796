pub mod attendance_flow;
pub mod flow_ctx;

pub use attendance_flow::{AttendanceFlow, FlowState};
pub use flow_ctx::FlowCtx;
