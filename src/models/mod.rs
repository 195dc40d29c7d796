pub mod attendance;
pub mod credentials;
pub mod form;
pub mod identity;
pub mod job;
pub mod loaders;
pub mod location;
pub mod schedule;

pub use attendance::{AttendanceAction, AttendanceReceipt, FlowResult, PortalClock, UserInfo};
pub use credentials::Credentials;
pub use form::{FormFields, FormSnapshot, HttpMethod, RawResponse};
pub use identity::{CurrentUser, Role};
pub use job::AttendanceJob;
pub use loaders::{load_all_jobs, load_job};
pub use location::GeoLocation;
pub use schedule::Schedule;
