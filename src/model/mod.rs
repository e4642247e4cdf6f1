pub mod attendance;
pub mod evaluation;
pub mod holiday;
pub mod period;
pub mod role;
pub mod user;
