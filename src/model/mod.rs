pub mod attendance;
pub mod person;
