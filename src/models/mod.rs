pub mod job;
pub mod swap;
