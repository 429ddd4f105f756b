pub mod inference;
pub mod job_store;
pub mod mask;
pub mod orchestrator;
pub mod storage;
pub mod sweep;
