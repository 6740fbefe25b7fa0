//! Command implementations.

mod ask;
mod courses;
mod doctor;
mod ingest;

pub use ask::run_ask;
pub use courses::run_courses;
pub use doctor::run_doctor;
pub use ingest::run_ingest;
