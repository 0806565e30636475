pub mod models;
pub mod services;
pub mod scheduler;

pub use models::*;
pub use services::*;
pub use scheduler::Scheduler;
