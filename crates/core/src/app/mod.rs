pub mod guardian;
pub mod scheduler;
