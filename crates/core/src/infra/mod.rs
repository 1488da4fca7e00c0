pub mod sqlite_pool;
pub mod sqlite_probe;
pub mod system_clock;
