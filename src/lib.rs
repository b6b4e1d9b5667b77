pub mod client;
pub mod composition;
pub mod config;
pub mod fs;
pub mod storage;
pub mod wrapper;
