pub mod auth;
pub mod file;
pub mod fs;
pub mod sync;
pub mod user;
