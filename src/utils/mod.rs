pub mod cli;
pub mod jwt;
pub mod password;
pub mod state;
pub mod validation;
