pub mod auth;
pub mod read_only;
