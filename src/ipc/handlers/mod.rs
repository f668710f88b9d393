pub mod attendance;
pub mod auth;
pub mod classes;
pub mod core;
pub mod export;
pub mod recitations;
pub mod students;
