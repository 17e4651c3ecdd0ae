// src/lib.rs

pub mod config;
pub mod console;
pub mod error;
pub mod models;
pub mod portal;
pub mod runner;
pub mod session;

// Re-export specific items for convenience if needed
pub use runner::spawn_session;
pub use session::SessionController;
