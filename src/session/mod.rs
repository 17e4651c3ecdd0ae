// src/session/mod.rs

//! The proctored test session: countdown, focus monitoring, answer
//! collection and the controller that decides when to submit.

pub mod controller;
pub mod ledger;
pub mod monitor;
pub mod timer;
pub mod view;

pub use controller::{SessionController, SessionSettings, SessionState};
pub use monitor::FocusSignal;
pub use view::{Notice, SessionStatus, SessionView};
