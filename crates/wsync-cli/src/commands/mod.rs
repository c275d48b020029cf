//! Command implementations for wsync-cli

pub mod doctor;
pub mod watch;

pub use doctor::run_doctor;
pub use watch::run_watch;
