pub mod analyze;
pub mod config;
pub mod detect;
pub mod transcribe;
