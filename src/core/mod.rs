pub mod analyzer;
pub mod classifier;
pub mod control;
pub mod details;
pub mod events;
pub mod mime;
pub mod progress;
pub mod recovery;
pub mod scanner;
pub mod session;
pub mod signatures;
pub mod volumes;
