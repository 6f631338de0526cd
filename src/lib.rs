pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod history;
pub mod library;
pub mod logging;
pub mod model;
pub mod queue;
pub mod shell;
pub mod transport;
pub mod ui;

pub use error::{PlayerError, Result};
