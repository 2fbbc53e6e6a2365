pub mod config;
pub mod logging;

pub mod checksum;
pub mod controller;
pub mod intake;
pub mod preview;
pub mod result;
pub mod session;
pub mod settings;

pub use session::Studio;
