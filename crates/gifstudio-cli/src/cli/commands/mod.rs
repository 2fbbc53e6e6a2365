//! CLI command handlers, one file per command.

mod convert;
mod presets;
mod probe;

pub use convert::{run_convert, ConvertOptions};
pub use presets::run_presets;
pub use probe::run_probe;
