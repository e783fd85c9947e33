pub mod args;
pub mod config;
pub mod convert;

pub use args::{Args, Command, USAGE};
pub use config::ConvertConfig;
pub use convert::{convert_world, default_output, verify_output, ConversionReport};
