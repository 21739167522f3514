//! Configuration for the moonglass viewer.
//!
//! Settings persist to disk as a RON file, can be overridden from the
//! command line via clap, and support hot-reload detection. Unknown and
//! missing fields are tolerated so older and newer files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CONFIG_FILE, CameraConfig, Config, DebugConfig, SphereConfig, WindowConfig};
pub use error::ConfigError;
