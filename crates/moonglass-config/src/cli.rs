//! Command-line argument parsing for the moonglass viewer.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Moonglass command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "moonglass", about = "Analytic textured-sphere viewer")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Texture URL or path for the sphere.
    #[arg(long)]
    pub texture: Option<String>,

    /// Treat the texture as non-power-of-two (clamped, no mipmaps).
    #[arg(long)]
    pub npot: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Render one frame on the CPU into this PNG and exit.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(fs) = args.fullscreen {
            self.window.fullscreen = fs;
        }
        if let Some(ref texture) = args.texture {
            self.sphere.texture = Some(texture.clone());
        }
        if let Some(npot) = args.npot {
            self.sphere.non_power_of_two = npot;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
