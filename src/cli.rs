use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Package NW.js applications into OS-native bundles")]
pub struct Args {
    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub sub: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Build bundles for one or more platforms
    Build {
        /// Application directory containing package.json
        #[arg(default_value = ".")]
        path: PathBuf,

        /// NW.js version: latest, stable, 0.14.7, 0.14.7-sdk ...
        #[arg(long, short = 'v', default_value = "latest")]
        version: String,

        /// Comma-separated targets: win32,win64,linux32,linux64,osx32,osx64,osxarm64
        #[arg(long, short = 'p')]
        platforms: Option<String>,

        /// Directory receiving the build directories
        #[arg(long, short = 'o')]
        output_dir: Option<PathBuf>,

        /// Build directory name template ({name}, {version}, {target})
        #[arg(long)]
        output_name: Option<String>,

        /// Bundle / launcher name (defaults to the package name)
        #[arg(long)]
        executable_name: Option<String>,

        /// Replace the runtime codec with the prebuilt full codec
        #[arg(long)]
        with_ffmpeg: bool,

        /// Fail when the runtime has no codec library to replace
        #[arg(long, requires = "with_ffmpeg")]
        strict_codec: bool,

        #[arg(long)]
        side_by_side: bool,

        /// Skip node_modules and run the install command in the bundle
        #[arg(long)]
        production: bool,

        /// macOS icon (.icns)
        #[arg(long)]
        mac_icns: Option<PathBuf>,

        /// Windows icon (.ico)
        #[arg(long)]
        win_ico: Option<PathBuf>,

        /// Runtime download mirror
        #[arg(long)]
        mirror: Option<String>,
    },
    /// Run an application on a scratch copy of the host runtime
    Run {
        /// Arguments passed to the runtime, usually the application directory
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        #[arg(long, short = 'v', default_value = "latest")]
        version: String,

        #[arg(long)]
        with_ffmpeg: bool,

        /// Return after a short settling delay instead of waiting for exit
        #[arg(long)]
        detached: bool,

        #[arg(long)]
        mirror: Option<String>,
    },
}
