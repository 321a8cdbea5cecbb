//! NW.js application bundler
//!
//! Packages an application source tree together with a downloaded NW.js
//! runtime into a branded, OS-native bundle, or launches the application on
//! a scratch copy of the host runtime.

pub mod config;
pub mod error;
pub mod fs_ops;
pub mod manifest;
pub mod orchestrator;
pub mod pipeline;
pub mod provider;
pub mod run;
pub mod target;

// Public exports
pub use config::{BuilderConfig, CodecPolicy};
pub use error::{BuildError, BuildResult};
pub use manifest::Manifest;
pub use orchestrator::{BuildReport, BuildRequest, Builder};
pub use pipeline::{BuildJob, BuildOptions, BuildOutput, BuildPipeline, PlatformProfile};
pub use provider::{HttpMirror, VersionSpec};
pub use run::{RunOutcome, RunPipeline, RunRequest};
pub use target::{Arch, Platform, Target};
