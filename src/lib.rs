//! Library interface for brau, the recipe-driven build orchestrator
//!
//! Exposes the core pipeline for integration testing: template resolution,
//! profiles, the package lifecycle, and bundle assembly.

pub mod bundle;
pub mod darwin;
pub mod error;
pub mod exec;
pub mod package;
pub mod profile;
pub mod progress;
pub mod recipe;
pub mod scope;
pub mod template;

pub use error::{BrauError, Result};
pub use exec::{CommandOutput, CommandRunner, ShellRunner};
pub use profile::{Bundler, Profile};
