//! Recipe and build-manifest loading
//!
//! A recipe is one JSON document per package; the build manifest names the
//! run's directories, the ordered package list, and the bundle inputs.
//! String values in both may contain `%{...}` placeholders.

use crate::error::Result;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A step override: a single command or an ordered sequence
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommandSeq {
    One(String),
    Many(Vec<String>),
}

impl CommandSeq {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            CommandSeq::One(command) => vec![command],
            CommandSeq::Many(commands) => commands,
        }
    }
}

/// Declarative description of one buildable package
#[derive(Debug, Clone, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub configure_flags: Vec<String>,
    /// Extra configure flags keyed by profile name
    #[serde(default)]
    pub platform_flags: HashMap<String, Vec<String>>,
    /// Step name → replacement command sequence
    #[serde(default, rename = "override")]
    pub overrides: HashMap<String, CommandSeq>,
    /// Where the unpacked source tree lives, relative to the build root;
    /// defaults to `%{name}-%{version}`
    #[serde(default)]
    pub source_dir: Option<String>,
}

/// Top-level description of a build-and-bundle run
#[derive(Debug, Clone, Deserialize)]
pub struct BuildManifest {
    /// Profile name: `darwin` or `posix`
    pub profile: String,
    pub build_root: PathBuf,
    pub prefix: PathBuf,
    pub skeleton_dir: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub sdk_path: Option<PathBuf>,
    /// Packages in dependency order; order is taken as given
    #[serde(default)]
    pub packages: Vec<String>,
    /// Prefix-relative files seeding the collector's dependency closure
    #[serde(default)]
    pub bundle_from_build: Vec<String>,
    /// Override for the file-collector command template
    #[serde(default)]
    pub collector: Option<String>,
    /// Recipe directory; defaults to `packages/` beside the manifest
    #[serde(default)]
    pub recipe_dir: Option<PathBuf>,
}

impl BuildManifest {
    /// Load a manifest from disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        let manifest: BuildManifest = serde_json::from_str(&contents)?;
        Ok(manifest)
    }

    /// Resolve the recipe directory relative to the manifest location
    pub fn recipe_dir(&self, manifest_path: &Path) -> PathBuf {
        match &self.recipe_dir {
            Some(dir) => dir.clone(),
            None => manifest_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("packages"),
        }
    }
}

/// Load one recipe from `<dir>/<name>.json`
pub fn load_recipe(dir: &Path, name: &str) -> Result<Recipe> {
    let path = dir.join(format!("{}.json", name));
    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read recipe: {}", path.display()))?;
    let recipe: Recipe = serde_json::from_str(&contents)?;
    Ok(recipe)
}

/// Load every recipe the manifest names, preserving its order
pub fn load_recipes(manifest: &BuildManifest, dir: &Path) -> Result<Vec<Recipe>> {
    manifest
        .packages
        .iter()
        .map(|name| load_recipe(dir, name))
        .collect()
}
