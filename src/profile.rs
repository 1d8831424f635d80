//! Platform profiles: toolchain environment, flag lists, bundle layout
//!
//! A profile carries everything the package lifecycle needs beyond the
//! recipe itself: the environment overlay applied to step invocations, the
//! compiler/linker flag lists, and the directories the bundler works with.
//! Platform specializations (see `darwin.rs`) append flags and override
//! toolchain bindings; they never remove base entries.

use crate::error::Result;
use crate::exec::CommandRunner;
use crate::scope::VariableScope;
use std::path::PathBuf;

/// Environment-variable overlay consumed by every step invocation
///
/// Mutated only through explicit `set` calls; insertion order is preserved
/// so the child environment is deterministic.
#[derive(Debug, Clone, Default)]
pub struct EnvOverlay {
    vars: Vec<(String, String)>,
}

impl EnvOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a variable, replacing any previous binding of the same name
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.vars.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.vars
    }

    /// Expose the overlay as a nested scope (`%{env.CC}`)
    pub fn to_scope(&self) -> VariableScope {
        let mut scope = VariableScope::new();
        for (name, value) in &self.vars {
            scope.set(name.clone(), value.clone());
        }
        scope
    }
}

/// Bundle input/output directories
///
/// Only the skeleton and output roots are settable; the app, contents,
/// resources, and executable dirs are derived during assembly.
#[derive(Debug, Clone)]
pub struct BundleDirs {
    pub skeleton_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Platform configuration for a build-and-bundle run
///
/// Constructed once per run. [`Profile::posix`] gives the POSIX-toolchain
/// baseline; `DarwinProfile` builds on top of it.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub prefix: PathBuf,
    pub build_root: PathBuf,
    pub env: EnvOverlay,
    pub cc_flags: Vec<String>,
    pub ld_flags: Vec<String>,
    pub dirs: BundleDirs,
    /// Prefix-relative files handed to the file collector at bundle time
    pub bundle_from_build: Vec<String>,
    /// Override for the file-collector command template
    pub collector: Option<String>,
    /// Platform-specific additions to the template scope (`%{sdk_path}`)
    pub extra_vars: Vec<(String, String)>,
}

impl Profile {
    /// Baseline profile for POSIX-style autoconf toolchains
    pub fn posix(prefix: PathBuf, build_root: PathBuf, dirs: BundleDirs) -> Self {
        Self {
            name: "posix".to_string(),
            prefix,
            build_root,
            env: EnvOverlay::new(),
            cc_flags: vec!["-O2".to_string()],
            ld_flags: Vec::new(),
            dirs,
            bundle_from_build: Vec::new(),
            collector: None,
            extra_vars: Vec::new(),
        }
    }

    /// The profile's contribution to the template scope
    ///
    /// Packages chain their own scope in front of this one, so every
    /// profile field a step command may reference is bound here.
    pub fn scope(&self) -> VariableScope {
        let mut scope = VariableScope::new();
        scope.set("name", self.name.clone());
        scope.set("prefix", self.prefix.display().to_string());
        scope.set("build_root", self.build_root.display().to_string());
        scope.set("skeleton_dir", self.dirs.skeleton_dir.display().to_string());
        scope.set("output_dir", self.dirs.output_dir.display().to_string());
        scope.set("cc_flags", self.cc_flags.clone());
        scope.set("ld_flags", self.ld_flags.clone());
        scope.set("env", self.env.to_scope());
        for (name, value) in &self.extra_vars {
            scope.set(name.clone(), value.clone());
        }
        scope.set("__configure", "./configure --prefix=\"%{prefix}\"");
        scope.set("__make", "make");
        scope.set("__makeinstall", "make install");
        scope
    }

    /// Environment pairs for a step invocation, before templating
    ///
    /// CFLAGS/LDFLAGS are derived from the flag lists; explicit overlay
    /// bindings follow so a profile may still override them.
    pub fn step_env(&self) -> Vec<(String, String)> {
        let mut env = Vec::with_capacity(self.env.pairs().len() + 2);
        if !self.cc_flags.is_empty() {
            env.push(("CFLAGS".to_string(), self.cc_flags.join(" ")));
        }
        if !self.ld_flags.is_empty() {
            env.push(("LDFLAGS".to_string(), self.ld_flags.join(" ")));
        }
        for (name, value) in self.env.pairs() {
            match env.iter_mut().find(|(n, _)| n == name) {
                Some(entry) => entry.1 = value.clone(),
                None => env.push((name.clone(), value.clone())),
            }
        }
        env
    }
}

/// Bundling capability hook, selected at profile-construction time
///
/// The base implementation has no native bundle format and skips the phase;
/// platform profiles with one (Darwin) replace it.
pub trait Bundler {
    fn bundle(&self, runner: &dyn CommandRunner) -> Result<()> {
        let _ = runner;
        tracing::info!("profile has no bundle format; skipping bundle phase");
        Ok(())
    }
}

impl Bundler for Profile {}
