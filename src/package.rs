//! Package lifecycle: defined → prepped → configured → built → installed
//!
//! Each step has a default command sequence that a recipe may replace
//! outright via its `override` table. Every command is templated against
//! the package scope chained onto the active profile scope before it
//! reaches the shell. The first failing command aborts the package.

use crate::error::{BrauError, Result};
use crate::exec::CommandRunner;
use crate::profile::Profile;
use crate::recipe::Recipe;
use crate::scope::{ScopeChain, VariableScope};
use crate::template;
use std::collections::HashMap;
use std::path::PathBuf;

/// One lifecycle step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Prep,
    Configure,
    Build,
    Install,
}

impl Step {
    /// Execution order of the lifecycle
    pub const ALL: [Step; 4] = [Step::Prep, Step::Configure, Step::Build, Step::Install];

    pub fn name(self) -> &'static str {
        match self {
            Step::Prep => "prep",
            Step::Configure => "configure",
            Step::Build => "build",
            Step::Install => "install",
        }
    }

    fn completed_state(self) -> LifecycleState {
        match self {
            Step::Prep => LifecycleState::Prepped,
            Step::Configure => LifecycleState::Configured,
            Step::Build => LifecycleState::Built,
            Step::Install => LifecycleState::Installed,
        }
    }
}

/// Lifecycle position of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Defined,
    Prepped,
    Configured,
    Built,
    Installed,
}

/// A buildable unit: recipe fields plus lifecycle state
///
/// Immutable after construction except for the lifecycle state.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub version: String,
    pub sources: Vec<String>,
    pub configure_flags: Vec<String>,
    pub platform_flags: HashMap<String, Vec<String>>,
    overrides: HashMap<String, Vec<String>>,
    source_dir: Option<String>,
    state: LifecycleState,
}

impl Package {
    pub fn from_recipe(recipe: Recipe) -> Self {
        Self {
            name: recipe.name,
            version: recipe.version,
            sources: recipe.sources,
            configure_flags: recipe.configure_flags,
            platform_flags: recipe.platform_flags,
            overrides: recipe
                .overrides
                .into_iter()
                .map(|(step, seq)| (step, seq.into_vec()))
                .collect(),
            source_dir: recipe.source_dir,
            state: LifecycleState::Defined,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Configure flags plus the active profile's conditional additions
    ///
    /// Computed once per step from the profile's identity, not per command.
    fn effective_configure_flags(&self, profile: &Profile) -> Vec<String> {
        let mut flags = self.configure_flags.clone();
        if let Some(extra) = self.platform_flags.get(&profile.name) {
            flags.extend(extra.iter().cloned());
        }
        flags
    }

    /// The package's contribution to the template scope
    fn scope(&self, profile: &Profile) -> VariableScope {
        let mut scope = VariableScope::new();
        scope.set("name", self.name.clone());
        scope.set("version", self.version.clone());
        scope.set("sources", self.sources.clone());
        scope.set("configure_flags", self.effective_configure_flags(profile));
        scope.set(
            "source_dir",
            self.source_dir
                .clone()
                .unwrap_or_else(|| "%{build_root}/%{name}-%{version}".to_string()),
        );
        scope
    }

    /// The command sequence for a step: recipe override or the default
    ///
    /// An override replaces the default sequence entirely.
    fn commands_for(&self, step: Step) -> Vec<String> {
        if let Some(commands) = self.overrides.get(step.name()) {
            return commands.clone();
        }

        match step {
            Step::Prep => {
                if self.sources.is_empty() {
                    Vec::new()
                } else {
                    vec!["tar xf \"%{sources[0]}\"".to_string()]
                }
            }
            Step::Configure => vec!["%{__configure} %{configure_flags}".to_string()],
            Step::Build => vec!["%{__make}".to_string()],
            Step::Install => vec!["%{__makeinstall}".to_string()],
        }
    }

    /// Run a single lifecycle step through the profile's environment
    pub fn run_step(
        &mut self,
        step: Step,
        profile: &Profile,
        runner: &dyn CommandRunner,
    ) -> Result<()> {
        let package_scope = self.scope(profile);
        let profile_scope = profile.scope();
        let chain = ScopeChain::new().push(&package_scope).push(&profile_scope);

        let mut env = Vec::new();
        for (name, value) in profile.step_env() {
            env.push((name, template::expand(&value, &chain)?));
        }

        // Prep unpacks into the build root; later steps run in the source tree
        let cwd = match step {
            Step::Prep => profile.build_root.clone(),
            _ => PathBuf::from(template::expand("%{source_dir}", &chain)?),
        };

        for command in self.commands_for(step) {
            let script = template::expand(&command, &chain)?;
            tracing::debug!(
                "{}: {} step: {}",
                self.name,
                step.name(),
                script
            );
            let output = runner.run(&script, &env, &cwd)?;
            if !output.success() {
                return Err(BrauError::StepExecution {
                    package: self.name.clone(),
                    step: step.name().to_string(),
                    code: output.code,
                });
            }
        }

        self.state = step.completed_state();
        Ok(())
    }

    /// Run the full lifecycle in order, fail-fast
    pub fn run(&mut self, profile: &Profile, runner: &dyn CommandRunner) -> Result<()> {
        for step in Step::ALL {
            self.run_step(step, profile, runner)?;
        }
        Ok(())
    }
}
