use brau::darwin::DarwinProfile;
use brau::error::Result;
use brau::exec::{CommandRunner, ShellRunner};
use brau::package::{Package, Step};
use brau::profile::{BundleDirs, Bundler, Profile};
use brau::recipe::{self, BuildManifest};
use brau::{progress, BrauError};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "brau")]
#[command(author, version, about = "Recipe-driven build orchestrator and macOS app bundler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every package in the manifest, then assemble the bundle
    Build {
        /// Path to the build manifest (JSON)
        manifest: PathBuf,

        /// Stop after the install phase; skip bundle assembly
        #[arg(long)]
        no_bundle: bool,
    },

    /// Assemble the bundle from an already-populated prefix
    Bundle {
        /// Path to the build manifest (JSON)
        manifest: PathBuf,
    },

    /// Show the packages and step sequences a manifest would run
    Show {
        /// Path to the build manifest (JSON)
        manifest: PathBuf,
    },
}

/// The profile variant selected by the manifest
///
/// Packages build against the common [`Profile`]; bundling dispatches to
/// the platform's [`Bundler`] implementation.
enum ActiveProfile {
    Posix(Profile),
    Darwin(DarwinProfile),
}

impl ActiveProfile {
    fn from_manifest(manifest: &BuildManifest) -> Result<Self> {
        let dirs = BundleDirs {
            skeleton_dir: manifest.skeleton_dir.clone(),
            output_dir: manifest.output_dir.clone(),
        };

        match manifest.profile.as_str() {
            "darwin" => {
                let mut darwin = DarwinProfile::new(
                    manifest.prefix.clone(),
                    manifest.build_root.clone(),
                    dirs,
                    manifest.sdk_path.clone(),
                )?;
                darwin.profile_mut().bundle_from_build = manifest.bundle_from_build.clone();
                darwin.profile_mut().collector = manifest.collector.clone();
                Ok(ActiveProfile::Darwin(darwin))
            }
            "posix" => {
                let mut profile =
                    Profile::posix(manifest.prefix.clone(), manifest.build_root.clone(), dirs);
                profile.bundle_from_build = manifest.bundle_from_build.clone();
                profile.collector = manifest.collector.clone();
                Ok(ActiveProfile::Posix(profile))
            }
            other => Err(BrauError::Other(anyhow::anyhow!(
                "unknown profile: {} (expected darwin or posix)",
                other
            ))),
        }
    }

    fn profile(&self) -> &Profile {
        match self {
            ActiveProfile::Posix(profile) => profile,
            ActiveProfile::Darwin(darwin) => darwin.profile(),
        }
    }

    fn bundler(&self) -> &dyn Bundler {
        match self {
            ActiveProfile::Posix(profile) => profile,
            ActiveProfile::Darwin(darwin) => darwin,
        }
    }
}

fn build(manifest_path: &Path, bundle_after: bool) -> Result<()> {
    let manifest = BuildManifest::load(manifest_path)?;
    let recipe_dir = manifest.recipe_dir(manifest_path);
    let recipes = recipe::load_recipes(&manifest, &recipe_dir)?;
    let active = ActiveProfile::from_manifest(&manifest)?;
    let runner = ShellRunner;

    fs::create_dir_all(&manifest.build_root)?;
    fs::create_dir_all(&manifest.prefix)?;

    for recipe in recipes {
        let mut package = Package::from_recipe(recipe);
        println!(
            "{} {} {}",
            "==>".cyan().bold(),
            package.name.bold(),
            package.version
        );

        for step in Step::ALL {
            let spinner =
                progress::step_spinner(format!("{}: {}", package.name, step.name()));
            let result = package.run_step(step, active.profile(), &runner);
            spinner.finish_and_clear();
            result?;
            println!("    {} {}", "✓".green(), step.name());
        }
    }

    if bundle_after {
        assemble(&active, &runner, &manifest.output_dir)?;
    }

    Ok(())
}

fn bundle_only(manifest_path: &Path) -> Result<()> {
    let manifest = BuildManifest::load(manifest_path)?;
    let active = ActiveProfile::from_manifest(&manifest)?;
    assemble(&active, &ShellRunner, &manifest.output_dir)
}

fn assemble(active: &ActiveProfile, runner: &dyn CommandRunner, output_dir: &Path) -> Result<()> {
    println!("{} assembling bundle", "==>".cyan().bold());
    active.bundler().bundle(runner)?;
    println!(
        "{} bundle written to {}",
        "✓".green(),
        output_dir.display()
    );
    Ok(())
}

fn show(manifest_path: &Path) -> Result<()> {
    let manifest = BuildManifest::load(manifest_path)?;
    let recipe_dir = manifest.recipe_dir(manifest_path);
    let recipes = recipe::load_recipes(&manifest, &recipe_dir)?;

    println!(
        "{} profile, {} package(s)",
        manifest.profile.bold(),
        recipes.len()
    );
    for recipe in recipes {
        println!("{} {} {}", "==>".cyan().bold(), recipe.name.bold(), recipe.version);
        for source in &recipe.sources {
            println!("    source: {}", source);
        }
        if !recipe.configure_flags.is_empty() {
            println!("    flags: {}", recipe.configure_flags.join(" "));
        }
        for step in recipe.overrides.keys() {
            println!("    override: {}", step.yellow());
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", default_level);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Build { manifest, no_bundle } => {
            build(&manifest, !no_bundle)?;
        }
        Commands::Bundle { manifest } => {
            bundle_only(&manifest)?;
        }
        Commands::Show { manifest } => {
            show(&manifest)?;
        }
    }

    Ok(())
}
