//! Bundle assembly: skeleton copy, identity files, dependency collection
//!
//! Turns a skeleton `.app` tree plus an installed prefix into the final
//! distributable bundle. The skeleton's `Contents/Info.plist` supplies the
//! bundle identity; the external file collector fills `Resources` with the
//! runtime dependency closure of the files that came from the build.

use crate::error::{BrauError, Result};
use crate::exec::CommandRunner;
use crate::scope::{ScopeChain, VariableScope};
use crate::template;
use anyhow::Context;
use std::fs;
use std::os::unix::fs as unix_fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Executable name used when the skeleton carries no descriptor
const DEFAULT_EXECUTABLE: &str = "Unknown";

/// Historic collector invocation shape; overridable per manifest
const DEFAULT_COLLECTOR: &str = "mono --debug solitary/Solitary.exe \
     --mono-prefix=\"%{prefix}\" --root=\"%{prefix}\" --out=\"%{resources_dir}\" %{files}";

/// Identity fields read from the skeleton's `Contents/Info.plist`
#[derive(Debug, Clone)]
pub struct BundleDescriptor {
    pub executable: String,
    pub package_type: String,
    pub signature: String,
}

/// The assembled bundle directory set
///
/// `resources_dir` and `macos_dir` always exist after assembly, whether or
/// not the skeleton provided them.
#[derive(Debug, Clone)]
pub struct BundleTree {
    pub output_dir: PathBuf,
    pub app_dir: PathBuf,
    pub contents_dir: PathBuf,
    pub resources_dir: PathBuf,
    pub macos_dir: PathBuf,
}

/// Builds the output `.app` tree from a skeleton and an installed prefix
pub struct BundleAssembler {
    skeleton_dir: PathBuf,
    output_dir: PathBuf,
    prefix: PathBuf,
    from_build: Vec<String>,
    collector: Option<String>,
}

impl BundleAssembler {
    pub fn new(
        skeleton_dir: PathBuf,
        output_dir: PathBuf,
        prefix: PathBuf,
        from_build: Vec<String>,
        collector: Option<String>,
    ) -> Self {
        Self {
            skeleton_dir,
            output_dir,
            prefix,
            from_build,
            collector,
        }
    }

    /// Assemble the bundle; safe to re-run with unchanged inputs
    pub fn assemble(&self, runner: &dyn CommandRunner) -> Result<BundleTree> {
        let plist_path = self.skeleton_dir.join("Contents").join("Info.plist");
        let descriptor = if plist_path.exists() {
            Some(read_descriptor(&plist_path)?)
        } else {
            tracing::warn!(
                "no Contents/Info.plist in bundle skeleton: {}",
                self.skeleton_dir.display()
            );
            None
        };

        let executable = descriptor
            .as_ref()
            .map(|d| d.executable.clone())
            .unwrap_or_else(|| DEFAULT_EXECUTABLE.to_string());

        let app_dir = self.output_dir.join(format!("{}.app", executable));
        let contents_dir = app_dir.join("Contents");
        let resources_dir = contents_dir.join("Resources");
        let macos_dir = contents_dir.join("MacOS");

        // Idempotent rebuild: drop any previous tree, then copy the skeleton
        if app_dir.exists() {
            fs::remove_dir_all(&app_dir)
                .with_context(|| format!("Failed to remove old bundle: {}", app_dir.display()))?;
        }
        fs::create_dir_all(&self.output_dir)?;
        copy_tree(&self.skeleton_dir, &app_dir)?;
        fs::create_dir_all(&contents_dir)?;
        fs::create_dir_all(&resources_dir)?;
        fs::create_dir_all(&macos_dir)?;

        // PkgInfo is only generated when a descriptor was read, and an
        // existing file is never overwritten
        let pkginfo_path = contents_dir.join("PkgInfo");
        if let Some(descriptor) = &descriptor {
            if !pkginfo_path.exists() {
                fs::write(
                    &pkginfo_path,
                    format!("{}{}", descriptor.package_type, descriptor.signature),
                )?;
            }
        }

        self.collect_files(&resources_dir, runner)?;

        Ok(BundleTree {
            output_dir: self.output_dir.clone(),
            app_dir,
            contents_dir,
            resources_dir,
            macos_dir,
        })
    }

    /// Hand the build outputs to the external collector
    ///
    /// The collector resolves each file's runtime dependency closure into
    /// the resources dir. A failing exit is fatal to the bundle run.
    fn collect_files(&self, resources_dir: &Path, runner: &dyn CommandRunner) -> Result<()> {
        if self.from_build.is_empty() {
            tracing::debug!("no build outputs listed for collection; skipping collector");
            return Ok(());
        }

        let files: Vec<String> = self
            .from_build
            .iter()
            .map(|file| format!("\"{}\"", self.prefix.join(file).display()))
            .collect();

        let mut scope = VariableScope::new();
        scope.set("prefix", self.prefix.display().to_string());
        scope.set("resources_dir", resources_dir.display().to_string());
        scope.set("files", files);
        let chain = ScopeChain::new().push(&scope);

        let command = self.collector.as_deref().unwrap_or(DEFAULT_COLLECTOR);
        let script = template::expand(command, &chain)?;

        let output = runner.run(&script, &[], &self.output_dir)?;
        if !output.success() {
            return Err(BrauError::CollectorFailed(output.code));
        }
        Ok(())
    }
}

/// Read the three identity keys from a bundle descriptor
fn read_descriptor(path: &Path) -> Result<BundleDescriptor> {
    let value = plist::Value::from_file(path)?;
    let dict = value
        .as_dictionary()
        .ok_or_else(|| anyhow::anyhow!("Info.plist is not a dictionary: {}", path.display()))?;

    let get = |key: &str| -> Result<String> {
        dict.get(key)
            .and_then(|v| v.as_string())
            .map(str::to_string)
            .ok_or_else(|| {
                BrauError::Other(anyhow::anyhow!(
                    "Info.plist missing string key {}: {}",
                    key,
                    path.display()
                ))
            })
    };

    Ok(BundleDescriptor {
        executable: get("CFBundleExecutable")?,
        package_type: get("CFBundlePackageType")?,
        signature: get("CFBundleSignature")?,
    })
}

/// Copy a directory tree, preserving symlinks as symlinks
fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(anyhow::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(anyhow::Error::from)?;
        let target = dst.join(relative);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path())?;
            unix_fs::symlink(link, &target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Failed to copy skeleton file: {}", entry.path().display())
            })?;
        }
    }
    Ok(())
}

/// Generate the pango module registry and its companion config file
///
/// Skipped with a warning when `bin/pango-querymodules` is absent under the
/// prefix. Output lines rooted at the prefix are rewritten prefix-relative
/// so the registry stays valid inside the relocated bundle.
pub fn write_module_registry(
    prefix: &Path,
    resources_dir: &Path,
    runner: &dyn CommandRunner,
) -> Result<()> {
    let querymodules = prefix.join("bin").join("pango-querymodules");
    if !querymodules.is_file() {
        tracing::warn!(
            "pango-querymodules not found under {}; skipping module registry",
            prefix.display()
        );
        return Ok(());
    }

    let output = runner.run(&format!("\"{}\"", querymodules.display()), &[], prefix)?;
    if !output.success() {
        return Err(BrauError::Other(anyhow::anyhow!(
            "pango-querymodules exited with status {}",
            output.code
        )));
    }

    let pango_dir = resources_dir.join("etc").join("pango");
    fs::create_dir_all(&pango_dir)?;

    fs::write(
        pango_dir.join("pango.modules"),
        rewrite_module_lines(&output.stdout, prefix),
    )?;
    fs::write(pango_dir.join("pangorc"), "[Pango]\nModulesPath=./pango.modules\n")?;

    Ok(())
}

/// Drop comment lines and make prefix-rooted module paths prefix-relative
fn rewrite_module_lines(stdout: &str, prefix: &Path) -> String {
    let prefix = prefix.display().to_string();
    let mut out = String::new();

    for line in stdout.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = match line.strip_prefix(&prefix) {
            Some(rest) => rest.strip_prefix('/').unwrap_or(rest),
            None => line,
        };
        out.push_str(line);
        out.push('\n');
    }

    out
}
