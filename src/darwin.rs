//! Darwin (macOS) profile specialization
//!
//! Adds the SDK sysroot and architecture flags to the POSIX baseline,
//! rebinds the toolchain to clang, and implements the `.app` bundling hook.

use crate::bundle::{self, BundleAssembler};
use crate::error::{BrauError, Result};
use crate::exec::CommandRunner;
use crate::profile::{BundleDirs, Bundler, Profile};
use std::path::PathBuf;

/// Fallback SDK location when the manifest names none
const DEFAULT_SDK_PATH: &str = "/Library/Developer/CommandLineTools/SDKs/MacOSX.sdk";

/// Lowest macOS version the produced binaries target
const MACOSX_VERSION_MIN: &str = "11.0";

/// Architecture flag shared by the compiler and linker flag lists
fn arch_flag() -> Option<String> {
    #[cfg(target_arch = "aarch64")]
    {
        Some("-arch arm64".to_string())
    }
    #[cfg(target_arch = "x86_64")]
    {
        Some("-arch x86_64".to_string())
    }
    #[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
    {
        None
    }
}

/// POSIX profile specialized for macOS `.app` bundling
#[derive(Debug, Clone)]
pub struct DarwinProfile {
    base: Profile,
    sdk_path: PathBuf,
}

impl DarwinProfile {
    /// Build the Darwin profile on top of the POSIX baseline
    ///
    /// The SDK directory is a hard precondition: construction fails before
    /// any package work when it is absent.
    pub fn new(
        prefix: PathBuf,
        build_root: PathBuf,
        dirs: BundleDirs,
        sdk_path: Option<PathBuf>,
    ) -> Result<Self> {
        let sdk_path = sdk_path.unwrap_or_else(|| PathBuf::from(DEFAULT_SDK_PATH));
        if !sdk_path.is_dir() {
            return Err(BrauError::MissingSdk(sdk_path));
        }

        let mut base = Profile::posix(prefix, build_root, dirs);
        base.name = "darwin".to_string();
        base.extra_vars
            .push(("sdk_path".to_string(), sdk_path.display().to_string()));

        base.cc_flags.extend([
            "-D_XOPEN_SOURCE".to_string(),
            "-isysroot %{sdk_path}".to_string(),
            format!("-mmacosx-version-min={}", MACOSX_VERSION_MIN),
        ]);
        if let Some(arch) = arch_flag() {
            base.cc_flags.push(arch.clone());
            base.ld_flags.push(arch);
        }

        base.env.set("CC", "clang");
        base.env.set("CXX", "clang++");

        Ok(Self { base, sdk_path })
    }

    pub fn profile(&self) -> &Profile {
        &self.base
    }

    pub fn profile_mut(&mut self) -> &mut Profile {
        &mut self.base
    }

    pub fn sdk_path(&self) -> &PathBuf {
        &self.sdk_path
    }

    /// Assemble the `.app` tree from the skeleton and installed prefix
    fn make_app_bundle(&self, runner: &dyn CommandRunner) -> Result<bundle::BundleTree> {
        let assembler = BundleAssembler::new(
            self.base.dirs.skeleton_dir.clone(),
            self.base.dirs.output_dir.clone(),
            self.base.prefix.clone(),
            self.base.bundle_from_build.clone(),
            self.base.collector.clone(),
        );
        assembler.assemble(runner)
    }

    /// Generate the pango module registry inside the bundle resources
    fn configure_pango(&self, tree: &bundle::BundleTree, runner: &dyn CommandRunner) -> Result<()> {
        bundle::write_module_registry(&self.base.prefix, &tree.resources_dir, runner)
    }
}

impl Bundler for DarwinProfile {
    fn bundle(&self, runner: &dyn CommandRunner) -> Result<()> {
        let tree = self.make_app_bundle(runner)?;
        self.configure_pango(&tree, runner)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dirs(root: &std::path::Path) -> BundleDirs {
        BundleDirs {
            skeleton_dir: root.join("skeleton"),
            output_dir: root.join("bundle"),
        }
    }

    #[test]
    fn test_missing_sdk_fails_construction() {
        let tmp = TempDir::new().unwrap();
        let result = DarwinProfile::new(
            tmp.path().join("prefix"),
            tmp.path().join("build"),
            dirs(tmp.path()),
            Some(tmp.path().join("no-such-sdk")),
        );

        match result {
            Err(BrauError::MissingSdk(path)) => {
                assert!(path.ends_with("no-such-sdk"));
            }
            other => panic!("expected MissingSdk, got {:?}", other),
        }
    }

    #[test]
    fn test_darwin_extends_posix_flags_and_env() {
        let tmp = TempDir::new().unwrap();
        let sdk = tmp.path().join("sdk");
        std::fs::create_dir(&sdk).unwrap();

        let profile = DarwinProfile::new(
            tmp.path().join("prefix"),
            tmp.path().join("build"),
            dirs(tmp.path()),
            Some(sdk),
        )
        .unwrap();

        let base = profile.profile();
        assert_eq!(base.name, "darwin");
        // Baseline flags are appended to, never replaced
        assert_eq!(base.cc_flags[0], "-O2");
        assert!(base.cc_flags.iter().any(|f| f.contains("-isysroot")));
        assert_eq!(base.env.get("CC"), Some("clang"));
        // Arch flag is shared between both lists when present
        if let Some(arch) = arch_flag() {
            assert!(base.cc_flags.contains(&arch));
            assert!(base.ld_flags.contains(&arch));
        }
    }
}
