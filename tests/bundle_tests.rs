// Integration tests for bundle assembly
//
// These tests verify the assembler against a real skeleton tree in a
// tempdir, with the external collector replaced by a recording runner:
// 1. Identity derivation from Contents/Info.plist (and the no-descriptor fallback)
// 2. The PkgInfo write-once rule
// 3. Idempotent re-assembly
// 4. Collector invocation shape and fatal failure
// 5. Module-registry generation and prefix rewriting

use brau::bundle::{BundleAssembler, write_module_registry};
use brau::error::{BrauError, Result};
use brau::exec::{CommandOutput, CommandRunner};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Records scripts instead of running them
struct RecordingRunner {
    calls: RefCell<Vec<String>>,
    stdout: String,
    code: i32,
}

impl RecordingRunner {
    fn ok() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            stdout: String::new(),
            code: 0,
        }
    }

    fn with_stdout(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            ..Self::ok()
        }
    }

    fn failing(code: i32) -> Self {
        Self {
            code,
            ..Self::ok()
        }
    }

    fn scripts(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, script: &str, _env: &[(String, String)], _cwd: &Path) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(script.to_string());
        Ok(CommandOutput {
            code: self.code,
            stdout: self.stdout.clone(),
        })
    }
}

const INFO_PLIST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>CFBundleExecutable</key>
    <string>Foo</string>
    <key>CFBundlePackageType</key>
    <string>APPL</string>
    <key>CFBundleSignature</key>
    <string>????</string>
</dict>
</plist>"#;

fn write_skeleton(root: &Path, with_plist: bool) -> PathBuf {
    let skeleton = root.join("App.app");
    fs::create_dir_all(skeleton.join("Contents")).unwrap();
    fs::write(skeleton.join("Contents").join("README"), "skeleton file").unwrap();
    if with_plist {
        fs::write(
            skeleton.join("Contents").join("Info.plist"),
            INFO_PLIST,
        )
        .unwrap();
    }
    skeleton
}

fn assembler(skeleton: PathBuf, root: &Path) -> BundleAssembler {
    BundleAssembler::new(
        skeleton,
        root.join("out"),
        root.join("prefix"),
        Vec::new(),
        None,
    )
}

/// Relative paths of every entry under a tree, sorted
fn tree_listing(root: &Path) -> Vec<PathBuf> {
    let mut listing: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap().path().strip_prefix(root).unwrap().to_path_buf())
        .collect();
    listing.sort();
    listing
}

#[test]
fn test_descriptor_names_app_and_pkginfo() {
    let tmp = TempDir::new().unwrap();
    let skeleton = write_skeleton(tmp.path(), true);
    let runner = RecordingRunner::ok();

    let tree = assembler(skeleton, tmp.path()).assemble(&runner).unwrap();

    assert_eq!(tree.app_dir, tmp.path().join("out").join("Foo.app"));
    assert!(tree.resources_dir.is_dir());
    assert!(tree.macos_dir.is_dir());
    // Skeleton content survived the copy
    assert_eq!(
        fs::read_to_string(tree.contents_dir.join("README")).unwrap(),
        "skeleton file"
    );

    let pkginfo = fs::read_to_string(tree.contents_dir.join("PkgInfo")).unwrap();
    assert_eq!(pkginfo, "APPL????");
    assert_eq!(pkginfo.len(), 8);
}

#[test]
fn test_missing_descriptor_falls_back_and_skips_pkginfo() {
    let tmp = TempDir::new().unwrap();
    let skeleton = write_skeleton(tmp.path(), false);
    let runner = RecordingRunner::ok();

    let tree = assembler(skeleton, tmp.path()).assemble(&runner).unwrap();

    assert_eq!(tree.app_dir, tmp.path().join("out").join("Unknown.app"));
    assert!(!tree.contents_dir.join("PkgInfo").exists());
    // Derived dirs exist even though the skeleton lacked them
    assert!(tree.resources_dir.is_dir());
    assert!(tree.macos_dir.is_dir());
}

#[test]
fn test_skeleton_pkginfo_is_never_overwritten() {
    let tmp = TempDir::new().unwrap();
    let skeleton = write_skeleton(tmp.path(), true);
    fs::write(skeleton.join("Contents").join("PkgInfo"), "BNDLcust").unwrap();
    let runner = RecordingRunner::ok();

    let tree = assembler(skeleton, tmp.path()).assemble(&runner).unwrap();

    assert_eq!(
        fs::read_to_string(tree.contents_dir.join("PkgInfo")).unwrap(),
        "BNDLcust"
    );
}

#[test]
fn test_reassembly_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let skeleton = write_skeleton(tmp.path(), true);
    let runner = RecordingRunner::ok();
    let assembler = assembler(skeleton, tmp.path());

    let first = assembler.assemble(&runner).unwrap();
    let first_listing = tree_listing(&first.app_dir);
    let first_pkginfo = fs::read_to_string(first.contents_dir.join("PkgInfo")).unwrap();

    let second = assembler.assemble(&runner).unwrap();
    let second_listing = tree_listing(&second.app_dir);

    assert_eq!(first_listing, second_listing);
    assert_eq!(
        fs::read_to_string(second.contents_dir.join("PkgInfo")).unwrap(),
        first_pkginfo
    );
}

#[test]
fn test_collector_receives_prefix_and_quoted_files() {
    let tmp = TempDir::new().unwrap();
    let skeleton = write_skeleton(tmp.path(), true);
    let prefix = tmp.path().join("prefix");
    let runner = RecordingRunner::ok();

    let assembler = BundleAssembler::new(
        skeleton,
        tmp.path().join("out"),
        prefix.clone(),
        vec!["bin/app.exe".to_string(), "lib/app.dll".to_string()],
        None,
    );
    assembler.assemble(&runner).unwrap();

    let scripts = runner.scripts();
    assert_eq!(scripts.len(), 1);
    let script = &scripts[0];
    assert!(script.contains(&format!("--mono-prefix=\"{}\"", prefix.display())));
    assert!(script.contains(&format!("--root=\"{}\"", prefix.display())));
    assert!(script.contains(&format!("\"{}\"", prefix.join("bin/app.exe").display())));
    assert!(script.contains(&format!("\"{}\"", prefix.join("lib/app.dll").display())));
}

#[test]
fn test_custom_collector_template() {
    let tmp = TempDir::new().unwrap();
    let skeleton = write_skeleton(tmp.path(), true);
    let runner = RecordingRunner::ok();

    let assembler = BundleAssembler::new(
        skeleton,
        tmp.path().join("out"),
        tmp.path().join("prefix"),
        vec!["bin/app.exe".to_string()],
        Some("collect --out=\"%{resources_dir}\" %{files}".to_string()),
    );
    assembler.assemble(&runner).unwrap();

    let scripts = runner.scripts();
    assert!(scripts[0].starts_with("collect --out="));
    assert!(scripts[0].contains("Resources"));
}

#[test]
fn test_collector_failure_is_fatal() {
    let tmp = TempDir::new().unwrap();
    let skeleton = write_skeleton(tmp.path(), true);
    let runner = RecordingRunner::failing(3);

    let assembler = BundleAssembler::new(
        skeleton,
        tmp.path().join("out"),
        tmp.path().join("prefix"),
        vec!["bin/app.exe".to_string()],
        None,
    );

    match assembler.assemble(&runner) {
        Err(BrauError::CollectorFailed(code)) => assert_eq!(code, 3),
        other => panic!("expected CollectorFailed, got {:?}", other),
    }
}

#[test]
fn test_module_registry_rewrites_prefix_and_strips_comments() {
    let tmp = TempDir::new().unwrap();
    let prefix = tmp.path().join("prefix");
    let resources = tmp.path().join("Resources");
    fs::create_dir_all(prefix.join("bin")).unwrap();
    fs::write(prefix.join("bin").join("pango-querymodules"), "#!/bin/sh\n").unwrap();

    let stdout = format!(
        "# Pango Modules file\n{}/lib/mod.so query-string\n/usr/lib/other.so foreign\n",
        prefix.display()
    );
    let runner = RecordingRunner::with_stdout(&stdout);

    write_module_registry(&prefix, &resources, &runner).unwrap();

    let modules = fs::read_to_string(resources.join("etc/pango/pango.modules")).unwrap();
    assert_eq!(modules, "lib/mod.so query-string\n/usr/lib/other.so foreign\n");

    let pangorc = fs::read_to_string(resources.join("etc/pango/pangorc")).unwrap();
    assert_eq!(pangorc, "[Pango]\nModulesPath=./pango.modules\n");
}

#[test]
fn test_missing_querymodules_is_a_skip_not_an_error() {
    let tmp = TempDir::new().unwrap();
    let prefix = tmp.path().join("prefix");
    let resources = tmp.path().join("Resources");
    let runner = RecordingRunner::ok();

    write_module_registry(&prefix, &resources, &runner).unwrap();

    assert!(runner.scripts().is_empty());
    assert!(!resources.join("etc/pango/pango.modules").exists());
}
