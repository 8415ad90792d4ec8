//! Smoke tests for the `es3-harmony` binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn es3_harmony(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_es3-harmony"))
        .args(args)
        .current_dir(cwd)
        .env_remove("ES3_HARMONY_LOG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .expect("binary runs")
}

fn setup_dist() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("dist/chunks")).unwrap();
    fs::write(
        dir.path().join("dist/main.js"),
        "var d = module['default'];\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("dist/chunks/0.js"),
        "p.then(__webpack_require__.bind(null, 7));\n",
    )
    .unwrap();
    fs::write(dir.path().join("dist/notes.txt"), "module['default']").unwrap();
    dir
}

#[test]
fn rewrite_in_place() {
    let dir = setup_dist();
    let output = es3_harmony(&["rewrite", "dist"], dir.path());
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    assert_eq!(
        fs::read_to_string(dir.path().join("dist/main.js")).unwrap(),
        "var d = module['default']();\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("dist/chunks/0.js")).unwrap(),
        "p.then(function(){ return __webpack_require__(7) });\n"
    );
    // not selected by the suffix
    assert_eq!(
        fs::read_to_string(dir.path().join("dist/notes.txt")).unwrap(),
        "module['default']"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 rewritten"));
}

#[test]
fn dry_run_leaves_files_alone() {
    let dir = setup_dist();
    let output = es3_harmony(&["rewrite", "dist", "--dry-run", "--diff"], dir.path());
    assert!(output.status.success());
    assert_eq!(
        fs::read_to_string(dir.path().join("dist/main.js")).unwrap(),
        "var d = module['default'];\n"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("+var d = module['default']();"));
}

#[test]
fn out_dir_mirrors_layout_with_maps() {
    let dir = setup_dist();
    let output = es3_harmony(
        &["rewrite", "dist", "--out-dir", "legacy", "--engine", "tree", "--source-map"],
        dir.path(),
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    assert_eq!(
        fs::read_to_string(dir.path().join("legacy/chunks/0.js")).unwrap(),
        "p.then(function(){ return __webpack_require__(7) });\n"
    );
    let map = fs::read_to_string(dir.path().join("legacy/main.js.map.json")).unwrap();
    assert!(map.contains("\"mappings\""));
    // sources untouched
    assert_eq!(
        fs::read_to_string(dir.path().join("dist/main.js")).unwrap(),
        "var d = module['default'];\n"
    );
}

#[test]
fn rules_lists_builtin_catalog() {
    let dir = TempDir::new().unwrap();
    let output = es3_harmony(&["rules"], dir.path());
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("export-installer"));
    assert!(stdout.contains("star-import-flatten"));
    assert!(stdout.contains("jsonp-push-bind"));
}

#[test]
fn invalid_config_fails() {
    let dir = setup_dist();
    fs::write(
        dir.path().join("bad.toml"),
        "[[custom_rules]]\nid = \"bind-loader\"\npattern = \"x\"\nreplacement = \"y\"\n",
    )
    .unwrap();
    let output = es3_harmony(&["rewrite", "dist", "--config", "bad.toml"], dir.path());
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("collides with a built-in rule"));
}

#[test]
fn preamble_command_patches_file() {
    let dir = TempDir::new().unwrap();
    let runtime = dir.path().join("runtime.js");
    fs::write(
        &runtime,
        "var jsonpArray = window[\"webpackJsonp\"] = window[\"webpackJsonp\"] || [];\nvar oldJsonpFunction = jsonpArray.push.bind(jsonpArray);\n",
    )
    .unwrap();
    let output = es3_harmony(&["preamble", "runtime.js", "--single-pass"], dir.path());
    assert!(output.status.success());
    let patched = fs::read_to_string(&runtime).unwrap();
    assert!(patched.contains("var oldPushMethod = jsonpArray.push;"));
    assert!(!patched.contains(".bind("));
}
