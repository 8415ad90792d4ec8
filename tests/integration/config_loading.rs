//! Configuration files driving a rewrite session.

use es3_harmony::config::{load_from_path, load_from_str, ConfigError, Engine, ValidationIssue};
use es3_harmony::{Rewriter, SourceUnit};
use std::fs;
use tempfile::TempDir;

const CONFIG: &str = r#"
[options]
source_map = true

[[custom_rules]]
id = "ext-run"
pattern = '(?P<ns>[\w$]+)\.run\(\)'
replacement = "${ns}.run.call(${ns})"

[custom_rules.guard]
capture = "ns"
marker = "external-module"

[[custom_rules]]
id = "keys"
type = "ast-grep"
pattern = "Object.keys($OBJ)"
replacement = "keysOf($OBJ)"

[[preamble_substitutions]]
id = "strict-off"
pattern = '"use strict";'
replacement = ""
global = false
"#;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("es3-harmony.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn custom_rules_extend_the_catalog() {
    let (_dir, path) = write_config(CONFIG);
    let config = load_from_path(&path).unwrap();
    let rewriter = Rewriter::new(&config, false).unwrap();

    assert!(rewriter.source_map_enabled());
    assert_eq!(rewriter.engine(), Engine::Text);
    let ids = rewriter.catalog().ids();
    assert_eq!(&ids[ids.len() - 2..], ["ext-run", "keys"]);

    let input = "// EXTERNAL MODULE: ./x.js\nvar ext = __webpack_require__(1);\next.run();\nlocal.run();\nvar k = Object.keys(m);\n";
    let out = rewriter
        .rewrite_unit(&SourceUnit::new("a.js", input))
        .unwrap();
    assert!(out.text.contains("\next.run.call(ext);\n"));
    assert!(out.text.contains("\nlocal.run();\n"));
    assert!(out.text.contains("var k = keysOf(m);"));
    assert!(out.position_map.is_some());
}

#[test]
fn custom_preamble_substitutions_run_last() {
    let config = load_from_str(CONFIG).unwrap();
    let rewriter = Rewriter::new(&config, false).unwrap();
    assert_eq!(rewriter.preamble().ids().last(), Some(&"strict-off"));

    let patched = rewriter.patch_preamble("\"use strict\";\nboot();\n\"use strict\";");
    assert_eq!(patched.text, "\nboot();\n\"use strict\";");
    assert_eq!(patched.hits_for("strict-off"), 1);
}

#[test]
fn engine_option_selects_tree_engine() {
    let config = load_from_str("[options]\nengine = \"tree\"\n").unwrap();
    let rewriter = Rewriter::new(&config, true).unwrap();
    assert_eq!(rewriter.engine(), Engine::Tree);
    // unset source_map follows the debug flag
    assert!(rewriter.source_map_enabled());
}

#[test]
fn all_issues_are_reported_together() {
    let err = load_from_str(
        r#"
[[custom_rules]]
id = "dup"
pattern = "a"
replacement = "b"

[[custom_rules]]
id = "dup"
pattern = "("
replacement = "b"

[[custom_rules]]
id = "guarded"
pattern = '(\w+)\.x'
replacement = "$1"

[custom_rules.guard]
capture = "missing"
marker = "pure-annotated"
"#,
    )
    .unwrap_err();

    let ConfigError::Validation { source, path } = err else {
        panic!("expected a validation error");
    };
    assert!(path.is_none());
    assert!(source
        .issues
        .iter()
        .any(|i| matches!(i, ValidationIssue::DuplicateId { id, .. } if id == "dup")));
    assert!(source
        .issues
        .iter()
        .any(|i| matches!(i, ValidationIssue::InvalidPattern { id, .. } if id == "dup")));
    assert!(source.issues.iter().any(
        |i| matches!(i, ValidationIssue::GuardCaptureMissing { id, capture } if id == "guarded" && capture == "missing")
    ));
}

#[test]
fn unknown_engine_is_a_toml_error() {
    let err = load_from_str("[options]\nengine = \"quantum\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml { .. }));
}
