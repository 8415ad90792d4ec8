//! End-to-end batch scenarios.

use es3_harmony::catalog::builtin::materialize_namespace;
use es3_harmony::catalog::ids;
use es3_harmony::config::{Engine, Options};
use es3_harmony::tree::JsParser;
use es3_harmony::{Catalog, PreamblePatcher, RewriteWarning, Rewriter, SourceUnit};
use std::collections::BTreeMap;

fn rewriter(engine: Engine) -> Rewriter {
    let options = Options {
        engine,
        ..Options::default()
    };
    Rewriter::with_parts(Catalog::builtin(), PreamblePatcher::builtin(), &options, false)
}

const INSTALLER: &str = "/******/ \t// define getter function for harmony exports\n/******/ \t__webpack_require__.d = function(exports, name, getter) {\n/******/ \t\tif(!__webpack_require__.o(exports, name)) {\n/******/ \t\t\tObject.defineProperty(exports, name, { enumerable: true, get: getter });\n/******/ \t\t}\n/******/ \t};\n";

#[test]
fn installer_reaches_a_fixed_point() {
    let first = rewriter(Engine::Text)
        .rewrite_unit(&SourceUnit::new("runtime.js", INSTALLER))
        .unwrap();
    assert!(first.text.contains(
        "__webpack_require__.d = function(exports, name, getter) { if(!__webpack_require__.o(exports, name)) exports[name] = getter };"
    ));
    assert!(!first.text.contains("defineProperty"));

    for engine in [Engine::Text, Engine::Tree] {
        let second = rewriter(engine)
            .rewrite_unit(&SourceUnit::new("runtime.js", first.text.as_str()))
            .unwrap();
        assert_eq!(second.text, first.text, "{engine} engine changed a rewritten installer");
        assert!(second.applied.is_empty());
    }
}

#[test]
fn every_access_site_is_wrapped_once() {
    let input = r#"a(_m__WEBPACK_IMPORTED_MODULE_0__["x"]);
var b = _m__WEBPACK_IMPORTED_MODULE_0__["x"] + _m__WEBPACK_IMPORTED_MODULE_0__["x"];
"#;
    let wrapped = r#"(_m__WEBPACK_IMPORTED_MODULE_0__["x"]())"#;
    for engine in [Engine::Text, Engine::Tree] {
        let out = rewriter(engine)
            .rewrite_unit(&SourceUnit::new("a.js", input))
            .unwrap();
        assert_eq!(out.text.matches(wrapped).count(), 3, "{engine} engine");
        assert_eq!(out.text.matches("__WEBPACK_IMPORTED_MODULE_0__").count(), 3);
        assert_eq!(out.applied_count(ids::IMPORTED_GETTER), 3);
    }
}

#[test]
fn overlapping_rules_keep_the_first_edit() {
    let input = r#"/* harmony default export */ __webpack_exports__["default"] = (_x__WEBPACK_IMPORTED_MODULE_0__["a"]);"#;
    let out = rewriter(Engine::Text)
        .rewrite_unit(&SourceUnit::new("a.js", input))
        .unwrap();

    assert_eq!(
        out.text,
        r#"/* harmony default export */ __webpack_exports__["default"] = ((_x__WEBPACK_IMPORTED_MODULE_0__["a"]()));"#
    );
    assert_eq!(out.applied.len(), 1);
    let conflicts: Vec<_> = out.conflicts().collect();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].rule_id, ids::DEFAULT_EXPORT);
    assert_eq!(conflicts[0].winner_rule_id, ids::IMPORTED_GETTER);
    assert!(matches!(out.warnings[0], RewriteWarning::Conflict(_)));

    // the tree engine brackets the export instead and keeps both
    let tree = rewriter(Engine::Tree)
        .rewrite_unit(&SourceUnit::new("a.js", input))
        .unwrap();
    assert!(tree.warnings.is_empty());
    assert_eq!(
        tree.text,
        r#"/* harmony default export */ __webpack_require__.d(__webpack_exports__, "default", function() { return ((_x__WEBPACK_IMPORTED_MODULE_0__["a"]())); });"#
    );
}

/// Value of one namespace slot for the helper model below.
enum Slot {
    Getter(i64),
    Plain(i64),
}

/// Check that the helper's loop, guard and assignment have the expected
/// shape. The helper is not executed; the returned object is what that
/// checked shape computes for `namespace`, replayed in Rust.
fn check_helper_shape(helper: &str, ns: &str, namespace: &BTreeMap<&str, Slot>) -> BTreeMap<String, i64> {
    let source = format!("var out = {helper};");
    let mut parser = JsParser::new().unwrap();
    let parsed = parser.parse_with_source(&source).unwrap();
    assert!(!parsed.has_errors(), "helper does not parse: {helper}");

    let mut stack = vec![parsed.root_node()];
    let mut loop_node = None;
    while let Some(node) = stack.pop() {
        if node.kind() == "for_in_statement" {
            loop_node = Some(node);
            break;
        }
        let mut cursor = node.walk();
        stack.extend(node.children(&mut cursor));
    }
    let loop_node = loop_node.expect("helper has a for-in loop");

    let left = loop_node.child_by_field_name("left").unwrap();
    let right = loop_node.child_by_field_name("right").unwrap();
    assert_eq!(parsed.node_text(right), ns);
    let prop = parsed.node_text(left);

    let body = loop_node.child_by_field_name("body").unwrap();
    let guard = if body.kind() == "if_statement" {
        body
    } else {
        body.named_child(0).unwrap()
    };
    assert_eq!(guard.kind(), "if_statement");
    assert_eq!(
        parsed.node_text(guard.child_by_field_name("condition").unwrap()),
        format!("({ns}.hasOwnProperty({prop}) && typeof {ns}[{prop}] === \"function\")")
    );
    assert_eq!(
        parsed.node_text(guard.child_by_field_name("consequence").unwrap()),
        format!("result[{prop}] = {ns}[{prop}]();")
    );
    assert!(source.contains("return result;"));

    namespace
        .iter()
        .filter_map(|(key, slot)| match slot {
            Slot::Getter(value) => Some((key.to_string(), *value)),
            Slot::Plain(_) => None,
        })
        .collect()
}

#[test]
fn star_import_helper_shape() {
    let input = "// EXTERNAL MODULE: ./lib.js\nvar lib = __webpack_require__(2);\nvar ns = lib;\n";
    for engine in [Engine::Text, Engine::Tree] {
        let out = rewriter(engine)
            .rewrite_unit(&SourceUnit::new("a.js", input))
            .unwrap();
        let helper = materialize_namespace("lib");
        assert!(out.text.contains(&format!("var ns = {helper};")), "{engine} engine");
        assert_eq!(out.applied_count(ids::STAR_IMPORT_FLATTEN), 1);

        let namespace = BTreeMap::from([
            ("a", Slot::Getter(1)),
            ("b", Slot::Getter(2)),
            ("c", Slot::Plain(3)),
        ]);
        let result = check_helper_shape(&helper, "lib", &namespace);
        assert_eq!(
            result,
            BTreeMap::from([("a".to_string(), 1), ("b".to_string(), 2)])
        );
    }
}

const RUNTIME: &str = r#"/******/ (function(modules) { // webpackBootstrap
/******/ 	var installedModules = {};
/******/ 	__webpack_require__.e = function requireEnsure(chunkId) {
/******/ 		var promises = [];
/******/ 		return Promise.all(promises);
/******/ 	};
/******/ 	__webpack_require__.d = function(exports, name, getter) {
/******/ 		if(!__webpack_require__.o(exports, name)) {
/******/ 			Object.defineProperty(exports, name, { enumerable: true, get: getter });
/******/ 		}
/******/ 	};
/******/ 	__webpack_require__.r = function(exports) {
/******/ 		if(typeof Symbol !== 'undefined' && Symbol.toStringTag) {
/******/ 			Object.defineProperty(exports, Symbol.toStringTag, { value: 'Module' });
/******/ 		}
/******/ 		Object.defineProperty(exports, '__esModule', { value: true });
/******/ 	};
/******/ 	__webpack_require__.t = function(value, mode) {
/******/ 		var ns = Object.create(null);
/******/ 		if(mode & 2 && typeof value != 'string') for(var key in value) __webpack_require__.d(ns, key, function(key) { return value[key]; }.bind(null, key));
/******/ 		return ns;
/******/ 	};
/******/ 	function loadAll(ids) {
/******/ 		return Promise.all(ids.slice(1).map(__webpack_require__.e)).then(function() {
/******/ 			return __webpack_require__(ids[0]);
/******/ 		});
/******/ 	}
/******/ 	function moduleIds() {
/******/ 		return Object.keys(installedModules);
/******/ 	}
/******/ 	var polyfill = __webpack_require__(1).Promise;
/******/ 	var jsonpArray = window["webpackJsonp"] = window["webpackJsonp"] || [];
/******/ 	var oldJsonpFunction = jsonpArray.push.bind(jsonpArray);
/******/ })([]);
"#;

#[test]
fn preamble_strategies_agree() {
    let rewriter = rewriter(Engine::Text);
    let chained = rewriter.patch_preamble(RUNTIME);
    let single = rewriter.patch_preamble_single_pass(RUNTIME);

    assert_eq!(chained.text, single.text);
    assert_eq!(chained.hits, single.hits);
    for id in rewriter.preamble().ids() {
        assert_eq!(chained.hits_for(id), 1, "substitution {id}");
    }
    assert!(!chained.text.contains("defineProperty"));
    assert!(!chained.text.contains(".bind("));
    assert!(chained.text.contains("__webpack_require__(1).Promise()"));
}

#[test]
fn batch_reports_every_unit() {
    let rewriter = rewriter(Engine::Text);
    let units = vec![
        SourceUnit::new("0.js", "var d = module['default'];"),
        SourceUnit::new("1.js", "var plain = 1;"),
        SourceUnit::new("2.js", "x = __webpack_require__(3).a;"),
    ];
    let reports = rewriter.rewrite_batch(&units);
    let identities: Vec<_> = reports.iter().map(|r| r.identity.as_str()).collect();
    assert_eq!(identities, ["0.js", "1.js", "2.js"]);
    assert!(reports.iter().all(|r| r.is_ok()));
    assert_eq!(reports[0].text(), "var d = module['default']();");
    assert_eq!(reports[1].text(), "var plain = 1;");
    assert_eq!(reports[2].text(), "x = __webpack_require__(3).a();");
    assert_eq!(rewriter.cache().len(), 3);

    // a second build phase offers the rewritten units again
    let again: Vec<_> = reports
        .iter()
        .map(|r| SourceUnit::new(r.identity.clone(), r.text()))
        .collect();
    let second = rewriter.rewrite_batch(&again);
    for (first, second) in reports.iter().zip(&second) {
        assert_eq!(first.text(), second.text());
    }
}
