//! Shared conformance suite: the text and tree engines must agree.

use es3_harmony::catalog::ids;
use es3_harmony::config::{Engine, Options};
use es3_harmony::{Catalog, PreamblePatcher, Rewriter, SourceUnit};

fn rewrite(engine: Engine, input: &str) -> String {
    let options = Options {
        engine,
        ..Options::default()
    };
    let rewriter = Rewriter::with_parts(Catalog::builtin(), PreamblePatcher::builtin(), &options, false);
    let out = rewriter
        .rewrite_unit(&SourceUnit::new("unit.js", input))
        .unwrap();
    assert!(
        out.warnings.is_empty(),
        "{engine} engine reported warnings: {:?}",
        out.warnings
    );
    out.text.clone()
}

/// Both engines produce `expected` from `input`.
fn conform(input: &str, expected: &str) {
    assert_eq!(rewrite(Engine::Text, input), expected, "text engine");
    assert_eq!(rewrite(Engine::Tree, input), expected, "tree engine");
}

const CONTEXTUAL: &str = "// EXTERNAL MODULE: ./node_modules/react/index.js\nvar react = __webpack_require__(0);\nvar react_default = /*#__PURE__*/__webpack_require__.n(react);\nreact_default.a.createElement(react[\"Fragment\"]);\nvar ns = react;\n";

#[test]
fn es_module_marker() {
    conform(
        r#"Object.defineProperty(__webpack_exports__, "__esModule", { value: true });"#,
        "__webpack_exports__.__esModule = true;",
    );
}

#[test]
fn export_installer() {
    conform(
        "__webpack_require__.d = function(exports, name, getter) {\n\tif(!__webpack_require__.o(exports, name)) {\n\t\tObject.defineProperty(exports, name, { enumerable: true, get: getter });\n\t}\n};",
        "__webpack_require__.d = function(exports, name, getter) { if(!__webpack_require__.o(exports, name)) exports[name] = getter };",
    );
}

#[test]
fn bind_loader() {
    conform(
        "p.then(__webpack_require__.bind(null, 7));",
        "p.then(function(){ return __webpack_require__(7) });",
    );
}

#[test]
fn imported_getter() {
    conform(
        r#"x = _a__WEBPACK_IMPORTED_MODULE_0__["a"];"#,
        r#"x = (_a__WEBPACK_IMPORTED_MODULE_0__["a"]());"#,
    );
}

#[test]
fn default_export() {
    conform(
        r#"/* harmony default export */ __webpack_exports__["default"] = (App);"#,
        r#"/* harmony default export */ __webpack_require__.d(__webpack_exports__, "default", function() { return (App); });"#,
    );
    conform(
        "/* harmony default export */ __webpack_exports__['default'] = (App);",
        r#"/* harmony default export */ __webpack_require__.d(__webpack_exports__, "default", function() { return (App); });"#,
    );
}

#[test]
fn concatenated_default_export() {
    conform(
        r#"/* harmony default export */ var src = __webpack_exports__["a"] = (App);"#,
        r#"/* harmony default export */ var src = (App); __webpack_require__.d(__webpack_exports__, "a", function() { return src; });"#,
    );
    conform(
        "/* harmony default export */ var src = __webpack_exports__['a'] = (App);",
        r#"/* harmony default export */ var src = (App); __webpack_require__.d(__webpack_exports__, "a", function() { return src; });"#,
    );
}

#[test]
fn module_default_getter() {
    conform("var d = module['default'];", "var d = module['default']();");
    conform(
        "if (x == module['default']) {}",
        "if (x == module['default']) {}",
    );
}

#[test]
fn object_keys_loop() {
    conform(
        "function f(m) { return Object.keys(m); }",
        "function f(m) { return (function() { var r = []; for (var p in m) { if (m.hasOwnProperty(p)) { r.push(p); } } return r; }()); }",
    );
}

#[test]
fn loader_member_getter() {
    conform(
        "x = __webpack_require__(5).a.b(y);",
        "x = __webpack_require__(5).a().b(y);",
    );
    conform(
        r#"z = __webpack_require__(5)["a"]["b"];"#,
        r#"z = __webpack_require__(5)["a"]()["b"];"#,
    );
    conform(
        "y = __webpack_require__(/*! ./a (b) */ 5).c;",
        "y = __webpack_require__(/*! ./a (b) */ 5).c();",
    );
    conform(
        "var lib = __webpack_require__(5);",
        "var lib = __webpack_require__(5);",
    );
}

#[test]
fn contextual_rules() {
    let text = rewrite(Engine::Text, CONTEXTUAL);
    assert_eq!(text, rewrite(Engine::Tree, CONTEXTUAL));
    assert!(text.contains("react_default.a().createElement((react[\"Fragment\"]()));"));
    assert!(text.contains("var ns = (function(){ var result = {}; for (var prop in react)"));
    assert!(text.contains("var react = __webpack_require__(0);"));
}

#[test]
fn star_imports_sharing_a_line() {
    let helper = "(function(){ var result = {}; for (var prop in lib) { if (lib.hasOwnProperty(prop) && typeof lib[prop] === \"function\") result[prop] = lib[prop](); } return result; }())";
    conform(
        "// EXTERNAL MODULE: ./lib.js\nvar lib = __webpack_require__(2);\nvar a = lib; var b = lib;\n",
        &format!("// EXTERNAL MODULE: ./lib.js\nvar lib = __webpack_require__(2);\nvar a = {helper}; var b = {helper};\n"),
    );
}

#[test]
fn unmarked_units_are_untouched() {
    let input = "var ns = lib;\nlib.a.b;\nlib[\"x\"];\n";
    conform(input, input);
}

#[test]
fn engines_share_rule_ids() {
    let catalog = Catalog::builtin();
    assert_eq!(catalog.ids(), ids::ALL.to_vec());
}
