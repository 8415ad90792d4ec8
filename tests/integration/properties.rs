//! Property tests over generated units.

use es3_harmony::config::{Engine, Options};
use es3_harmony::{Catalog, PreamblePatcher, Rewriter, Rule, SourceUnit, TemplateRule};
use proptest::prelude::*;

const FRAGMENTS: &[&str] = &[
    r#"Object.defineProperty(__webpack_exports__, "__esModule", { value: true });"#,
    "p.then(__webpack_require__.bind(null, 7));",
    r#"x = _a__WEBPACK_IMPORTED_MODULE_0__["a"];"#,
    r#"/* harmony default export */ __webpack_exports__["default"] = (_a__WEBPACK_IMPORTED_MODULE_0__["b"]);"#,
    r#"/* harmony default export */ var src = __webpack_exports__["a"] = (App);"#,
    "var d = module['default'];",
    "function f(m) { return Object.keys(m); }",
    "y = __webpack_require__(5).a.b(z);",
    "// EXTERNAL MODULE: ./lib.js\nvar lib = __webpack_require__(2);",
    "var lib_default = /*#__PURE__*/__webpack_require__.n(lib);",
    "lib_default.a.render(lib[\"Component\"]);",
    "var ns = lib;",
    "var plain = 1;",
];

fn arb_unit() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..12).prop_map(|parts| parts.join("\n"))
}

fn rewriter_with(catalog: Catalog, engine: Engine) -> Rewriter {
    let options = Options {
        engine,
        ..Options::default()
    };
    Rewriter::with_parts(catalog, PreamblePatcher::empty(), &options, false)
}

fn template(id: &str, pattern: &str, replacement: &str) -> Box<dyn Rule> {
    Box::new(TemplateRule::regex(id, pattern, replacement, false).unwrap())
}

proptest! {
    #[test]
    fn prop_rewrite_is_deterministic(text in arb_unit(), tree in any::<bool>()) {
        let engine = if tree { Engine::Tree } else { Engine::Text };
        let unit = SourceUnit::new("unit.js", text);
        let first = rewriter_with(Catalog::builtin(), engine).rewrite_unit(&unit).unwrap();
        let second = rewriter_with(Catalog::builtin(), engine).rewrite_unit(&unit).unwrap();
        prop_assert_eq!(&first.text, &second.text);
        prop_assert_eq!(&first.applied, &second.applied);
    }

    #[test]
    fn prop_applied_edits_are_disjoint(text in arb_unit(), tree in any::<bool>()) {
        let engine = if tree { Engine::Tree } else { Engine::Text };
        let out = rewriter_with(Catalog::builtin(), engine)
            .rewrite_unit(&SourceUnit::new("unit.js", text))
            .unwrap();
        for (i, a) in out.applied.iter().enumerate() {
            for b in &out.applied[i + 1..] {
                prop_assert!(!a.span.overlaps(&b.span), "{} overlaps {}", a.span, b.span);
                prop_assert!(a.output_span.end <= b.output_span.start);
            }
        }
    }

    #[test]
    fn prop_zero_length_patterns_terminate(text in "\\PC{0,64}") {
        let catalog = Catalog::empty().with_rules([
            template("boundary", r"\b", "|"),
            template("xs", r"x*", ""),
        ]);
        let out = rewriter_with(catalog, Engine::Text)
            .rewrite_unit(&SourceUnit::new("unit.js", text.as_str()))
            .unwrap();
        let boundaries = out.applied_count("boundary");
        let removed: usize = out
            .applied
            .iter()
            .filter(|e| e.rule_id == "xs")
            .map(|e| e.span.len())
            .sum();
        prop_assert_eq!(out.text.len(), text.len() + boundaries - removed);
    }

    #[test]
    fn prop_independent_rules_commute(text in "[fobar ]{0,40}") {
        let forward = Catalog::empty().with_rules([
            template("foo", "foo", "F"),
            template("bar", "bar", "B"),
        ]);
        let backward = Catalog::empty().with_rules([
            template("bar", "bar", "B"),
            template("foo", "foo", "F"),
        ]);
        let unit = SourceUnit::new("unit.js", text);
        let a = rewriter_with(forward, Engine::Text).rewrite_unit(&unit).unwrap();
        let b = rewriter_with(backward, Engine::Text).rewrite_unit(&unit).unwrap();
        prop_assert_eq!(&a.text, &b.text);
        prop_assert!(a.warnings.is_empty());
    }
}
