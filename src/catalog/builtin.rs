//! Built-in rules and the replacement text shared with the tree engine.

use super::{ids, Rule, Synthesis, SynthesisError};
use crate::matcher::{MatchMode, RuleMatch, RulePattern};
use crate::source::{Marker, UnitContext};
use regex::Regex;

/// Whitespace or `/******/` runtime line prefixes between tokens.
const GAP: &str = r"(?:\s|/\*+/)*";

/// First member link read off a loaded module; comments may appear in the call.
pub const LOADER_MEMBER_PATTERN: &str =
    r"__webpack_require__\((?:/\*.*?\*/|[^()])*\)(?:\.[\w$]+|\[[^\[\]]*\])";

/// Replacement text for the getter-free export installer function.
pub fn installer_function(exports: &str, name: &str, getter: &str) -> String {
    format!(
        "function({exports}, {name}, {getter}) {{ if(!__webpack_require__.o({exports}, {name})) {exports}[{name}] = {getter} }}"
    )
}

/// Explicit closure standing in for `__webpack_require__.bind(null, arg)`.
pub fn bound_loader(arg: &str) -> String {
    format!("function(){{ return __webpack_require__({arg}) }}")
}

/// Opening half of a default export rewritten into an installer call.
pub fn default_export_head(key: &str) -> String {
    format!("__webpack_require__.d(__webpack_exports__, \"{key}\", function() {{ return ")
}

/// Closing half matching [`default_export_head`], including the statement's `;`.
pub const DEFAULT_EXPORT_TAIL: &str = "; });";

/// Installer call appended after a concatenated default export declaration.
pub fn default_export_installer(key: &str, var: &str) -> String {
    format!(
        " __webpack_require__.d(__webpack_exports__, \"{key}\", function() {{ return {var}; }});"
    )
}

/// Own-property key loop standing in for `Object.keys(map)`.
pub fn object_keys_loop(map: &str) -> String {
    format!(
        "(function() {{ var r = []; for (var p in {map}) {{ if ({map}.hasOwnProperty(p)) {{ r.push(p); }} }} return r; }}())"
    )
}

/// Plain object built by invoking every getter of a namespace once.
pub fn materialize_namespace(ns: &str) -> String {
    format!(
        "(function(){{ var result = {{}}; for (var prop in {ns}) {{ if ({ns}.hasOwnProperty(prop) && typeof {ns}[prop] === \"function\") result[prop] = {ns}[prop](); }} return result; }}())"
    )
}

/// Wrap an access site into an explicit getter invocation.
pub fn invoke_getter(access: &str) -> String {
    format!("({access}())")
}

type SynthFn = fn(&RuleMatch<'_>, &UnitContext<'_>) -> Result<Synthesis, SynthesisError>;

/// A regex rule whose synthesis is a plain function.
pub struct BuiltinRule {
    id: &'static str,
    description: &'static str,
    mode: MatchMode,
    pattern: RulePattern,
    synth: SynthFn,
}

impl BuiltinRule {
    fn new(
        id: &'static str,
        description: &'static str,
        mode: MatchMode,
        pattern: &str,
        synth: SynthFn,
    ) -> Self {
        Self {
            id,
            description,
            mode,
            pattern: RulePattern::Text(Regex::new(pattern).expect("built-in pattern compiles")),
            synth,
        }
    }
}

impl Rule for BuiltinRule {
    fn id(&self) -> &str {
        self.id
    }

    fn description(&self) -> &str {
        self.description
    }

    fn mode(&self) -> MatchMode {
        self.mode
    }

    fn pattern(&self) -> &RulePattern {
        &self.pattern
    }

    fn synthesize(
        &self,
        m: &RuleMatch<'_>,
        unit: &UnitContext<'_>,
    ) -> Result<Synthesis, SynthesisError> {
        (self.synth)(m, unit)
    }

    fn is_builtin(&self) -> bool {
        true
    }
}

fn group<'u>(id: &str, m: &RuleMatch<'u>, index: usize) -> Result<&'u str, SynthesisError> {
    m.group(index)
        .ok_or_else(|| SynthesisError::new(id, m, format!("capture group {index} missing")))
}

/// Identifier matches preceded by `.` are property names, not bindings.
fn follows_dot(m: &RuleMatch<'_>, unit: &UnitContext<'_>) -> bool {
    unit.char_before(m.span.start) == Some('.')
}

pub fn rules() -> Vec<Box<dyn Rule>> {
    let export_installer = format!(
        r"__webpack_require__\.d = function\(([\w$]+), ([\w$]+), ([\w$]+)\) ?\{{{GAP}if ?\(!__webpack_require__\.o\([\w$]+, [\w$]+\)\) ?\{{{GAP}Object\.defineProperty\([^;]*\);{GAP}\}}{GAP}\}};"
    );

    let rules = vec![
        BuiltinRule::new(
            ids::ES_MODULE_MARKER,
            "defineProperty __esModule marker becomes a plain flag assignment",
            MatchMode::Simple,
            r#"Object\.defineProperty\(([\w$]+), ["']__esModule["'], \{ ?value: ?true ?\}\)"#,
            |m, _| {
                let target = group(ids::ES_MODULE_MARKER, m, 1)?;
                Ok(Synthesis::Replace(format!("{target}.__esModule = true")))
            },
        ),
        BuiltinRule::new(
            ids::EXPORT_INSTALLER,
            "descriptor-based export installer becomes a define-if-absent assignment",
            MatchMode::Simple,
            &export_installer,
            |m, _| {
                let id = ids::EXPORT_INSTALLER;
                let function = installer_function(group(id, m, 1)?, group(id, m, 2)?, group(id, m, 3)?);
                Ok(Synthesis::Replace(format!("__webpack_require__.d = {function};")))
            },
        ),
        BuiltinRule::new(
            ids::BIND_LOADER,
            "bound module loader becomes an explicit closure",
            MatchMode::Simple,
            r"__webpack_require__\.bind\(null, ([^()]*)\)",
            |m, _| {
                let arg = group(ids::BIND_LOADER, m, 1)?;
                Ok(Synthesis::Replace(bound_loader(arg)))
            },
        ),
        BuiltinRule::new(
            ids::IMPORTED_GETTER,
            "every access to an imported binding invokes its getter",
            MatchMode::Simple,
            r#"(?i)[\w$]*__WEBPACK_IMPORTED_MODULE[\w$]*\[(?:/\*.*?\*/\s?)*"[^"]*"\]"#,
            |m, _| Ok(Synthesis::Replace(invoke_getter(m.text))),
        ),
        BuiltinRule::new(
            ids::DEFAULT_EXPORT,
            "direct default export assignment goes through the installer",
            MatchMode::Simple,
            r#"/\* harmony default export \*/ __webpack_exports__\[["']([^"']*)["']\] = (.*?);"#,
            |m, _| {
                let id = ids::DEFAULT_EXPORT;
                Ok(Synthesis::Replace(format!(
                    "/* harmony default export */ {}{}{}",
                    default_export_head(group(id, m, 1)?),
                    group(id, m, 2)?,
                    DEFAULT_EXPORT_TAIL
                )))
            },
        ),
        BuiltinRule::new(
            ids::CONCATENATED_DEFAULT_EXPORT,
            "concatenated default export declaration also installs a getter",
            MatchMode::Simple,
            r#"/\* harmony default export \*/ var ([\w$]+) = __webpack_exports__\[["']([^"']*)["']\] = (.*?);"#,
            |m, _| {
                let id = ids::CONCATENATED_DEFAULT_EXPORT;
                let var = group(id, m, 1)?;
                Ok(Synthesis::Replace(format!(
                    "/* harmony default export */ var {var} = {};{}",
                    group(id, m, 3)?,
                    default_export_installer(group(id, m, 2)?, var)
                )))
            },
        ),
        BuiltinRule::new(
            ids::MODULE_DEFAULT_GETTER,
            "reads of module['default'] invoke the getter",
            MatchMode::Simple,
            r#"= module\[(?:'default'|"default")\]"#,
            |m, unit| match unit.char_before(m.span.start) {
                Some('=' | '!' | '<' | '>' | '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^') => {
                    Ok(Synthesis::Decline)
                }
                _ => Ok(Synthesis::Replace(format!("{}()", m.text))),
            },
        ),
        BuiltinRule::new(
            ids::OBJECT_KEYS_LOOP,
            "Object.keys becomes an own-property loop",
            MatchMode::Simple,
            r"return Object\.keys\(([\w$]+)\);",
            |m, _| {
                let map = group(ids::OBJECT_KEYS_LOOP, m, 1)?;
                Ok(Synthesis::Replace(format!("return {};", object_keys_loop(map))))
            },
        ),
        BuiltinRule::new(
            ids::LOADER_MEMBER_GETTER,
            "member reads on a loaded module invoke the getter",
            MatchMode::Simple,
            LOADER_MEMBER_PATTERN,
            |m, _| Ok(Synthesis::Replace(format!("{}()", m.text))),
        ),
        BuiltinRule::new(
            ids::PURE_MEMBER_GETTER,
            "member reads on /*#__PURE__*/ interop bindings invoke the getter",
            MatchMode::Contextual(Marker::PureAnnotated),
            r"\b([A-Za-z_][\w$]*)\.([a-z]+)\b",
            |m, unit| {
                let object = group(ids::PURE_MEMBER_GETTER, m, 1)?;
                if follows_dot(m, unit) || !unit.is_marked(Marker::PureAnnotated, object) {
                    return Ok(Synthesis::Decline);
                }
                Ok(Synthesis::Replace(format!("{}()", m.text)))
            },
        ),
        BuiltinRule::new(
            ids::EXTERNAL_MEMBER_GETTER,
            "keyed reads on external module bindings invoke the getter",
            MatchMode::Contextual(Marker::ExternalModule),
            r#"\b([A-Za-z_][\w$]*)\["[^"]*"(?:\s?/\*.*?\*/)?\]"#,
            |m, unit| {
                let object = group(ids::EXTERNAL_MEMBER_GETTER, m, 1)?;
                if follows_dot(m, unit) || !unit.is_marked(Marker::ExternalModule, object) {
                    return Ok(Synthesis::Decline);
                }
                Ok(Synthesis::Replace(invoke_getter(m.text)))
            },
        ),
        BuiltinRule::new(
            ids::STAR_IMPORT_FLATTEN,
            "namespace objects assigned elsewhere are materialised into plain objects",
            MatchMode::Contextual(Marker::ExternalModule),
            r"(?m)(^|;)([^;\n]*) = ([\w$]+)",
            |m, unit| {
                let id = ids::STAR_IMPORT_FLATTEN;
                let ns = group(id, m, 3)?;
                let ends_statement = matches!(unit.char_after(m.span.end), None | Some(';' | '\n' | '\r'));
                if !ends_statement || !unit.is_marked(Marker::ExternalModule, ns) {
                    return Ok(Synthesis::Decline);
                }
                Ok(Synthesis::Replace(format!(
                    "{}{} = {}",
                    group(id, m, 1)?,
                    group(id, m, 2)?,
                    materialize_namespace(ns)
                )))
            },
        ),
    ];

    rules
        .into_iter()
        .map(|rule| Box::new(rule) as Box<dyn Rule>)
        .collect()
}
