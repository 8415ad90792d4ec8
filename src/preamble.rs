//! Runtime boilerplate patcher.
//!
//! The bundler's bootstrap code (module registry, loader, chunk hooks) is not
//! a module unit and never goes through the catalog. It gets a short ordered
//! list of plain regex substitutions instead.

use crate::catalog::builtin::LOADER_MEMBER_PATTERN;
use regex::Regex;
use tracing::debug;

/// One ordered substitution over the preamble text.
#[derive(Debug, Clone)]
pub struct Substitution {
    pub id: String,
    pub pattern: Regex,
    /// Replacement template in regex syntax (`$0`, `$1`, `${name}`, `$$`)
    pub replacement: String,
    /// Replace every occurrence instead of only the first
    pub global: bool,
}

impl Substitution {
    pub fn new(
        id: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
        global: bool,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            id: id.into(),
            pattern: Regex::new(pattern)?,
            replacement: replacement.into(),
            global,
        })
    }
}

/// Result of patching one preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedPreamble {
    pub text: String,
    /// Replacement count per substitution id, in list order
    pub hits: Vec<(String, usize)>,
}

impl PatchedPreamble {
    pub fn hits_for(&self, id: &str) -> usize {
        self.hits
            .iter()
            .find(|(hit_id, _)| hit_id == id)
            .map_or(0, |(_, count)| *count)
    }

    pub fn changed(&self) -> bool {
        self.hits.iter().any(|(_, count)| *count > 0)
    }
}

struct Builtin {
    id: &'static str,
    pattern: &'static str,
    replacement: &'static str,
    global: bool,
}

const BUILTIN: [Builtin; 7] = [
    Builtin {
        id: "jsonp-push-bind",
        pattern: r"var oldJsonpFunction = jsonpArray\.push\.bind\(jsonpArray\);",
        replacement: "var oldPushMethod = jsonpArray.push;\nvar oldJsonpFunction = function(){ return oldPushMethod.apply(jsonpArray, arguments) };",
        global: false,
    },
    Builtin {
        id: "define-es-module",
        pattern: r"__webpack_require__\.r = .*\{[\s\S]+?\};",
        replacement: "__webpack_require__.r = function(exports) { exports.__esModule = true };",
        global: false,
    },
    Builtin {
        id: "define-getter",
        pattern: r"__webpack_require__\.d = .*\{[\s\S]+?\};",
        replacement: "__webpack_require__.d = function(exports, name, getter) { if(!__webpack_require__.o(exports, name)) exports[name] = getter };",
        global: false,
    },
    Builtin {
        id: "bound-namespace-getter",
        pattern: r"function\(key\) \{ return value\[key\]; \}\.bind\(null, key\)",
        replacement: "(function(key) { return function() { return value[key]; }; }(key))",
        global: true,
    },
    Builtin {
        id: "promise-all-map",
        pattern: r"Promise\.all\(ids\.slice\(1\)\.map\(__webpack_require__\.e\)\)",
        replacement: "Promise.all(function(){ var r = ids.slice(1); for(var i = 0; i < r.length; i++) { r[i] = __webpack_require__.e(r[i]); } return r; }())",
        global: true,
    },
    Builtin {
        id: "object-keys-loop",
        pattern: r"return Object\.keys\(([\w$]+)\);",
        replacement: "return (function() { var r = []; for (var p in ${1}) { if (${1}.hasOwnProperty(p)) { r.push(p); } } return r; }());",
        global: true,
    },
    Builtin {
        id: "loader-member-getter",
        pattern: LOADER_MEMBER_PATTERN,
        replacement: "${0}()",
        global: true,
    },
];

/// Ordered substitution list applied to a runtime preamble.
#[derive(Debug, Clone)]
pub struct PreamblePatcher {
    substitutions: Vec<Substitution>,
}

impl PreamblePatcher {
    /// The built-in substitutions.
    pub fn builtin() -> Self {
        let substitutions = BUILTIN
            .iter()
            .map(|b| Substitution {
                id: b.id.to_string(),
                pattern: Regex::new(b.pattern).expect("built-in preamble pattern compiles"),
                replacement: b.replacement.to_string(),
                global: b.global,
            })
            .collect();
        Self { substitutions }
    }

    pub fn empty() -> Self {
        Self {
            substitutions: Vec::new(),
        }
    }

    /// Append substitutions after the existing ones.
    pub fn with_substitutions(mut self, extra: impl IntoIterator<Item = Substitution>) -> Self {
        self.substitutions.extend(extra);
        self
    }

    pub fn substitutions(&self) -> &[Substitution] {
        &self.substitutions
    }

    pub fn ids(&self) -> Vec<&str> {
        self.substitutions.iter().map(|s| s.id.as_str()).collect()
    }

    /// Apply every substitution in order, each to the output of the previous.
    pub fn apply(&self, text: &str) -> PatchedPreamble {
        let mut current = text.to_string();
        let mut hits = Vec::with_capacity(self.substitutions.len());

        for sub in &self.substitutions {
            let limit = if sub.global { 0 } else { 1 };
            let count = match limit {
                0 => sub.pattern.find_iter(&current).count(),
                _ => usize::from(sub.pattern.is_match(&current)),
            };
            if count > 0 {
                current = sub
                    .pattern
                    .replacen(&current, limit, sub.replacement.as_str())
                    .into_owned();
            }
            debug!(substitution = %sub.id, count, "preamble substitution");
            hits.push((sub.id.clone(), count));
        }

        PatchedPreamble {
            text: current,
            hits,
        }
    }

    /// Match every substitution against the original text and splice once.
    ///
    /// Overlapping candidates resolve by leftmost start, ties by list order.
    /// A non-global substitution only contributes its first match.
    pub fn apply_single_pass(&self, text: &str) -> PatchedPreamble {
        struct Candidate {
            start: usize,
            end: usize,
            order: usize,
            replacement: String,
        }

        let mut candidates = Vec::new();
        for (order, sub) in self.substitutions.iter().enumerate() {
            let limit = if sub.global { usize::MAX } else { 1 };
            for caps in sub.pattern.captures_iter(text).take(limit) {
                let Some(whole) = caps.get(0) else { continue };
                let mut replacement = String::new();
                caps.expand(&sub.replacement, &mut replacement);
                candidates.push(Candidate {
                    start: whole.start(),
                    end: whole.end(),
                    order,
                    replacement,
                });
            }
        }
        candidates.sort_by_key(|c| (c.start, c.order));

        let mut counts = vec![0usize; self.substitutions.len()];
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut last_point = None;
        for c in candidates {
            if c.start < cursor || (c.start == c.end && last_point == Some(c.start)) {
                continue;
            }
            out.push_str(&text[cursor..c.start]);
            out.push_str(&c.replacement);
            cursor = c.end;
            last_point = (c.start == c.end).then_some(c.start);
            counts[c.order] += 1;
        }
        out.push_str(&text[cursor..]);

        let hits = self
            .substitutions
            .iter()
            .zip(counts)
            .map(|(sub, count)| (sub.id.clone(), count))
            .collect();
        PatchedPreamble { text: out, hits }
    }
}

impl Default for PreamblePatcher {
    fn default() -> Self {
        Self::builtin()
    }
}
