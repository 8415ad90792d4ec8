//! Node predicates for the built-in rules and the pre-order driver.

use crate::catalog::builtin::{
    bound_loader, default_export_head, default_export_installer, installer_function,
    invoke_getter, materialize_namespace, object_keys_loop, DEFAULT_EXPORT_TAIL,
};
use crate::catalog::ids;
use crate::compose::{Compositor, Offered};
use crate::edit::{Edit, Span};
use crate::pool::with_parser;
use crate::source::{Marker, UnitContext};
use crate::tree::errors::TreeError;
use tracing::debug;
use tree_sitter::Node;

const HARMONY_DEFAULT_EXPORT: &str = "/* harmony default export */";
const LOADER: &str = "__webpack_require__";

/// Edits one predicate wants for one node.
struct Rewrite {
    edits: Vec<(Span, String)>,
    /// The node was replaced wholesale; its descendants are not visited.
    skip_subtree: bool,
}

impl Rewrite {
    fn replace(node: Node<'_>, text: String) -> Self {
        Self {
            edits: vec![(span(node), text)],
            skip_subtree: true,
        }
    }

    fn call_after(node: Node<'_>) -> Self {
        Self {
            edits: vec![(Span::point(node.end_byte()), "()".to_string())],
            skip_subtree: false,
        }
    }
}

type Predicate = fn(Node<'_>, &UnitContext<'_>) -> Option<Rewrite>;

/// Built-in node rules, in catalog order.
const NODE_RULES: [(&str, Predicate); 12] = [
    (ids::ES_MODULE_MARKER, es_module_marker),
    (ids::EXPORT_INSTALLER, export_installer),
    (ids::BIND_LOADER, bind_loader),
    (ids::IMPORTED_GETTER, imported_getter),
    (ids::DEFAULT_EXPORT, default_export),
    (ids::CONCATENATED_DEFAULT_EXPORT, concatenated_default_export),
    (ids::MODULE_DEFAULT_GETTER, module_default_getter),
    (ids::OBJECT_KEYS_LOOP, object_keys),
    (ids::LOADER_MEMBER_GETTER, loader_member_getter),
    (ids::PURE_MEMBER_GETTER, pure_member_getter),
    (ids::EXTERNAL_MEMBER_GETTER, external_member_getter),
    (ids::STAR_IMPORT_FLATTEN, star_import_flatten),
];

/// Counters for one tree pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeRun {
    pub visited: usize,
    pub fired: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// The input already contained syntax errors
    pub input_had_errors: bool,
}

/// Walk the unit's syntax tree once and offer every built-in rewrite to `out`.
pub fn rewrite_tree(unit: &UnitContext<'_>, out: &mut Compositor<'_>) -> Result<TreeRun, TreeError> {
    rewrite_tree_filtered(unit, out, |_| true)
}

/// Like [`rewrite_tree`], limited to the built-in rules `enabled` accepts.
pub fn rewrite_tree_filtered(
    unit: &UnitContext<'_>,
    out: &mut Compositor<'_>,
    enabled: impl Fn(&str) -> bool,
) -> Result<TreeRun, TreeError> {
    let rules: Vec<(&str, Predicate)> = NODE_RULES
        .iter()
        .filter(|(rule_id, _)| enabled(*rule_id))
        .copied()
        .collect();

    let tree = with_parser(|parser| parser.parse(unit.text()))??;
    let root = tree.root_node();
    let mut run = TreeRun {
        input_had_errors: root.has_error(),
        ..TreeRun::default()
    };

    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        run.visited += 1;

        let fired = rules
            .iter()
            .find_map(|(rule_id, predicate)| predicate(node, unit).map(|r| (*rule_id, r)));

        let mut skip = false;
        if let Some((rule_id, rewrite)) = fired {
            run.fired += 1;
            skip = rewrite.skip_subtree;
            let edits = rewrite
                .edits
                .into_iter()
                .map(|(span, text)| Edit::against(unit.text(), span, text, rule_id))
                .collect();
            let offered = out
                .offer_group(edits)
                .map_err(|source| TreeError::InvalidEdit {
                    rule_id: rule_id.to_string(),
                    source,
                })?;
            match offered {
                Offered::Accepted => run.accepted += 1,
                Offered::Rejected(_) => run.rejected += 1,
            }
        }

        if !skip {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }

    debug!(
        visited = run.visited,
        fired = run.fired,
        rejected = run.rejected,
        "tree pass finished"
    );
    Ok(run)
}

fn span(node: Node<'_>) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

fn text<'u>(node: Node<'_>, unit: &UnitContext<'u>) -> &'u str {
    &unit.text()[node.byte_range()]
}

fn field<'t>(node: Node<'t>, name: &str) -> Option<Node<'t>> {
    node.child_by_field_name(name)
}

fn is_field_of(node: Node<'_>, parent: Node<'_>, name: &str) -> bool {
    parent.child_by_field_name(name) == Some(node)
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn arguments<'t>(call: Node<'t>) -> Vec<Node<'t>> {
    field(call, "arguments").map(named_children).unwrap_or_default()
}

fn string_content<'u>(node: Node<'_>, unit: &UnitContext<'u>) -> Option<&'u str> {
    if node.kind() != "string" {
        return None;
    }
    let quoted = text(node, unit);
    quoted.get(1..quoted.len().saturating_sub(1))
}

fn is_function(node: Node<'_>) -> bool {
    matches!(node.kind(), "function_expression" | "function")
}

fn is_chain(node: Node<'_>) -> bool {
    matches!(node.kind(), "member_expression" | "subscript_expression")
}

/// Identifier bound to the value of an assignment or declaration.
fn is_assigned_value(node: Node<'_>) -> bool {
    match node.parent() {
        Some(parent) if parent.kind() == "assignment_expression" => {
            is_field_of(node, parent, "right")
        }
        Some(parent) if parent.kind() == "variable_declarator" => {
            is_field_of(node, parent, "value")
        }
        _ => false,
    }
}

fn follows_default_export_comment(node: Node<'_>, unit: &UnitContext<'_>) -> bool {
    node.prev_sibling()
        .is_some_and(|prev| prev.kind() == "comment" && text(prev, unit) == HARMONY_DEFAULT_EXPORT)
}

/// `__webpack_exports__["key"]` target of a default export, returning the key.
fn exports_slot<'u>(node: Node<'_>, unit: &UnitContext<'u>) -> Option<&'u str> {
    if node.kind() != "subscript_expression" {
        return None;
    }
    let object = field(node, "object")?;
    if text(object, unit) != "__webpack_exports__" {
        return None;
    }
    string_content(field(node, "index")?, unit)
}

fn contains_call(node: Node<'_>, callee: &str, unit: &UnitContext<'_>) -> bool {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        if node.kind() == "call_expression"
            && field(node, "function").is_some_and(|f| text(f, unit) == callee)
        {
            return true;
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    false
}

fn es_module_marker(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "call_expression" || text(field(node, "function")?, unit) != "Object.defineProperty" {
        return None;
    }
    let args = arguments(node);
    let [target, key, descriptor] = args.as_slice() else {
        return None;
    };
    if string_content(*key, unit)? != "__esModule" || descriptor.kind() != "object" {
        return None;
    }
    let [pair] = named_children(*descriptor)[..] else {
        return None;
    };
    let is_value_true = pair.kind() == "pair"
        && field(pair, "key").is_some_and(|k| text(k, unit) == "value")
        && field(pair, "value").is_some_and(|v| v.kind() == "true");
    if !is_value_true {
        return None;
    }
    Some(Rewrite::replace(
        node,
        format!("{}.__esModule = true", text(*target, unit)),
    ))
}

fn export_installer(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "assignment_expression"
        || text(field(node, "left")?, unit) != "__webpack_require__.d"
    {
        return None;
    }
    let function = field(node, "right")?;
    if !is_function(function) {
        return None;
    }
    let params = named_children(field(function, "parameters")?);
    let [exports, name, getter] = params.as_slice() else {
        return None;
    };
    if params.iter().any(|p| p.kind() != "identifier")
        || !contains_call(field(function, "body")?, "Object.defineProperty", unit)
    {
        return None;
    }
    Some(Rewrite {
        edits: vec![(
            span(function),
            installer_function(text(*exports, unit), text(*name, unit), text(*getter, unit)),
        )],
        skip_subtree: true,
    })
}

fn bind_loader(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "call_expression"
        || text(field(node, "function")?, unit) != "__webpack_require__.bind"
    {
        return None;
    }
    let args = arguments(node);
    let [this_arg, module_id] = args.as_slice() else {
        return None;
    };
    if this_arg.kind() != "null" {
        return None;
    }
    Some(Rewrite::replace(node, bound_loader(text(*module_id, unit))))
}

fn imported_getter(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "subscript_expression" {
        return None;
    }
    let object = field(node, "object")?;
    if object.kind() != "identifier"
        || !text(object, unit)
            .to_ascii_uppercase()
            .contains("__WEBPACK_IMPORTED_MODULE")
        || field(node, "index")?.kind() != "string"
    {
        return None;
    }
    Some(Rewrite::replace(node, invoke_getter(text(node, unit))))
}

fn default_export(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "expression_statement" || !follows_default_export_comment(node, unit) {
        return None;
    }
    let assignment = node.named_child(0)?;
    if assignment.kind() != "assignment_expression" {
        return None;
    }
    let left = field(assignment, "left")?;
    let right = field(assignment, "right")?;
    let key = exports_slot(left, unit)?;
    Some(Rewrite {
        edits: vec![
            (Span::new(left.start_byte(), right.start_byte()), default_export_head(key)),
            (
                Span::new(right.end_byte(), node.end_byte()),
                DEFAULT_EXPORT_TAIL.to_string(),
            ),
        ],
        skip_subtree: false,
    })
}

fn concatenated_default_export(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "variable_declaration" || !follows_default_export_comment(node, unit) {
        return None;
    }
    let [declarator] = named_children(node)[..] else {
        return None;
    };
    let name = field(declarator, "name")?;
    let value = field(declarator, "value")?;
    if name.kind() != "identifier" || value.kind() != "assignment_expression" {
        return None;
    }
    let key = exports_slot(field(value, "left")?, unit)?;
    let exported = field(value, "right")?;
    Some(Rewrite {
        edits: vec![
            (Span::new(value.start_byte(), exported.start_byte()), String::new()),
            (
                Span::point(node.end_byte()),
                default_export_installer(key, text(name, unit)),
            ),
        ],
        skip_subtree: false,
    })
}

fn module_default_getter(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "subscript_expression" || !is_assigned_value(node) {
        return None;
    }
    let object = field(node, "object")?;
    if object.kind() != "identifier" || text(object, unit) != "module" {
        return None;
    }
    if string_content(field(node, "index")?, unit)? != "default" {
        return None;
    }
    Some(Rewrite::call_after(node))
}

fn object_keys(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "call_expression"
        || text(field(node, "function")?, unit) != "Object.keys"
        || node.parent()?.kind() != "return_statement"
    {
        return None;
    }
    let [map] = arguments(node)[..] else {
        return None;
    };
    if map.kind() != "identifier" {
        return None;
    }
    Some(Rewrite::replace(node, object_keys_loop(text(map, unit))))
}

fn loader_member_getter(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if !is_chain(node) {
        return None;
    }
    // The getter is the first link read off the loader call.
    let loaded = field(node, "object")?;
    if loaded.kind() != "call_expression" {
        return None;
    }
    let callee = field(loaded, "function")?;
    if callee.kind() != "identifier" || text(callee, unit) != LOADER {
        return None;
    }
    Some(Rewrite::call_after(node))
}

fn pure_member_getter(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "member_expression" {
        return None;
    }
    let object = field(node, "object")?;
    let property = field(node, "property")?;
    let property_name = text(property, unit);
    if object.kind() != "identifier"
        || !unit.is_marked(Marker::PureAnnotated, text(object, unit))
        || property.kind() != "property_identifier"
        || property_name.is_empty()
        || !property_name.bytes().all(|b| b.is_ascii_lowercase())
    {
        return None;
    }
    Some(Rewrite::call_after(node))
}

fn external_member_getter(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "subscript_expression" {
        return None;
    }
    let object = field(node, "object")?;
    let index = field(node, "index")?;
    if object.kind() != "identifier"
        || !unit.is_marked(Marker::ExternalModule, text(object, unit))
        || index.kind() != "string"
        || !text(index, unit).starts_with('"')
    {
        return None;
    }
    Some(Rewrite::replace(node, invoke_getter(text(node, unit))))
}

fn star_import_flatten(node: Node<'_>, unit: &UnitContext<'_>) -> Option<Rewrite> {
    if node.kind() != "identifier" || !is_assigned_value(node) {
        return None;
    }
    let name = text(node, unit);
    if !unit.is_marked(Marker::ExternalModule, name) {
        return None;
    }
    Some(Rewrite::replace(node, materialize_namespace(name)))
}
