//! `Integer.valueOf(s).intValue()` and `new Integer(s).intValue()` become
//! `Integer.parseInt(s)`, for every primitive wrapper with a parse method.
//!
//! Only string arguments of known type qualify, so overloads taking a
//! primitive never change meaning. Arbitrary-precision types are not wrappers
//! and are left alone.

use crate::edit::Candidate;
use crate::rules::support::{arguments, expression_type, has_class_body};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

pub struct PrimitiveParsing {
    descriptor: RuleDescriptor,
}

struct Wrapper {
    name: &'static str,
    unbox: &'static str,
    parse: &'static str,
    radix: bool,
}

const WRAPPERS: &[Wrapper] = &[
    Wrapper { name: "Integer", unbox: "intValue", parse: "parseInt", radix: true },
    Wrapper { name: "Long", unbox: "longValue", parse: "parseLong", radix: true },
    Wrapper { name: "Short", unbox: "shortValue", parse: "parseShort", radix: true },
    Wrapper { name: "Byte", unbox: "byteValue", parse: "parseByte", radix: true },
    Wrapper { name: "Float", unbox: "floatValue", parse: "parseFloat", radix: false },
    Wrapper { name: "Double", unbox: "doubleValue", parse: "parseDouble", radix: false },
    Wrapper { name: "Boolean", unbox: "booleanValue", parse: "parseBoolean", radix: false },
];

impl PrimitiveParsing {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "primitive_parsing",
                "Parse primitives directly instead of boxing and unboxing",
                Shape::LocalReplace,
            ),
        }
    }
}

/// Wrapper class name and its arguments from `W.valueOf(..)` or `new W(..)`.
fn boxing_call(tree: &SyntaxTree, id: NodeId) -> Option<(&str, Vec<NodeId>)> {
    match tree.kind(id) {
        NodeKind::MethodInvocation => {
            let object = tree.child_by_field(id, "object")?;
            let name = tree.child_by_field(id, "name")?;
            if tree.kind(object) != NodeKind::Identifier
                || tree.symbols().binding(object).is_some()
                || tree.text(name) != "valueOf"
            {
                return None;
            }
            Some((tree.text(object), arguments(tree, id)))
        }
        NodeKind::ObjectCreation => {
            let ty = tree.child_by_field(id, "type")?;
            if tree.kind(ty) != NodeKind::TypeIdentifier || has_class_body(tree, id) {
                return None;
            }
            Some((tree.text(ty), arguments(tree, id)))
        }
        _ => None,
    }
}

fn is_string(tree: &SyntaxTree, expr: NodeId) -> bool {
    expression_type(tree, expr).is_some_and(|ty| ty == "String" || ty == "java.lang.String")
}

fn is_int(tree: &SyntaxTree, expr: NodeId) -> bool {
    expression_type(tree, expr).is_some_and(|ty| ty == "int")
}

impl Rule for PrimitiveParsing {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let mut found = Vec::new();
        for id in tree.ids() {
            if tree.kind(id) != NodeKind::MethodInvocation || !arguments(tree, id).is_empty() {
                continue;
            }
            let (Some(object), Some(name)) = (
                tree.child_by_field(id, "object"),
                tree.child_by_field(id, "name"),
            ) else {
                continue;
            };
            let Some((class, args)) = boxing_call(tree, object) else {
                continue;
            };
            let Some(wrapper) = WRAPPERS
                .iter()
                .find(|w| w.name == class && w.unbox == tree.text(name))
            else {
                continue;
            };
            let accepted = match args.as_slice() {
                [text] => is_string(tree, *text),
                [text, radix] => wrapper.radix && is_string(tree, *text) && is_int(tree, *radix),
                _ => false,
            };
            if !accepted {
                continue;
            }
            let rendered: Vec<&str> = args.iter().map(|&arg| tree.text(arg)).collect();
            let text = format!("{}.{}({})", wrapper.name, wrapper.parse, rendered.join(", "));
            found.push(Candidate::replace_node(
                tree,
                id,
                text,
                format!("use {}.{}", wrapper.name, wrapper.parse),
            ));
        }
        Ok(found)
    }
}
