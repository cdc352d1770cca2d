//! Shared matcher predicates.

use crate::render::strip_parens;
use crate::syntax::{normalize_type, NodeId, NodeKind, SymbolKind, SyntaxTree};

/// Innermost method, constructor, lambda or initializer enclosing `id`.
pub fn enclosing_callable(tree: &SyntaxTree, id: NodeId) -> Option<NodeId> {
    tree.enclosing(id, NodeKind::is_callable)
}

/// Innermost class/interface/enum body enclosing `id`.
pub fn enclosing_type_body(tree: &SyntaxTree, id: NodeId) -> Option<NodeId> {
    tree.enclosing(id, NodeKind::is_member_list)
}

/// Type declaration owning a member list.
pub fn type_of_body(tree: &SyntaxTree, body: NodeId) -> Option<NodeId> {
    tree.ancestors(body)
        .find(|&ancestor| tree.kind(ancestor).is_type_declaration())
}

/// Direct child of `list` that contains (or is) `node`.
pub fn child_containing(tree: &SyntaxTree, list: NodeId, node: NodeId) -> Option<NodeId> {
    if tree.parent(node) == Some(list) {
        return Some(node);
    }
    tree.ancestors(node)
        .find(|&ancestor| tree.parent(ancestor) == Some(list))
}

/// Whether `node` sits inside a lambda, local class or anonymous class body
/// below `limit`.
pub fn crosses_nested_scope(tree: &SyntaxTree, node: NodeId, limit: NodeId) -> bool {
    tree.ancestors(node)
        .take_while(|&ancestor| ancestor != limit)
        .any(|ancestor| {
            matches!(
                tree.kind(ancestor),
                NodeKind::LambdaExpression | NodeKind::ClassBody | NodeKind::LocalClassDeclaration
            )
        })
}

/// Type name of a literal expression.
pub fn literal_type(tree: &SyntaxTree, expr: NodeId) -> Option<&'static str> {
    let text = tree.text(expr);
    match tree.kind(expr) {
        NodeKind::IntegerLiteral => Some(if text.ends_with(['l', 'L']) {
            "long"
        } else {
            "int"
        }),
        NodeKind::FloatLiteral => Some(if text.ends_with(['f', 'F']) {
            "float"
        } else {
            "double"
        }),
        NodeKind::CharacterLiteral => Some("char"),
        NodeKind::StringLiteral => Some("String"),
        NodeKind::True | NodeKind::False => Some("boolean"),
        _ => None,
    }
}

/// Statically known type of an expression, from literals, casts, object
/// creation and declared types of bound names. `None` when unknown.
pub fn expression_type(tree: &SyntaxTree, expr: NodeId) -> Option<String> {
    let expr = strip_parens(tree, expr);
    if let Some(literal) = literal_type(tree, expr) {
        return Some(literal.to_string());
    }
    match tree.kind(expr) {
        NodeKind::Identifier => bound_type(tree, expr),
        NodeKind::FieldAccess => {
            let field = tree.child_by_field(expr, "field")?;
            bound_type(tree, field)
        }
        NodeKind::CastExpression => tree
            .child_by_field(expr, "type")
            .map(|ty| normalize_type(tree.text(ty))),
        NodeKind::ObjectCreation => {
            if tree.child_by_field(expr, "type").is_none() || has_class_body(tree, expr) {
                return None;
            }
            let ty = normalize_type(tree.text(tree.child_by_field(expr, "type")?));
            (!ty.contains("<>")).then_some(ty)
        }
        NodeKind::UnaryExpression => {
            let operator = tree.child_by_field(expr, "operator")?;
            let operand = tree.child_by_field(expr, "operand")?;
            let operand_type = literal_type(tree, strip_parens(tree, operand))?;
            match (tree.node(operator).grammar_kind, operand_type) {
                ("-" | "+", "int" | "long" | "float" | "double") => Some(operand_type.to_string()),
                ("!", "boolean") => Some("boolean".to_string()),
                _ => None,
            }
        }
        _ => None,
    }
}

fn bound_type(tree: &SyntaxTree, name: NodeId) -> Option<String> {
    let symbol = tree.symbols().binding(name)?;
    let declared = &tree.symbols().symbol(symbol).declared_type;
    (!declared.is_empty() && declared != "var").then(|| declared.clone())
}

pub fn has_class_body(tree: &SyntaxTree, creation: NodeId) -> bool {
    tree.named_children(creation)
        .any(|child| tree.kind(child) == NodeKind::ClassBody)
}

/// Arguments of an argument list, comments excluded.
pub fn arguments(tree: &SyntaxTree, call: NodeId) -> Vec<NodeId> {
    tree.child_by_field(call, "arguments")
        .map(|args| tree.named_children(args).collect())
        .unwrap_or_default()
}

/// Expression evaluation cannot run user code, throw, or write state.
///
/// Operands of unary, binary and conditional operators must be known
/// primitives or known references: an unboxed `null` throws.
pub fn is_side_effect_free(tree: &SyntaxTree, expr: NodeId) -> bool {
    match tree.kind(expr) {
        kind if kind.is_literal() => true,
        NodeKind::Identifier
        | NodeKind::This
        | NodeKind::ClassLiteral
        | NodeKind::LambdaExpression => true,
        // `x::m` throws when `x` is null.
        NodeKind::MethodReference => tree.first_named_child(expr).is_some_and(|target| {
            match tree.kind(target) {
                NodeKind::Identifier => !is_variable_name(tree, target),
                NodeKind::This
                | NodeKind::Super
                | NodeKind::TypeIdentifier
                | NodeKind::ScopedTypeIdentifier
                | NodeKind::GenericType
                | NodeKind::ArrayType => true,
                _ => false,
            }
        }),
        NodeKind::ParenthesizedExpression => tree
            .first_named_child(expr)
            .is_some_and(|inner| is_side_effect_free(tree, inner)),
        NodeKind::UnaryExpression => tree
            .child_by_field(expr, "operand")
            .is_some_and(|operand| is_pure_primitive(tree, operand)),
        NodeKind::BinaryExpression => {
            let operator = tree
                .child_by_field(expr, "operator")
                .map(|op| tree.node(op).grammar_kind)
                .unwrap_or("");
            let (Some(left), Some(right)) = (
                tree.child_by_field(expr, "left"),
                tree.child_by_field(expr, "right"),
            ) else {
                return false;
            };
            match operator {
                // Division may throw; `+` may call toString on objects.
                "/" | "%" => false,
                "+" => is_constant(tree, left) && is_constant(tree, right),
                "==" | "!=" => {
                    (is_pure_primitive(tree, left) && is_pure_primitive(tree, right))
                        || (is_pure_reference(tree, left) && is_pure_reference(tree, right))
                }
                _ => is_pure_primitive(tree, left) && is_pure_primitive(tree, right),
            }
        }
        NodeKind::TernaryExpression => {
            let (Some(condition), Some(then), Some(otherwise)) = (
                tree.child_by_field(expr, "condition"),
                tree.child_by_field(expr, "consequence"),
                tree.child_by_field(expr, "alternative"),
            ) else {
                return false;
            };
            is_pure_primitive(tree, condition)
                && ((is_pure_primitive(tree, then) && is_pure_primitive(tree, otherwise))
                    || (is_pure_reference(tree, then) && is_pure_reference(tree, otherwise)))
        }
        NodeKind::FieldAccess => tree
            .child_by_field(expr, "object")
            .is_some_and(|object| tree.kind(object) == NodeKind::This),
        _ => false,
    }
}

pub fn is_primitive_type(ty: &str) -> bool {
    matches!(
        ty,
        "boolean" | "byte" | "short" | "char" | "int" | "long" | "float" | "double"
    )
}

/// Side-effect free and of primitive type, so reading it never unboxes.
pub fn is_pure_primitive(tree: &SyntaxTree, expr: NodeId) -> bool {
    let expr = strip_parens(tree, expr);
    match tree.kind(expr) {
        NodeKind::NullLiteral | NodeKind::StringLiteral => false,
        kind if kind.is_literal() => true,
        NodeKind::Identifier | NodeKind::FieldAccess => {
            is_side_effect_free(tree, expr)
                && expression_type(tree, expr).is_some_and(|ty| is_primitive_type(&ty))
        }
        NodeKind::UnaryExpression | NodeKind::BinaryExpression => {
            let concatenation = tree
                .descendants(expr)
                .any(|node| tree.kind(node) == NodeKind::StringLiteral);
            !concatenation && is_side_effect_free(tree, expr)
        }
        _ => false,
    }
}

/// Side-effect free and statically a reference, so it is never unboxed
/// by reference comparison.
fn is_pure_reference(tree: &SyntaxTree, expr: NodeId) -> bool {
    let expr = strip_parens(tree, expr);
    match tree.kind(expr) {
        NodeKind::NullLiteral | NodeKind::StringLiteral | NodeKind::This | NodeKind::ClassLiteral => true,
        NodeKind::Identifier | NodeKind::FieldAccess => {
            is_side_effect_free(tree, expr)
                && expression_type(tree, expr).is_some_and(|ty| !is_primitive_type(&ty))
        }
        _ => false,
    }
}

/// Compile-time constant built from literals and operators.
pub fn is_constant(tree: &SyntaxTree, expr: NodeId) -> bool {
    match tree.kind(expr) {
        kind if kind.is_literal() => kind != NodeKind::NullLiteral,
        NodeKind::ParenthesizedExpression | NodeKind::UnaryExpression => tree
            .named_children(expr)
            .all(|child| is_constant(tree, child)),
        NodeKind::BinaryExpression => {
            let (Some(left), Some(right)) = (
                tree.child_by_field(expr, "left"),
                tree.child_by_field(expr, "right"),
            ) else {
                return false;
            };
            is_constant(tree, left) && is_constant(tree, right)
        }
        _ => false,
    }
}

/// Statement (or single-statement block) that never completes normally.
pub fn ends_in_jump(tree: &SyntaxTree, stmt: NodeId) -> bool {
    match tree.kind(stmt) {
        kind if kind.is_jump() => true,
        NodeKind::Block => tree
            .statements(stmt)
            .last()
            .is_some_and(|&last| ends_in_jump(tree, last)),
        _ => false,
    }
}

/// Token-wise equality ignoring whitespace and comments.
pub fn same_tokens(tree: &SyntaxTree, a: NodeId, b: NodeId) -> bool {
    let left = leaf_tokens(tree, a);
    let right = leaf_tokens(tree, b);
    left.len() == right.len() && left.iter().zip(right.iter()).all(|(l, r)| l == r)
}

fn leaf_tokens(tree: &SyntaxTree, id: NodeId) -> Vec<&str> {
    std::iter::once(id)
        .chain(tree.descendants(id))
        .filter(|&node| tree.children(node).is_empty() && !tree.kind(node).is_comment())
        .map(|node| tree.text(node))
        .collect()
}

/// Comments anywhere inside `id`.
pub fn has_comments(tree: &SyntaxTree, id: NodeId) -> bool {
    tree.comments().within(tree.span(id)).next().is_some()
}

/// The only statement of a block, or the statement itself.
pub fn single_statement(tree: &SyntaxTree, stmt: NodeId) -> Option<NodeId> {
    if tree.kind(stmt) != NodeKind::Block {
        return Some(stmt);
    }
    match tree.statements(stmt).as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// An anonymous token child such as `(`, `else` or `while`.
pub fn token_child(tree: &SyntaxTree, id: NodeId, token: &str) -> Option<NodeId> {
    tree.children(id)
        .iter()
        .copied()
        .find(|&child| !tree.node(child).named && tree.node(child).grammar_kind == token)
}

/// Identifier text occurs anywhere inside `scope` (declared or referenced).
pub fn name_used_in(tree: &SyntaxTree, scope: NodeId, name: &str) -> bool {
    tree.descendants(scope)
        .any(|id| tree.kind(id) == NodeKind::Identifier && tree.text(id) == name)
}

/// Some `expr.name` access in the file does not resolve through the binder,
/// so references to a field called `name` may be invisible.
pub fn has_unresolved_member_access(tree: &SyntaxTree, name: &str) -> bool {
    tree.ids().any(|id| {
        tree.kind(id) == NodeKind::Identifier
            && tree.text(id) == name
            && tree.node(id).field == Some("field")
            && tree.symbols().binding(id).is_none()
    })
}

/// Whether the identifier names a local, parameter or field.
pub fn is_variable_name(tree: &SyntaxTree, id: NodeId) -> bool {
    tree.symbols().binding(id).is_some()
}

pub fn is_static_context(tree: &SyntaxTree, id: NodeId) -> bool {
    let Some(member) = tree.ancestors(id).find(|&ancestor| {
        matches!(
            tree.kind(ancestor),
            NodeKind::MethodDeclaration
                | NodeKind::FieldDeclaration
                | NodeKind::StaticInitializer
                | NodeKind::ConstructorDeclaration
        ) || tree.kind(ancestor).is_type_declaration()
    }) else {
        return true;
    };
    match tree.kind(member) {
        NodeKind::StaticInitializer => true,
        NodeKind::MethodDeclaration | NodeKind::FieldDeclaration => {
            tree.has_modifier(member, "static")
                || tree
                    .parent(member)
                    .is_some_and(|body| tree.kind(body) == NodeKind::InterfaceBody)
        }
        NodeKind::ConstructorDeclaration => false,
        _ => true,
    }
}

/// Whether a symbol is a local variable (not a parameter or field).
pub fn is_local(tree: &SyntaxTree, name: NodeId) -> bool {
    tree.symbols()
        .binding(name)
        .is_some_and(|symbol| tree.symbols().symbol(symbol).kind == SymbolKind::Local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::parse;

    fn value_of(tree: &SyntaxTree, name: &str) -> NodeId {
        let declarator = tree
            .ids()
            .find(|&id| {
                tree.kind(id) == NodeKind::VariableDeclarator
                    && tree
                        .child_by_field(id, "name")
                        .is_some_and(|n| tree.text(n) == name)
            })
            .unwrap();
        tree.child_by_field(declarator, "value").unwrap()
    }

    #[test]
    fn literal_and_declared_types() {
        let tree = parse(
            "class A { void f(String s) { long a = 5L; float b = 1f; int c = 3; String d = s; Object e = (Integer) c; } }",
        );
        assert_eq!(expression_type(&tree, value_of(&tree, "a")).as_deref(), Some("long"));
        assert_eq!(expression_type(&tree, value_of(&tree, "b")).as_deref(), Some("float"));
        assert_eq!(expression_type(&tree, value_of(&tree, "c")).as_deref(), Some("int"));
        assert_eq!(expression_type(&tree, value_of(&tree, "d")).as_deref(), Some("String"));
        assert_eq!(expression_type(&tree, value_of(&tree, "e")).as_deref(), Some("Integer"));
    }

    #[test]
    fn side_effect_analysis() {
        let tree = parse(
            "class A { void f(int x) { int a = x + 1; int b = x / 2; int c = g(); int d = -x; String e = \"a\" + x; } }",
        );
        assert!(is_side_effect_free(&tree, value_of(&tree, "a")));
        assert!(!is_side_effect_free(&tree, value_of(&tree, "b")));
        assert!(!is_side_effect_free(&tree, value_of(&tree, "c")));
        assert!(is_side_effect_free(&tree, value_of(&tree, "d")));
        assert!(!is_side_effect_free(&tree, value_of(&tree, "e")));
    }

    #[test]
    fn unboxing_operands_are_not_pure() {
        let tree = parse(
            "class A { void f(Integer boxed, Boolean flag, int x) { int a = boxed + 1; int b = -boxed; boolean c = boxed == null; boolean d = boxed == x; int e = flag ? x : 0; int g = x > 0 ? boxed : 0; Runnable h = boxed::hashCode; } }",
        );
        assert!(!is_side_effect_free(&tree, value_of(&tree, "a")));
        assert!(!is_side_effect_free(&tree, value_of(&tree, "b")));
        assert!(is_side_effect_free(&tree, value_of(&tree, "c")));
        assert!(!is_side_effect_free(&tree, value_of(&tree, "d")));
        assert!(!is_side_effect_free(&tree, value_of(&tree, "e")));
        assert!(!is_side_effect_free(&tree, value_of(&tree, "g")));
        assert!(!is_side_effect_free(&tree, value_of(&tree, "h")));
    }

    #[test]
    fn token_equality_ignores_layout_and_comments() {
        let tree = parse(
            "class A { void f() { if (a) { return 1; } if (b) {\n  return /* one */ 1;\n} if (c) { return 2; } } }",
        );
        let ifs: Vec<NodeId> = tree
            .ids()
            .filter(|&id| tree.kind(id) == NodeKind::IfStatement)
            .map(|id| tree.child_by_field(id, "consequence").unwrap())
            .collect();
        assert!(same_tokens(&tree, ifs[0], ifs[1]));
        assert!(!same_tokens(&tree, ifs[0], ifs[2]));
    }

    #[test]
    fn jump_detection() {
        let tree = parse("class A { int f() { { g(); return 1; } } }");
        let inner = tree
            .ids()
            .filter(|&id| tree.kind(id) == NodeKind::Block)
            .nth(1)
            .unwrap();
        assert!(ends_in_jump(&tree, inner));
    }

    #[test]
    fn static_context_detection() {
        let tree = parse("class A { int x; static void s() { g(); } void i() { h(); } }");
        let calls: Vec<NodeId> = tree
            .ids()
            .filter(|&id| tree.kind(id) == NodeKind::MethodInvocation)
            .collect();
        assert!(is_static_context(&tree, calls[0]));
        assert!(!is_static_context(&tree, calls[1]));
    }
}
