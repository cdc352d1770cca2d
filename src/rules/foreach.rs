//! Convert `for (int i = 0; i < a.length; i++)` over an array into an
//! enhanced for loop when the index is only used to read `a[i]`.

use crate::edit::{Candidate, Rewrite, Widening};
use crate::rules::support::{enclosing_type_body, has_comments, name_used_in, token_child};
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{normalize_type, NodeId, NodeKind, Span, SymbolId, SyntaxTree};

pub struct IndexedLoopToForeach {
    descriptor: RuleDescriptor,
}

impl IndexedLoopToForeach {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "indexed_loop_to_foreach",
                "Convert indexed loops over arrays to enhanced for loops",
                Shape::CrossCutting,
            ),
        }
    }
}

struct IndexedLoop {
    index: SymbolId,
    array: SymbolId,
    element_type: String,
    body: NodeId,
}

fn declared_single(tree: &SyntaxTree, decl: NodeId) -> Option<(NodeId, SymbolId)> {
    let declarators: Vec<NodeId> = tree.children_by_field(decl, "declarator").collect();
    let [declarator] = declarators.as_slice() else {
        return None;
    };
    Some((*declarator, tree.symbols().declared_by(*declarator)?))
}

/// `int i = 0; i < a.length; i++` with `a` a local, parameter or field of array type.
fn match_header(tree: &SyntaxTree, stmt: NodeId) -> Option<IndexedLoop> {
    let init = tree.child_by_field(stmt, "init")?;
    if tree.kind(init) != NodeKind::LocalVariableDeclaration
        || normalize_type(tree.text(tree.child_by_field(init, "type")?)) != "int"
    {
        return None;
    }
    let (declarator, index) = declared_single(tree, init)?;
    let start = tree.child_by_field(declarator, "value")?;
    if tree.kind(start) != NodeKind::IntegerLiteral || tree.text(start) != "0" {
        return None;
    }

    let condition = tree.child_by_field(stmt, "condition")?;
    let (left, operator, right) = (
        tree.child_by_field(condition, "left")?,
        tree.child_by_field(condition, "operator")?,
        tree.child_by_field(condition, "right")?,
    );
    if tree.kind(condition) != NodeKind::BinaryExpression
        || tree.node(operator).grammar_kind != "<"
        || tree.symbols().binding(left) != Some(index)
        || tree.kind(right) != NodeKind::FieldAccess
        || tree.child_by_field(right, "field").map(|f| tree.text(f)) != Some("length")
    {
        return None;
    }
    let array_name = tree.child_by_field(right, "object")?;
    if tree.kind(array_name) != NodeKind::Identifier {
        return None;
    }
    let array = tree.symbols().binding(array_name)?;

    let updates: Vec<NodeId> = tree.children_by_field(stmt, "update").collect();
    let [update] = updates.as_slice() else {
        return None;
    };
    let name = &tree.symbols().symbol(index).name;
    let step = normalize_type(tree.text(*update));
    if ![format!("{name}++"), format!("++{name}"), format!("{name}+=1")].contains(&step) {
        return None;
    }

    let element_type = tree
        .symbols()
        .symbol(array)
        .declared_type
        .strip_suffix("[]")?
        .to_string();
    Some(IndexedLoop {
        index,
        array,
        element_type,
        body: tree.child_by_field(stmt, "body")?,
    })
}

/// `a[i]` read, never written.
fn is_element_read(tree: &SyntaxTree, reference: NodeId, array: SymbolId) -> Option<NodeId> {
    let access = tree.parent(reference)?;
    if tree.kind(access) != NodeKind::ArrayAccess || tree.node(reference).field != Some("index") {
        return None;
    }
    let target = tree.child_by_field(access, "array")?;
    if tree.symbols().binding(target) != Some(array) {
        return None;
    }
    let written = tree.parent(access).is_some_and(|parent| match tree.kind(parent) {
        NodeKind::AssignmentExpression => tree.node(access).field == Some("left"),
        NodeKind::UpdateExpression => true,
        _ => false,
    });
    (!written).then_some(access)
}

/// Leading `T e = a[i];` of the body, reusable as the loop variable.
fn element_declaration(
    tree: &SyntaxTree,
    body: NodeId,
    element_type: &str,
    accesses: &[NodeId],
) -> Option<(NodeId, NodeId)> {
    if tree.kind(body) != NodeKind::Block {
        return None;
    }
    let first = *tree.statements(body).first()?;
    if tree.kind(first) != NodeKind::LocalVariableDeclaration || has_comments(tree, first) {
        return None;
    }
    let declared = normalize_type(tree.text(tree.child_by_field(first, "type")?));
    if declared != element_type && declared != "var" {
        return None;
    }
    let (declarator, _) = declared_single(tree, first)?;
    let value = tree.child_by_field(declarator, "value")?;
    accesses.contains(&value).then_some((first, declarator))
}

fn fresh_name(tree: &SyntaxTree, scope: NodeId, array_name: &str) -> String {
    let base = match array_name.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && stem != array_name => stem,
        _ => "element",
    };
    let taken = tree.symbols().names_declared_within(tree, scope);
    let free = |name: &str| !taken.contains(name) && !name_used_in(tree, scope, name);
    if free(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}{n}"))
        .find(|name| free(name))
        .unwrap_or_else(|| base.to_string())
}

fn convert(tree: &SyntaxTree, stmt: NodeId) -> Option<Candidate> {
    let found = match_header(tree, stmt)?;
    let symbols = tree.symbols();
    let body_span = tree.span(found.body);
    let in_body = |node: NodeId| body_span.contains(tree.span(node));

    let mut accesses = Vec::new();
    for &reference in symbols.references(found.index) {
        if !in_body(reference) {
            continue;
        }
        accesses.push(is_element_read(tree, reference, found.array)?);
    }
    if symbols
        .references(found.array)
        .iter()
        .any(|&reference| in_body(reference) && symbols.is_write(tree, reference))
    {
        return None;
    }

    let open = token_child(tree, stmt, "(")?;
    let close = token_child(tree, stmt, ")")?;
    let header = Span::new(tree.span(open).start, tree.span(close).end);
    if tree.comments().within(header).next().is_some() {
        return None;
    }

    let array_name = symbols.symbol(found.array).name.as_str();
    let reused = element_declaration(tree, found.body, &found.element_type, &accesses);
    let (declaration, name) = match reused {
        Some((decl, declarator)) => {
            let prefix = &tree.source()[tree.span(decl).start..tree.span(declarator).start];
            let name = tree.text(tree.child_by_field(declarator, "name")?);
            (format!("{} {name}", prefix.trim_end()), name.to_string())
        }
        None => {
            // Lambdas may not shadow locals of the enclosing method either.
            let scope = tree
                .enclosing(stmt, |kind| {
                    matches!(
                        kind,
                        NodeKind::MethodDeclaration
                            | NodeKind::ConstructorDeclaration
                            | NodeKind::StaticInitializer
                    )
                })
                .or_else(|| enclosing_type_body(tree, stmt))
                .unwrap_or(stmt);
            let name = fresh_name(tree, scope, array_name);
            (format!("{} {name}", found.element_type), name)
        }
    };

    let mut candidate = Candidate::new(
        stmt,
        Rewrite::replace(tree, header, format!("({declaration} : {array_name})")),
        format!("iterate over {array_name} with enhanced for"),
    )
    .widen(Widening::Statement);
    let skipped = reused.map(|(decl, _)| tree.deletion_span(decl));
    for access in accesses {
        if skipped.is_some_and(|span| span.contains(tree.span(access))) {
            continue;
        }
        candidate = candidate.with_rewrite(Rewrite::replace(tree, tree.span(access), name.as_str()));
    }
    if let Some(span) = skipped {
        candidate = candidate.with_rewrite(Rewrite::delete(tree, span));
    }
    Some(candidate)
}

impl Rule for IndexedLoopToForeach {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        Ok(tree
            .ids()
            .filter(|&id| tree.kind(id) == NodeKind::ForStatement)
            .filter_map(|id| convert(tree, id))
            .collect())
    }
}
