//! Single-file name binding.
//!
//! Resolves identifiers in expression position to the local variable,
//! parameter or field they denote by walking lexical scopes outwards. Names
//! declared outside the compilation unit stay unresolved, which every rule
//! treats as "unknown" and abstains on.

use crate::syntax::kind::NodeKind;
use crate::syntax::tree::{NodeId, SyntaxTree};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Local,
    Parameter,
    Field { is_static: bool },
}

/// A declared name and its binding information.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Declared type with whitespace removed; empty for inferred lambda parameters.
    pub declared_type: String,
    /// Node holding the name: variable declarator or parameter.
    pub declarator: NodeId,
    /// Enclosing declaration statement, field or parameter node.
    pub declaration: NodeId,
    /// Node the name is scoped to (block, callable, class body, loop).
    pub scope: NodeId,
}

impl Symbol {
    pub fn is_field(&self) -> bool {
        matches!(self.kind, SymbolKind::Field { .. })
    }

    pub fn is_static_field(&self) -> bool {
        matches!(self.kind, SymbolKind::Field { is_static: true })
    }
}

/// Declared symbols plus identifier-to-symbol bindings for one tree.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_scope: HashMap<NodeId, Vec<SymbolId>>,
    bindings: HashMap<NodeId, SymbolId>,
    references: Vec<Vec<NodeId>>,
}

impl SymbolTable {
    pub(crate) fn build(tree: &SyntaxTree) -> Self {
        let mut table = SymbolTable::default();
        for id in tree.ids() {
            table.declare_from(tree, id);
        }
        table.references = vec![Vec::new(); table.symbols.len()];
        for id in tree.ids() {
            if let Some(symbol) = table.resolve_reference(tree, id) {
                table.bindings.insert(id, symbol);
                table.references[symbol.index()].push(id);
            }
        }
        table
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(index, symbol)| (SymbolId(index as u32), symbol))
    }

    /// Symbol an identifier (or `this.x` field identifier) refers to.
    pub fn binding(&self, node: NodeId) -> Option<SymbolId> {
        self.bindings.get(&node).copied()
    }

    /// Every resolved reference to `symbol`, in source order.
    pub fn references(&self, symbol: SymbolId) -> &[NodeId] {
        &self.references[symbol.index()]
    }

    /// Symbol declared by a variable declarator or parameter node.
    pub fn declared_by(&self, declarator: NodeId) -> Option<SymbolId> {
        self.iter()
            .find(|(_, symbol)| symbol.declarator == declarator)
            .map(|(id, _)| id)
    }

    pub fn declared_in(&self, scope: NodeId) -> &[SymbolId] {
        self.by_scope.get(&scope).map_or(&[], Vec::as_slice)
    }

    /// Resolve `name` as if it were written at node `at`.
    pub fn resolve(&self, tree: &SyntaxTree, at: NodeId, name: &str) -> Option<SymbolId> {
        let position = tree.span(at).start;
        for scope in std::iter::once(at).chain(tree.ancestors(at)) {
            let Some(candidates) = self.by_scope.get(&scope) else {
                continue;
            };
            for &candidate in candidates.iter().rev() {
                let symbol = self.symbol(candidate);
                if symbol.name != name {
                    continue;
                }
                let visible = match symbol.kind {
                    SymbolKind::Local => tree.span(symbol.declarator).start <= position,
                    SymbolKind::Parameter | SymbolKind::Field { .. } => true,
                };
                if visible {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Names of all locals and parameters declared inside `node`.
    pub fn names_declared_within(&self, tree: &SyntaxTree, node: NodeId) -> HashSet<&str> {
        self.symbols
            .iter()
            .filter(|symbol| !symbol.is_field())
            .filter(|symbol| {
                symbol.scope == node
                    || tree.is_ancestor(node, symbol.scope)
                    || tree.is_ancestor(node, symbol.declarator)
            })
            .map(|symbol| symbol.name.as_str())
            .collect()
    }

    /// Whether a reference assigns to its symbol.
    pub fn is_write(&self, tree: &SyntaxTree, reference: NodeId) -> bool {
        let mut target = reference;
        if let Some(parent) = tree.parent(reference) {
            if tree.kind(parent) == NodeKind::FieldAccess
                && tree.node(reference).field == Some("field")
            {
                target = parent;
            }
        }
        let Some(parent) = tree.parent(target) else {
            return false;
        };
        match tree.kind(parent) {
            NodeKind::AssignmentExpression => tree.node(target).field == Some("left"),
            NodeKind::UpdateExpression => true,
            _ => false,
        }
    }

    fn declare(&mut self, symbol: Symbol) {
        let id = SymbolId(self.symbols.len() as u32);
        self.by_scope.entry(symbol.scope).or_default().push(id);
        self.symbols.push(symbol);
    }

    fn declare_from(&mut self, tree: &SyntaxTree, id: NodeId) {
        let node = tree.node(id);
        match node.kind {
            NodeKind::FieldDeclaration | NodeKind::LocalVariableDeclaration => {
                let Some(scope) = node.parent else { return };
                let kind = if node.kind == NodeKind::FieldDeclaration {
                    SymbolKind::Field {
                        is_static: tree.has_modifier(id, "static")
                            || tree.kind(scope) == NodeKind::InterfaceBody,
                    }
                } else {
                    SymbolKind::Local
                };
                let declared_type = tree
                    .child_by_field(id, "type")
                    .map(|ty| normalize_type(tree.text(ty)))
                    .unwrap_or_default();
                let declarators: Vec<NodeId> = tree.children_by_field(id, "declarator").collect();
                for declarator in declarators {
                    if let Some(name) = tree.child_by_field(declarator, "name") {
                        self.declare(Symbol {
                            name: tree.text(name).to_string(),
                            kind,
                            declared_type: declared_type.clone(),
                            declarator,
                            declaration: id,
                            scope,
                        });
                    }
                }
            }
            NodeKind::FormalParameter | NodeKind::SpreadParameter | NodeKind::CatchFormalParameter => {
                let scope = match node.parent {
                    Some(parent) if tree.kind(parent) == NodeKind::FormalParameters => {
                        tree.parent(parent)
                    }
                    other => other,
                };
                let Some(scope) = scope else { return };
                let (name, declared_type) = parameter_name_and_type(tree, id);
                if let Some(name) = name {
                    self.declare(Symbol {
                        name: tree.text(name).to_string(),
                        kind: SymbolKind::Parameter,
                        declared_type,
                        declarator: id,
                        declaration: id,
                        scope,
                    });
                }
            }
            NodeKind::EnhancedForStatement => {
                if let Some(name) = tree.child_by_field(id, "name") {
                    self.declare(Symbol {
                        name: tree.text(name).to_string(),
                        kind: SymbolKind::Local,
                        declared_type: tree
                            .child_by_field(id, "type")
                            .map(|ty| normalize_type(tree.text(ty)))
                            .unwrap_or_default(),
                        declarator: name,
                        declaration: id,
                        scope: id,
                    });
                }
            }
            NodeKind::LambdaExpression => {
                let Some(parameters) = tree.child_by_field(id, "parameters") else {
                    return;
                };
                let names: Vec<NodeId> = match tree.node(parameters).grammar_kind {
                    "identifier" => vec![parameters],
                    "inferred_parameters" => tree
                        .named_children(parameters)
                        .filter(|&child| tree.kind(child) == NodeKind::Identifier)
                        .collect(),
                    _ => Vec::new(),
                };
                for name in names {
                    self.declare(Symbol {
                        name: tree.text(name).to_string(),
                        kind: SymbolKind::Parameter,
                        declared_type: String::new(),
                        declarator: name,
                        declaration: id,
                        scope: id,
                    });
                }
            }
            NodeKind::Other if node.grammar_kind == "resource" => {
                let Some(name) = tree.child_by_field(id, "name") else {
                    return;
                };
                let Some(scope) = tree.enclosing(id, |kind| {
                    matches!(
                        kind,
                        NodeKind::TryWithResourcesStatement | NodeKind::TryStatement
                    )
                }) else {
                    return;
                };
                self.declare(Symbol {
                    name: tree.text(name).to_string(),
                    kind: SymbolKind::Local,
                    declared_type: tree
                        .child_by_field(id, "type")
                        .map(|ty| normalize_type(tree.text(ty)))
                        .unwrap_or_default(),
                    declarator: id,
                    declaration: id,
                    scope,
                });
            }
            _ => {}
        }
    }

    fn resolve_reference(&self, tree: &SyntaxTree, id: NodeId) -> Option<SymbolId> {
        let node = tree.node(id);
        if node.kind != NodeKind::Identifier {
            return None;
        }
        let parent = node.parent?;
        let parent_kind = tree.node(parent).grammar_kind;
        let name = tree.text(id);

        // `this.name` binds to a field of the innermost enclosing type.
        if parent_kind == "field_access" && node.field == Some("field") {
            let object = tree.child_by_field(parent, "object")?;
            if tree.kind(object) != NodeKind::This {
                return None;
            }
            let body = tree.enclosing(parent, NodeKind::is_member_list)?;
            return self
                .declared_in(body)
                .iter()
                .copied()
                .find(|&candidate| {
                    let symbol = self.symbol(candidate);
                    symbol.is_field() && symbol.name == name
                });
        }

        if !is_expression_name(parent_kind, node.field) {
            return None;
        }
        self.resolve(tree, id, name)
    }
}

fn is_expression_name(parent_kind: &str, field: Option<&str>) -> bool {
    match (parent_kind, field) {
        ("variable_declarator", Some("name"))
        | ("formal_parameter", Some("name"))
        | ("catch_formal_parameter", Some("name"))
        | ("enhanced_for_statement", Some("name"))
        | ("resource", Some("name"))
        | ("method_declaration", Some("name"))
        | ("constructor_declaration", Some("name"))
        | ("class_declaration", Some("name"))
        | ("interface_declaration", Some("name"))
        | ("enum_declaration", Some("name"))
        | ("record_declaration", Some("name"))
        | ("annotation_type_declaration", Some("name"))
        | ("method_invocation", Some("name"))
        | ("field_access", Some("field"))
        | ("lambda_expression", Some("parameters"))
        | ("enum_constant", Some("name"))
        | ("element_value_pair", Some("key"))
        | ("marker_annotation", _)
        | ("annotation", _) => false,
        (
            "inferred_parameters" | "labeled_statement" | "break_statement" | "continue_statement"
            | "scoped_identifier" | "package_declaration" | "import_declaration"
            | "method_reference" | "switch_label" | "spread_parameter",
            _,
        ) => false,
        _ => true,
    }
}

fn parameter_name_and_type(tree: &SyntaxTree, id: NodeId) -> (Option<NodeId>, String) {
    let declared_type = tree
        .child_by_field(id, "type")
        .or_else(|| {
            tree.named_children(id)
                .find(|&child| !matches!(tree.kind(child), NodeKind::Modifiers | NodeKind::VariableDeclarator))
        })
        .map(|ty| normalize_type(tree.text(ty)))
        .unwrap_or_default();
    let name = tree.child_by_field(id, "name").or_else(|| {
        tree.named_children(id)
            .find(|&child| tree.kind(child) == NodeKind::VariableDeclarator)
            .and_then(|declarator| tree.child_by_field(declarator, "name"))
    });
    if tree.kind(id) == NodeKind::SpreadParameter {
        return (name, format!("{declared_type}[]"));
    }
    (name, declared_type)
}

/// Type text with whitespace removed, so `List< String >` equals `List<String>`.
pub fn normalize_type(text: &str) -> String {
    text.split_whitespace().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::JavaParser;

    fn parse(source: &str) -> SyntaxTree {
        JavaParser::new().unwrap().parse_tree(source).unwrap()
    }

    fn symbol_named<'a>(tree: &'a SyntaxTree, name: &str) -> (SymbolId, &'a Symbol) {
        tree.symbols()
            .iter()
            .find(|(_, symbol)| symbol.name == name)
            .unwrap()
    }

    #[test]
    fn resolves_locals_parameters_and_fields() {
        let tree = parse(
            "class A {\n  int count;\n  static int total;\n  int f(int p) {\n    int x = p;\n    return x + count + total;\n  }\n}\n",
        );
        let (x, symbol) = symbol_named(&tree, "x");
        assert_eq!(symbol.kind, SymbolKind::Local);
        assert_eq!(symbol.declared_type, "int");
        assert_eq!(tree.symbols().references(x).len(), 1);

        let (p, _) = symbol_named(&tree, "p");
        assert_eq!(tree.symbols().references(p).len(), 1);

        let (_, count) = symbol_named(&tree, "count");
        assert_eq!(count.kind, SymbolKind::Field { is_static: false });
        let (_, total) = symbol_named(&tree, "total");
        assert!(total.is_static_field());
    }

    #[test]
    fn local_shadows_field() {
        let tree = parse(
            "class A {\n  int v;\n  void f() {\n    int v = 1;\n    g(v);\n  }\n}\n",
        );
        let field = tree
            .symbols()
            .iter()
            .find(|(_, symbol)| symbol.name == "v" && symbol.is_field())
            .map(|(id, _)| id)
            .unwrap();
        assert!(tree.symbols().references(field).is_empty());
    }

    #[test]
    fn this_field_access_binds_to_field() {
        let tree = parse("class A {\n  int v;\n  void f(int v) {\n    this.v = v;\n  }\n}\n");
        let field = tree
            .symbols()
            .iter()
            .find(|(_, symbol)| symbol.name == "v" && symbol.is_field())
            .map(|(id, _)| id)
            .unwrap();
        let refs = tree.symbols().references(field);
        assert_eq!(refs.len(), 1);
        assert!(tree.symbols().is_write(&tree, refs[0]));
    }

    #[test]
    fn method_names_are_not_references() {
        let tree = parse("class A {\n  int size;\n  void f() {\n    size();\n  }\n  void size() {}\n}\n");
        let (size, _) = symbol_named(&tree, "size");
        assert!(tree.symbols().references(size).is_empty());
    }

    #[test]
    fn use_before_declaration_does_not_resolve_to_later_local() {
        let tree = parse("class A {\n  void f() {\n    g(y);\n    int y = 2;\n  }\n}\n");
        let (y, _) = symbol_named(&tree, "y");
        assert!(tree.symbols().references(y).is_empty());
    }

    #[test]
    fn type_text_is_normalized() {
        assert_eq!(normalize_type("Map< String, Integer >"), "Map<String,Integer>");
    }
}
