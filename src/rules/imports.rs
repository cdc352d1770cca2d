//! Replace fully qualified type names with simple names plus an import.
//!
//! All qualified names of a file are handled by one candidate whose rewrites
//! and import insertion apply together. A name is left alone when its simple
//! form could mean something else: a type of that name declared in the file,
//! an import or qualified use with another package, or an unqualified use
//! that no existing import pins down.

use crate::edit::{Candidate, Rewrite, Widening};
use crate::rules::support::has_comments;
use crate::rules::{MatchContext, MatchError, Rule, RuleDescriptor, Shape};
use crate::syntax::{normalize_type, NodeId, NodeKind, SyntaxTree};
use std::collections::{BTreeMap, HashMap, HashSet};

pub struct ImportQualifiedNames {
    descriptor: RuleDescriptor,
}

impl ImportQualifiedNames {
    pub fn new() -> Self {
        Self {
            descriptor: RuleDescriptor::new(
                "import_qualified_names",
                "Import fully qualified type names and use their simple names",
                Shape::NameIntroducing,
            ),
        }
    }
}

/// Existing imports and package of a compilation unit.
#[derive(Debug, Default)]
struct Header {
    package: Option<String>,
    /// Simple name to fully qualified name of single-type imports.
    single: HashMap<String, String>,
    has_wildcard: bool,
    /// Offset after which new imports go, and whether imports already exist.
    insert_at: usize,
    after_imports: bool,
}

impl Header {
    fn read(tree: &SyntaxTree) -> Self {
        let mut header = Header::default();
        for id in tree.named_children(tree.root()) {
            match tree.kind(id) {
                NodeKind::PackageDeclaration => {
                    header.package = tree
                        .named_children(id)
                        .find(|&child| {
                            matches!(tree.kind(child), NodeKind::ScopedIdentifier | NodeKind::Identifier)
                        })
                        .map(|name| normalize_type(tree.text(name)));
                    if !header.after_imports {
                        header.insert_at = tree.span_with_trailing_comments(id).end;
                    }
                }
                NodeKind::ImportDeclaration => {
                    header.insert_at = tree.span_with_trailing_comments(id).end;
                    header.after_imports = true;
                    let text = normalize_type(tree.text(id));
                    let Some(path) = text
                        .strip_prefix("import")
                        .and_then(|rest| rest.strip_suffix(';'))
                    else {
                        continue;
                    };
                    if path.starts_with("static") {
                        continue;
                    }
                    if path.ends_with(".*") {
                        header.has_wildcard = true;
                    } else if let Some((_, simple)) = path.rsplit_once('.') {
                        header.single.insert(simple.to_string(), path.to_string());
                    }
                }
                _ => {}
            }
        }
        header
    }
}

/// `a.b.C` split into qualifier and simple name; only lowercase package
/// segments followed by one capitalized type name qualify.
fn split_qualified(text: &str) -> Option<(String, String)> {
    let text = normalize_type(text);
    let (qualifier, simple) = text.rsplit_once('.')?;
    let package_like = qualifier
        .split('.')
        .all(|segment| segment.chars().next().is_some_and(|c| c.is_ascii_lowercase()));
    let type_like = simple.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    (package_like && type_like).then(|| (qualifier.to_string(), simple.to_string()))
}

fn declared_type_names(tree: &SyntaxTree) -> HashSet<&str> {
    tree.ids()
        .filter_map(|id| {
            if tree.kind(id).is_type_declaration() {
                tree.child_by_field(id, "name").map(|name| tree.text(name))
            } else if tree.node(id).grammar_kind == "type_parameter" {
                tree.named_children(id)
                    .find(|&child| matches!(tree.kind(child), NodeKind::TypeIdentifier | NodeKind::Identifier))
                    .map(|name| tree.text(name))
            } else {
                None
            }
        })
        .collect()
}

/// Simple names used without qualification as types or static call targets.
fn unqualified_names(tree: &SyntaxTree) -> HashSet<&str> {
    tree.ids()
        .filter(|&id| {
            let parent_scoped = tree
                .parent(id)
                .is_some_and(|parent| tree.kind(parent) == NodeKind::ScopedTypeIdentifier);
            match tree.kind(id) {
                NodeKind::TypeIdentifier => !parent_scoped,
                NodeKind::Identifier => {
                    tree.symbols().binding(id).is_none() && tree.node(id).field == Some("object")
                }
                _ => false,
            }
        })
        .map(|id| tree.text(id))
        .collect()
}

fn in_header(tree: &SyntaxTree, id: NodeId) -> bool {
    tree.enclosing(id, |kind| {
        matches!(kind, NodeKind::ImportDeclaration | NodeKind::PackageDeclaration)
    })
    .is_some()
}

struct Occurrences {
    qualifier: String,
    nodes: Vec<NodeId>,
}

impl Rule for ImportQualifiedNames {
    fn descriptor(&self) -> &RuleDescriptor {
        &self.descriptor
    }

    fn find(&self, cx: &MatchContext<'_>) -> Result<Vec<Candidate>, MatchError> {
        let tree = cx.tree;
        let mut by_name: BTreeMap<String, Occurrences> = BTreeMap::new();
        let mut ambiguous: HashSet<String> = HashSet::new();
        for id in tree.ids() {
            if tree.kind(id) != NodeKind::ScopedTypeIdentifier
                || tree
                    .parent(id)
                    .is_some_and(|parent| tree.kind(parent) == NodeKind::ScopedTypeIdentifier)
                || in_header(tree, id)
            {
                continue;
            }
            let Some((qualifier, simple)) = split_qualified(tree.text(id)) else {
                continue;
            };
            if has_comments(tree, id) {
                ambiguous.insert(simple.clone());
            }
            let entry = by_name.entry(simple.clone()).or_insert_with(|| Occurrences {
                qualifier: qualifier.clone(),
                nodes: Vec::new(),
            });
            if entry.qualifier != qualifier {
                ambiguous.insert(simple);
                continue;
            }
            entry.nodes.push(id);
        }
        if by_name.is_empty() {
            return Ok(Vec::new());
        }

        let header = Header::read(tree);
        let declared = declared_type_names(tree);
        let unqualified = unqualified_names(tree);
        let mut rewrites = Vec::new();
        let mut imports = Vec::new();
        let mut labels = Vec::new();
        let mut anchor = None;
        for (simple, occurrences) in &by_name {
            let fqn = format!("{}.{simple}", occurrences.qualifier);
            let imported = header.single.get(simple);
            let exact = imported == Some(&fqn);
            if ambiguous.contains(simple)
                || declared.contains(simple.as_str())
                || (imported.is_some() && !exact)
                || (unqualified.contains(simple.as_str()) && !exact)
            {
                continue;
            }
            let implicit = occurrences.qualifier == "java.lang"
                || header.package.as_deref() == Some(occurrences.qualifier.as_str());
            if occurrences.qualifier == "java.lang" && header.has_wildcard && !exact {
                continue;
            }
            if !implicit && !exact {
                imports.push(fqn.clone());
            }
            for &node in &occurrences.nodes {
                anchor.get_or_insert(node);
                rewrites.push(Rewrite::replace(tree, tree.span(node), simple.as_str()));
            }
            labels.push(format!("use simple name {simple} for {fqn}"));
        }
        let Some(anchor) = anchor else {
            return Ok(Vec::new());
        };

        let mut candidate = Candidate {
            anchor,
            rewrites,
            labels,
            widening: Widening::None,
            extra_keys: Vec::new(),
            droppable_comments: Vec::new(),
        };
        if !imports.is_empty() {
            imports.sort();
            let newline = cx.style.newline;
            let lines: Vec<String> = imports.iter().map(|fqn| format!("import {fqn};")).collect();
            let text = if header.after_imports {
                lines
                    .iter()
                    .map(|line| format!("{newline}{line}"))
                    .collect::<String>()
            } else if header.insert_at > 0 {
                format!("{newline}{newline}{}", lines.join(newline))
            } else {
                format!("{}{newline}{newline}", lines.join(newline))
            };
            candidate = candidate.with_rewrite(Rewrite::insert(header.insert_at, text));
        }
        Ok(vec![candidate])
    }
}
