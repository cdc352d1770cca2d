use crate::pool;
use crate::syntax::errors::SyntaxError;
use crate::syntax::tree::SyntaxTree;

/// Turn the ERROR/MISSING nodes of a tree into a result.
pub fn check_tree(tree: &SyntaxTree) -> Result<(), SyntaxError> {
    let errors = tree.error_nodes();
    match errors.len() {
        0 => Ok(()),
        1 => Err(SyntaxError::SyntaxError {
            byte_start: errors[0].span.start,
            byte_end: errors[0].span.end,
        }),
        n => Err(SyntaxError::MultipleSyntaxErrors { count: n }),
    }
}

/// Validate that Java source code has no syntax errors.
pub fn validate_syntax(source: &str) -> Result<(), SyntaxError> {
    let tree = pool::with_parser(|parser| parser.parse_tree(source))??;
    check_tree(&tree)
}

/// Check if a code snippet is valid as a specific syntactic category.
pub fn validate_snippet(snippet: &str, category: SnippetCategory) -> Result<(), SyntaxError> {
    let wrapped = match category {
        SnippetCategory::Member => format!("class __Wrapper__ {{ {snippet} }}"),
        SnippetCategory::Statement => format!("class __Wrapper__ {{ void __f__() {{ {snippet} }} }}"),
        SnippetCategory::Expression => {
            format!("class __Wrapper__ {{ void __f__() {{ Object __v__ = {snippet}; }} }}")
        }
    };
    validate_syntax(&wrapped)
}

/// Category of code snippet for validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetCategory {
    /// A class member (field, method, nested type)
    Member,
    /// One or more statements
    Statement,
    /// An expression
    Expression,
}
