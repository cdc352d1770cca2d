use crate::syntax::errors::SyntaxError;
use crate::syntax::tree::SyntaxTree;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Parser, Tree};

/// Tree-sitter parser wrapper for Java source code.
pub struct JavaParser {
    parser: Parser,
}

impl JavaParser {
    pub fn new() -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        // The Java grammar ships with ast-grep-language.
        let ts_lang = SupportLang::Java.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| SyntaxError::LanguageSet)?;
        Ok(Self { parser })
    }

    /// Parse source code into a raw tree-sitter tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, SyntaxError> {
        self.parser
            .parse(source, None)
            .ok_or(SyntaxError::ParseFailed)
    }

    /// Parse into the syntax arena. The tree is returned even when it holds
    /// ERROR nodes; callers decide whether that is fatal.
    pub fn parse_tree(&mut self, source: &str) -> Result<SyntaxTree, SyntaxError> {
        let ts_tree = self.parse(source)?;
        SyntaxTree::from_tree_sitter(source.to_string(), &ts_tree)
    }
}
