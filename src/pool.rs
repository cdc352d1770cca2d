//! Thread-local parser pooling.
//!
//! Each worker thread keeps one Java parser alive and reuses it for every
//! compilation unit and every reparse between passes.

use crate::syntax::{JavaParser, SyntaxError};
use std::cell::RefCell;

thread_local! {
    static JAVA_PARSER: RefCell<Option<JavaParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// On first call per thread, creates new parser. Subsequent calls reuse
/// the same parser instance.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use java_cleanup::pool::with_parser;
///
/// let tree = with_parser(|parser| parser.parse_tree("class A {}"))??;
/// assert!(!tree.has_errors());
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, SyntaxError>
where
    F: FnOnce(&mut JavaParser) -> R,
{
    JAVA_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(JavaParser::new()?);
        }
        slot.as_mut().map(f).ok_or(SyntaxError::LanguageSet)
    })
}
