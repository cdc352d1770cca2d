//! Thread-local compilation cache for template patterns.
//!
//! Template rules run once per pass per file, always with the same handful of
//! pattern strings, so compiled ast-grep patterns are kept per thread. The
//! cache is capped at 256 entries and cleared wholesale when full.

use ast_grep_core::Pattern;
use ast_grep_language::SupportLang;
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static PATTERN_CACHE: RefCell<HashMap<String, Pattern>> =
        RefCell::new(HashMap::new());
}

/// Compiled Java pattern for `pattern_str`, compiling it on first use.
pub fn java_pattern(pattern_str: &str) -> Pattern {
    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(pattern) = cache.get(pattern_str) {
            return pattern.clone();
        }
        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }
        let compiled = Pattern::new(pattern_str, SupportLang::Java);
        cache.insert(pattern_str.to_string(), compiled.clone());
        compiled
    })
}

pub fn clear_cache() {
    PATTERN_CACHE.with(|cache| cache.borrow_mut().clear());
}

pub fn cache_size() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_pattern_is_compiled_once() {
        clear_cache();
        java_pattern("$A.equals($B)");
        java_pattern("$A.equals($B)");
        java_pattern("new String($S)");
        assert_eq!(cache_size(), 2);
        clear_cache();
        assert_eq!(cache_size(), 0);
    }
}
