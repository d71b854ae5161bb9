//! Process-wide LRU structural cache for parsed/simplified DSL expressions
//! (component C5, spec §4.2 step 4).
//!
//! Grounded on the teacher's process-wide `OperatorRegistry`-style singleton
//! (`once_cell::Lazy` + a lock) and on the `lru` crate's `LruCache` used the
//! same way caching has been done elsewhere in the workspace: one global,
//! lock-guarded cache rather than a cache threaded through every call site.
//! Keyed on the whitespace-normalized raw expression, since tokenizing is
//! idempotent on that normal form and re-tokenizing every lookup would
//! defeat the point of caching.

use crate::token::Token;
use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

const DEFAULT_MAX_SIZE: usize = 1000;

struct Cache {
    inner: Option<LruCache<String, Vec<Token>>>,
    max_size: usize,
}

impl Cache {
    fn disabled() -> Self {
        Cache { inner: None, max_size: 0 }
    }

    fn with_capacity(max_size: usize) -> Self {
        if max_size == 0 {
            Cache::disabled()
        } else {
            Cache {
                inner: Some(LruCache::new(NonZeroUsize::new(max_size).unwrap())),
                max_size,
            }
        }
    }
}

static CACHE: Lazy<Mutex<Cache>> = Lazy::new(|| Mutex::new(Cache::with_capacity(DEFAULT_MAX_SIZE)));

/// Strip all whitespace so that `"a & b"` and `"a&b"` share a cache slot
/// (spec §4.2: the cache is "keyed on the parsed and simplified postfix
/// (whitespace-insensitive)").
fn normalize_key(expr: &str) -> String {
    expr.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Reconfigure the cache's maximum size. `0` disables caching entirely
/// (every `parse` call re-tokenizes/re-converts/re-simplifies from scratch).
/// Clears any entries already cached under the previous configuration.
pub fn configure(max_size: usize) {
    *CACHE.lock() = Cache::with_capacity(max_size);
}

/// Look up the simplified postfix stream for `expr`, if cached.
pub fn get(expr: &str) -> Option<Vec<Token>> {
    let mut cache = CACHE.lock();
    let key = normalize_key(expr);
    cache.inner.as_mut().and_then(|c| c.get(&key).cloned())
}

/// Store the simplified postfix stream for `expr`.
pub fn put(expr: &str, postfix: Vec<Token>) {
    let mut cache = CACHE.lock();
    let key = normalize_key(expr);
    if let Some(inner) = cache.inner.as_mut() {
        inner.put(key, postfix);
    }
}

/// Drop all cached entries without changing the configured capacity.
pub fn clear() {
    let mut cache = CACHE.lock();
    let max_size = cache.max_size;
    if max_size > 0 {
        cache.inner = Some(LruCache::new(NonZeroUsize::new(max_size).unwrap()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub enabled: bool,
    pub size: usize,
    pub max_size: usize,
}

pub fn stats() -> CacheStats {
    let cache = CACHE.lock();
    CacheStats {
        enabled: cache.inner.is_some(),
        size: cache.inner.as_ref().map(|c| c.len()).unwrap_or(0),
        max_size: cache.max_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cache tests share one process-wide static, so each test resets the
    // configuration it needs rather than assuming a pristine default.

    #[test]
    fn disabling_cache_means_nothing_is_stored() {
        configure(0);
        put("a & b", vec![Token::Ident("a".into())]);
        assert!(get("a & b").is_none());
        let s = stats();
        assert!(!s.enabled);
        assert_eq!(s.size, 0);
        configure(DEFAULT_MAX_SIZE);
    }

    #[test]
    fn put_then_get_round_trips() {
        configure(10);
        clear();
        let postfix = vec![Token::Ident("a".into()), Token::Ident("b".into()), Token::And];
        put("a & b", postfix.clone());
        assert_eq!(get("a & b"), Some(postfix));
        configure(DEFAULT_MAX_SIZE);
    }

    #[test]
    fn whitespace_variants_share_a_key() {
        configure(10);
        clear();
        let postfix = vec![Token::Ident("a".into())];
        put("a&b", postfix.clone());
        assert_eq!(get("a & b"), Some(postfix.clone()));
        put("a  &  b", postfix.clone());
        assert_eq!(get("a & b"), Some(postfix));
        configure(DEFAULT_MAX_SIZE);
    }

    #[test]
    fn clear_empties_without_disabling() {
        configure(10);
        put("x", vec![Token::Ident("x".into())]);
        assert_eq!(stats().size, 1);
        clear();
        assert_eq!(stats().size, 0);
        assert!(stats().enabled);
        configure(DEFAULT_MAX_SIZE);
    }
}
