//! Cache key generators for consistent key naming.
//!
//! Every key produced here starts with `<namespace>:`, so
//! [`namespace_pattern`] matches all of a namespace's entries and nothing else.

use crate::error::{CacheError, CacheResult};
use jobboard_core::PageRequest;
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Characters a namespace may not contain.
///
/// `:` is the key separator; the rest are glob metacharacters that would make
/// the invalidation pattern match keys outside the namespace.
const RESERVED: &[u8] = b":*?[]\\";

/// Logical grouping of cache keys belonging to one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Namespace(Cow<'static, str>);

impl Namespace {
    /// Creates a namespace, rejecting values that would break key isolation.
    pub fn new(name: impl Into<String>) -> CacheResult<Self> {
        let name = name.into();
        match check(name.as_bytes()) {
            Ok(()) => Ok(Self(Cow::Owned(name))),
            Err(reason) => Err(CacheError::InvalidNamespace {
                namespace: name,
                reason,
            }),
        }
    }

    /// Creates a namespace from a literal.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty or contains a reserved character. In a
    /// `const` context this fails the build instead.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        if check(name.as_bytes()).is_err() {
            panic!("invalid cache namespace");
        }
        Self(Cow::Borrowed(name))
    }

    /// Returns the namespace as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

const fn check(name: &[u8]) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("namespace must not be empty");
    }

    let mut i = 0;
    while i < name.len() {
        let mut j = 0;
        while j < RESERVED.len() {
            if name[i] == RESERVED[j] {
                return Err("namespace must not contain ':' or glob characters");
            }
            j += 1;
        }
        i += 1;
    }
    Ok(())
}

/// Parameters of a paginated, searchable list read.
///
/// The search term is normalized on construction; two queries that differ only
/// in search casing or surrounding whitespace are equal and share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    page: PageRequest,
    search: String,
}

impl ListQuery {
    /// Creates a list query from a validated page request.
    #[must_use]
    pub fn new(page: PageRequest, search: &str) -> Self {
        Self {
            page,
            search: normalize_search(search),
        }
    }

    /// Creates a list query from raw page and limit values.
    pub fn from_parts(page: u32, limit: u32, search: &str) -> CacheResult<Self> {
        let page = PageRequest::new(page, limit)
            .map_err(|e| CacheError::InvalidQuery(e.to_string()))?;
        Ok(Self::new(page, search))
    }

    /// Returns the page request.
    #[must_use]
    pub const fn page_request(&self) -> PageRequest {
        self.page
    }

    /// Returns the 1-based page number.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page.page
    }

    /// Returns the page size.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.page.limit
    }

    /// Returns the normalized search term; empty means no filter.
    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(PageRequest::first(), "")
    }
}

/// Normalizes a free-text search term.
///
/// Both the list key and the source-of-truth filter must use this, otherwise
/// two requests could share a key while returning different results.
#[must_use]
pub fn normalize_search(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Generate the cache key for one page of a list read.
#[must_use]
pub fn list_key(namespace: &Namespace, query: &ListQuery) -> String {
    format!(
        "{}:list:page:{}:limit:{}:search:{}",
        namespace,
        query.page(),
        query.limit(),
        query.search()
    )
}

/// Generate the cache key for a single entity.
#[must_use]
pub fn detail_key(namespace: &Namespace, id: impl fmt::Display) -> String {
    format!("{}:item:{}", namespace, id)
}

/// Pattern matching every key in a namespace.
#[must_use]
pub fn namespace_pattern(namespace: &Namespace) -> String {
    format!("{}:*", namespace)
}
