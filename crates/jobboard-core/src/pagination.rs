//! Pagination types for list operations.

use crate::{JobBoardError, JobBoardResult};
use serde::{Deserialize, Serialize};

/// A request for a page of results.
///
/// Pages are 1-indexed. Both fields are always at least 1 once constructed
/// through [`PageRequest::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    /// The page number (1-indexed).
    pub page: u32,
    /// The number of items per page.
    pub limit: u32,
}

impl PageRequest {
    /// The default page size.
    pub const DEFAULT_LIMIT: u32 = 10;
    /// The maximum allowed page size.
    pub const MAX_LIMIT: u32 = 100;

    /// Creates a new page request.
    ///
    /// Rejects a zero page or limit; clamps the limit to [`Self::MAX_LIMIT`].
    pub fn new(page: u32, limit: u32) -> JobBoardResult<Self> {
        if page == 0 {
            return Err(JobBoardError::validation("page must be at least 1"));
        }
        if limit == 0 {
            return Err(JobBoardError::validation("limit must be at least 1"));
        }

        Ok(Self {
            page,
            limit: limit.min(Self::MAX_LIMIT),
        })
    }

    /// Creates a page request for the first page with default size.
    #[must_use]
    pub const fn first() -> Self {
        Self {
            page: 1,
            limit: Self::DEFAULT_LIMIT,
        }
    }

    /// Returns the number of items to skip.
    #[must_use]
    pub const fn offset(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// Information about a page of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// The current page number (1-indexed).
    pub page: u32,
    /// The number of items per page.
    pub limit: u32,
    /// The total number of items across all pages.
    pub total_elements: u64,
    /// The total number of pages.
    pub total_pages: u64,
}

impl PageInfo {
    /// Creates a new page info.
    #[must_use]
    pub fn new(page: u32, limit: u32, total_elements: u64) -> Self {
        let total_pages = if limit > 0 {
            total_elements.div_ceil(u64::from(limit))
        } else {
            0
        };

        Self {
            page,
            limit,
            total_elements,
            total_pages,
        }
    }
}

/// A page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items on this page.
    pub content: Vec<T>,
    /// Information about this page.
    #[serde(flatten)]
    pub info: PageInfo,
}

impl<T> Page<T> {
    /// Creates a new page.
    #[must_use]
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        Self {
            content,
            info: PageInfo::new(request.page, request.limit, total_elements),
        }
    }

    /// Creates an empty page.
    #[must_use]
    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    /// Maps the page content to a different type.
    #[must_use]
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            info: self.info,
        }
    }

    /// Returns true if the page is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Returns the number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns the total number of elements across all pages.
    #[must_use]
    pub const fn total_elements(&self) -> u64 {
        self.info.total_elements
    }

    /// Returns true if there is a next page.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        (self.info.page as u64) < self.info.total_pages
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.into_iter()
    }
}
