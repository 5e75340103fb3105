use dubox_core::{AppError, AppResult};
use serde::Serialize;

/// Page size used when a request does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Largest page size a request may ask for.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Page size bounds applied to every paged request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagingConfig {
    default_page_size: u32,
    max_page_size: u32,
}

impl PagingConfig {
    /// Creates validated bounds.
    pub fn new(default_page_size: u32, max_page_size: u32) -> AppResult<Self> {
        if default_page_size == 0 || max_page_size == 0 {
            return Err(AppError::Validation(
                "page sizes must be greater than zero".to_owned(),
            ));
        }

        if default_page_size > max_page_size {
            return Err(AppError::Validation(format!(
                "default page size {default_page_size} exceeds maximum page size {max_page_size}"
            )));
        }

        Ok(Self {
            default_page_size,
            max_page_size,
        })
    }

    /// Returns the default page size.
    #[must_use]
    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    /// Returns the maximum page size.
    #[must_use]
    pub fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// Clamps raw request values into a valid page instead of rejecting
    /// them. Pages below one become page one, sizes below one fall back to
    /// the default and oversized pages shrink to the maximum.
    #[must_use]
    pub fn normalize(&self, page: i64, page_size: i64) -> Page {
        let number = if page < 1 {
            1
        } else {
            u32::try_from(page).unwrap_or(u32::MAX)
        };

        let size = if page_size < 1 {
            self.default_page_size
        } else {
            u32::try_from(page_size)
                .unwrap_or(u32::MAX)
                .min(self.max_page_size)
        };

        Page { number, size }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Normalized paging directive. Only [`PagingConfig::normalize`] creates
/// pages, so both numbers are always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u32,
    size: u32,
}

impl Page {
    /// One-based page number.
    #[must_use]
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Rows per page.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Rows skipped before this page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }

    /// Rows fetched for this page.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }
}

/// One page of results with the total across all pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paged<T> {
    /// Rows of this page.
    pub items: Vec<T>,
    /// One-based page number.
    pub page: u32,
    /// Requested page size.
    pub page_size: u32,
    /// Matching rows across all pages.
    pub total_count: u64,
    /// Number of pages needed for `total_count`.
    pub total_pages: u64,
}

impl<T> Paged<T> {
    /// Wraps one page of rows.
    #[must_use]
    pub fn new(items: Vec<T>, page: Page, total_count: u64) -> Self {
        Self {
            items,
            page: page.number(),
            page_size: page.size(),
            total_count,
            total_pages: total_count.div_ceil(page.limit()),
        }
    }

    /// Empty result for a page.
    #[must_use]
    pub fn empty(page: Page) -> Self {
        Self::new(Vec::new(), page, 0)
    }

    /// Wraps an unpaged result as a single page holding every row.
    #[must_use]
    pub fn unpaged(items: Vec<T>) -> Self {
        let total_count = items.len() as u64;
        Self {
            page: 1,
            page_size: u32::try_from(items.len()).unwrap_or(u32::MAX),
            total_count,
            total_pages: u64::from(total_count > 0),
            items,
        }
    }

    /// Converts the rows while keeping the paging metadata.
    pub fn map<U>(self, transform: impl FnMut(T) -> U) -> Paged<U> {
        Paged {
            items: self.items.into_iter().map(transform).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}
