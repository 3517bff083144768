//! Fixed-size offset pagination over already-ordered sequences.

/// Page size applied to every public feed route unless overridden in settings.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A 1-based page number. Construction never fails; anything unusable
/// collapses to page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageNumber(usize);

impl PageNumber {
    pub fn first() -> Self {
        Self(1)
    }

    /// Parse a raw `?page=` query value. Absent, non-numeric, zero, and
    /// negative values all fall back to the first page.
    pub fn from_query(raw: Option<&str>) -> Self {
        let parsed = raw
            .map(str::trim)
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|value| *value > 0);
        Self(parsed.unwrap_or(1))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of an ordered sequence.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Slice `items` into the requested page.
///
/// A request past the last page clamps to the last page instead of erroring.
/// Empty input still yields one (empty) page so callers always have a page
/// to render.
pub fn paginate<T>(items: Vec<T>, page_size: usize, requested: PageNumber) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let number = requested.get().min(total_pages);
    let offset = (number - 1) * page_size;

    let items: Vec<T> = items.into_iter().skip(offset).take(page_size).collect();

    Page {
        items,
        number,
        total_items,
        total_pages,
        has_prev: number > 1,
        has_next: number < total_pages,
    }
}
