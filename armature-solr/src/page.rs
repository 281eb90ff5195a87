//! Pagination and sorting.

use std::fmt;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Sort on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Field name.
    pub field: String,
    /// Direction.
    pub direction: Direction,
}

/// Ordered list of sort clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    /// No sorting (relevance order).
    pub fn unsorted() -> Self {
        Self::default()
    }

    /// Sort by a single field.
    pub fn by(field: impl Into<String>, direction: Direction) -> Self {
        Self::unsorted().then(field, direction)
    }

    /// Ascending on a field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::by(field, Direction::Asc)
    }

    /// Descending on a field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::by(field, Direction::Desc)
    }

    /// Add a secondary sort clause.
    pub fn then(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(Order {
            field: field.into(),
            direction,
        });
        self
    }

    /// Sort clauses in priority order.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Whether any clause is set.
    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    /// Render the `sort` request parameter, e.g. `id desc,name asc`.
    pub fn to_param(&self) -> Option<String> {
        if self.orders.is_empty() {
            return None;
        }
        Some(self.to_string())
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .orders
            .iter()
            .map(|o| format!("{} {}", o.field, o.direction.as_str()))
            .collect();
        f.write_str(&parts.join(","))
    }
}

/// Request for a page of results. Pages are zero-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
    sort: Sort,
}

impl PageRequest {
    /// Default page size.
    pub const DEFAULT_SIZE: u32 = 10;

    /// Create a page request. A size of zero is raised to one.
    pub fn of(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.max(1),
            sort: Sort::unsorted(),
        }
    }

    /// Create a sorted page request.
    pub fn sorted(page: u32, size: u32, sort: Sort) -> Self {
        Self::of(page, size).with_sort(sort)
    }

    /// First page of the given size.
    pub fn first(size: u32) -> Self {
        Self::of(0, size)
    }

    /// Replace the sort.
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Zero-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Page size.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Sort specification.
    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Offset of the first row (`start`).
    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }

    /// Request for the following page.
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    /// Request for the preceding page, or the first one.
    pub fn previous_or_first(&self) -> Self {
        Self {
            page: self.page.saturating_sub(1),
            ..self.clone()
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(Self::DEFAULT_SIZE)
    }
}

/// A page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    total_elements: u64,
    request: PageRequest,
}

impl<T> Page<T> {
    /// Create a page.
    pub fn new(content: Vec<T>, total_elements: u64, request: PageRequest) -> Self {
        Self {
            content,
            total_elements,
            request,
        }
    }

    /// Documents on this page.
    pub fn content(&self) -> &[T] {
        &self.content
    }

    /// Consume the page, returning its documents.
    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    /// Total number of matching documents across all pages.
    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    /// Number of documents on this page.
    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    /// Total number of pages.
    pub fn total_pages(&self) -> u64 {
        self.total_elements.div_ceil(u64::from(self.request.size()))
    }

    /// Zero-based page number.
    pub fn number(&self) -> u32 {
        self.request.page()
    }

    /// Page size that was requested.
    pub fn size(&self) -> u32 {
        self.request.size()
    }

    /// The request this page answers.
    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// Whether a following page exists.
    pub fn has_next(&self) -> bool {
        u64::from(self.number()) + 1 < self.total_pages()
    }

    /// Whether a preceding page exists.
    pub fn has_previous(&self) -> bool {
        self.number() > 0
    }

    /// Whether this page holds no documents.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Map the content, keeping paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total_elements: self.total_elements,
            request: self.request,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_param() {
        assert_eq!(Sort::unsorted().to_param(), None);
        assert_eq!(Sort::desc("id").to_param().as_deref(), Some("id desc"));
        assert_eq!(
            Sort::asc("cat").then("popularity", Direction::Desc).to_string(),
            "cat asc,popularity desc"
        );
    }

    #[test]
    fn test_page_request_offsets() {
        let req = PageRequest::of(2, 10);
        assert_eq!(req.offset(), 20);
        assert_eq!(req.next().page(), 3);
        assert_eq!(PageRequest::of(0, 10).previous_or_first().page(), 0);
        assert_eq!(PageRequest::of(0, 0).size(), 1);
        assert_eq!(PageRequest::default().size(), 10);
    }

    #[test]
    fn test_page_navigation() {
        let page = Page::new(vec![1, 2, 3], 25, PageRequest::of(1, 10));
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_previous());
        assert_eq!(page.number_of_elements(), 3);

        let last = Page::new(vec![1], 21, PageRequest::of(2, 10));
        assert!(!last.has_next());

        let empty: Page<u8> = Page::new(vec![], 0, PageRequest::first(10));
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_next());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_page_map() {
        let page = Page::new(vec![1, 2], 2, PageRequest::first(5)).map(|n| n * 10);
        assert_eq!(page.content(), &[10, 20]);
        assert_eq!(page.total_elements(), 2);
    }
}
