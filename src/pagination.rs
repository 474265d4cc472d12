/// Number of books shown on one library page.
pub const LIBRARY_PAGE_SIZE: usize = 8;

/// Pagination structure for lists shown as inline keyboards.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Paginated<T> {
    /// All items.
    pub items: Vec<T>,
    /// Current page, starting at 1.
    pub page: usize,
    /// Items per page.
    pub page_size: usize,
    /// Number of items.
    pub total_items: usize,
    /// Number of pages.
    pub total_pages: usize,
}

impl<T> Paginated<T> {
    /// Wraps `items`. Pages are 1-based and an out of range page is clamped.
    pub fn new(items: Vec<T>, page: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let total_items = items.len();
        let total_pages = total_items.div_ceil(page_size);
        let page = page.clamp(1, total_pages.max(1));

        Paginated { items, page, page_size, total_items, total_pages }
    }

    /// A page follows the current one.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// A page precedes the current one.
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// There are no items.
    pub fn is_empty(&self) -> bool {
        self.total_items == 0
    }

    /// Items of the current page.
    pub fn get_page_items(&self) -> &[T] {
        let start = ((self.page - 1) * self.page_size).min(self.total_items);
        let end = (start + self.page_size).min(self.total_items);
        &self.items[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages() {
        let paginated = Paginated::new((1..=20).collect::<Vec<_>>(), 2, 8);

        assert_eq!(paginated.total_pages, 3);
        assert_eq!(paginated.get_page_items(), &[9, 10, 11, 12, 13, 14, 15, 16]);
        assert!(paginated.has_prev());
        assert!(paginated.has_next());
    }

    #[test]
    fn test_last_page_is_partial() {
        let paginated = Paginated::new((1..=20).collect::<Vec<_>>(), 3, 8);

        assert_eq!(paginated.get_page_items(), &[17, 18, 19, 20]);
        assert!(!paginated.has_next());
    }

    #[test]
    fn test_out_of_range_page_is_clamped() {
        let paginated = Paginated::new(vec![1, 2, 3], 5, 8);
        assert_eq!(paginated.page, 1);
        assert_eq!(paginated.get_page_items(), &[1, 2, 3]);

        let empty = Paginated::new(Vec::<i32>::new(), 0, 8);
        assert_eq!(empty.page, 1);
        assert!(empty.is_empty());
        assert!(empty.get_page_items().is_empty());
        assert!(!empty.has_next());
        assert!(!empty.has_prev());
    }
}
