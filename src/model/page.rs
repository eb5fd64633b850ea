/// A 1-based page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    pub const MAX_PER_PAGE: u32 = 100;

    /// Missing or zero `page` means the first page; `per_page` is clamped to
    /// `1..=MAX_PER_PAGE`.
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(default_per_page)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// Slice an already ordered, fully loaded list.
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        items
            .into_iter()
            .skip(offset)
            .take(self.per_page as usize)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_and_defaults() {
        let first = PageRequest::new(None, None, 10);
        assert_eq!((first.page(), first.per_page(), first.offset()), (1, 10, 0));

        let zero = PageRequest::new(Some(0), Some(0), 10);
        assert_eq!((zero.page(), zero.per_page()), (1, 1));

        let big = PageRequest::new(Some(3), Some(500), 10);
        assert_eq!(big.per_page(), PageRequest::MAX_PER_PAGE);
        assert_eq!(big.offset(), 200);
    }

    #[test]
    fn far_pages_do_not_overflow() {
        let far = PageRequest::new(Some(u32::MAX), Some(100), 10);
        assert_eq!(far.offset(), u64::from(u32::MAX - 1) * 100);
        assert!(far.slice(vec![1, 2, 3]).is_empty());
    }

    #[test]
    fn slices_the_requested_window() {
        let page = PageRequest::new(Some(2), Some(2), 10);
        assert_eq!(page.slice(vec![1, 2, 3, 4, 5]), vec![3, 4]);
    }
}
