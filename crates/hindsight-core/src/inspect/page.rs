//! Pagination windows.
//!
//! A [`Window`] is the intersection of a caller's `current`/`limit` request
//! with a collection of `total` items. Collections that span several storage
//! domains (an object's elements, properties and internal fields) split one
//! window into per-domain ranges with [`Window::split`].

use std::ops::Range;

use serde::Serialize;

/// A resolved pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window
{
    start: usize,
    end: usize,
    total: usize,
}

impl Window
{
    /// Clamp `current`/`limit` to `total`; a zero limit runs to the end.
    #[must_use]
    pub fn new(current: usize, limit: usize, total: usize) -> Self
    {
        let start = current.min(total);
        let end = if limit == 0 {
            total
        } else {
            current.saturating_add(limit).min(total)
        };
        Self {
            start,
            end: end.max(start),
            total,
        }
    }

    /// First item in the window.
    #[must_use]
    pub const fn start(&self) -> usize
    {
        self.start
    }

    /// One past the last item; also the cursor for the next request.
    #[must_use]
    pub const fn end(&self) -> usize
    {
        self.end
    }

    /// Size of the whole collection.
    #[must_use]
    pub const fn total(&self) -> usize
    {
        self.total
    }

    /// Number of items the window covers.
    #[must_use]
    pub const fn len(&self) -> usize
    {
        self.end - self.start
    }

    /// Whether the window covers nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool
    {
        self.start == self.end
    }

    /// Whether items remain after the window.
    #[must_use]
    pub const fn has_more(&self) -> bool
    {
        self.end < self.total
    }

    /// Items remaining after the window.
    #[must_use]
    pub const fn remaining(&self) -> usize
    {
        self.total - self.end
    }

    /// Range of the window as indexes into the collection.
    #[must_use]
    pub const fn range(&self) -> Range<usize>
    {
        self.start..self.end
    }

    /// The part of this window falling in the domain `[offset, offset + len)`,
    /// relative to the domain's own start.
    #[must_use]
    pub fn split(&self, offset: usize, len: usize) -> Option<Window>
    {
        let domain_end = offset.saturating_add(len);
        let start = self.start.max(offset);
        let end = self.end.min(domain_end);
        if start >= end {
            return None;
        }
        Some(Window {
            start: start - offset,
            end: end - offset,
            total: len,
        })
    }
}

/// One page of a collection, as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T>
{
    pub items: Vec<T>,
    pub returned_count: usize,
    pub total_count: usize,
    pub has_more: bool,
    pub remaining_count: usize,
    /// Cursor to pass as `current` for the next page.
    pub next: usize,
}

impl<T> Page<T>
{
    /// Wrap the items materialised for `window`.
    #[must_use]
    pub fn new(items: Vec<T>, window: Window) -> Self
    {
        Self {
            returned_count: items.len(),
            items,
            total_count: window.total(),
            has_more: window.has_more(),
            remaining_count: window.remaining(),
            next: window.end(),
        }
    }
}

#[cfg(test)]
mod tests
{
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_zero_limit_runs_to_end()
    {
        let window = Window::new(3, 0, 10);
        assert_eq!(window.range(), 3..10);
        assert!(!window.has_more());
    }

    #[test]
    fn test_current_past_end_is_empty()
    {
        let window = Window::new(20, 5, 10);
        assert!(window.is_empty());
        assert_eq!(window.end(), 10);
        assert_eq!(window.remaining(), 0);
    }

    #[test]
    fn test_split_straddles_two_domains()
    {
        // elements [0, 3), properties [3, 5), fields [5, 6)
        let window = Window::new(2, 2, 6);
        let elements = window.split(0, 3).unwrap();
        let properties = window.split(3, 2).unwrap();
        assert_eq!(elements.range(), 2..3);
        assert_eq!(properties.range(), 0..1);
        assert!(window.split(5, 1).is_none());
    }

    proptest! {
        #[test]
        fn window_bounds_hold(current in 0usize..1_000, limit in 0usize..1_000, total in 0usize..1_000)
        {
            let window = Window::new(current, limit, total);
            prop_assert!(window.start() <= window.end());
            prop_assert!(window.end() <= total);
            prop_assert_eq!(window.has_more(), window.end() < total);
            prop_assert_eq!(window.remaining(), total - window.end());
        }

        #[test]
        fn splits_partition_the_window(current in 0usize..50, limit in 0usize..50, a in 0usize..20, b in 0usize..20, c in 0usize..20)
        {
            let window = Window::new(current, limit, a + b + c);
            let covered: usize = [(0, a), (a, b), (a + b, c)]
                .iter()
                .filter_map(|&(offset, len)| window.split(offset, len))
                .map(|part| part.len())
                .sum();
            prop_assert_eq!(covered, window.len());
        }
    }
}
