//! Lookahead wrapper over the items a dispatch pulls from.

use std::fmt;

use crate::error::SourceExhausted;

/// Virtual `0..n` sequence backed by a single counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    next: usize,
    end: usize,
}

impl Counter {
    pub fn new(end: usize) -> Self {
        Self { next: 0, end }
    }
}

impl Iterator for Counter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next < self.end {
            let value = self.next;
            self.next += 1;
            Some(value)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.end - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Counter {}

enum Cache<T> {
    Empty,
    Cached(T),
    Done,
}

/// The work a dispatch pulls from: a virtual range or any iterator.
///
/// The underlying iterator is advanced at most once per item. Asking
/// whether there is more work fetches the next item into a one-slot cache
/// so the answer is known before the item is committed to a launch.
/// Once the source reports it is empty it stays empty, even if the wrapped
/// iterator is not fused.
///
/// ```rust
/// use futures_ratemap::WorkSource;
///
/// let mut source = WorkSource::sequence(["a", "b"]);
/// assert!(source.has_more());
/// assert!(source.has_more());
/// assert_eq!(source.take(), Ok("a"));
/// assert_eq!(source.take(), Ok("b"));
/// assert!(!source.has_more());
/// assert!(source.take().is_err());
/// ```
pub struct WorkSource<I: Iterator> {
    iter: I,
    cache: Cache<I::Item>,
}

impl WorkSource<Counter> {
    /// Source producing `0, 1, ..., n - 1`.
    pub fn range(n: usize) -> Self {
        Self::new(Counter::new(n))
    }
}

impl<I: Iterator> WorkSource<I> {
    /// Wrap any finite or unbounded sequence.
    pub fn sequence<S>(items: S) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        Self::new(items.into_iter())
    }

    fn new(iter: I) -> Self {
        Self {
            iter,
            cache: Cache::Empty,
        }
    }

    /// Look at the next item without consuming it.
    pub fn peek(&mut self) -> Option<&I::Item> {
        if let Cache::Empty = self.cache {
            self.cache = match self.iter.next() {
                Some(item) => Cache::Cached(item),
                None => Cache::Done,
            };
        }
        match &self.cache {
            Cache::Cached(item) => Some(item),
            _ => None,
        }
    }

    /// Whether another item can be taken. Repeated calls are free.
    pub fn has_more(&mut self) -> bool {
        self.peek().is_some()
    }

    /// Take the next item, or `None` once the source is drained.
    pub fn try_next(&mut self) -> Option<I::Item> {
        self.peek();
        match std::mem::replace(&mut self.cache, Cache::Empty) {
            Cache::Cached(item) => Some(item),
            Cache::Done => {
                self.cache = Cache::Done;
                None
            }
            Cache::Empty => None,
        }
    }

    /// Take the next item. Calling this on a drained source is a caller bug
    /// and reported as [`SourceExhausted`].
    pub fn take(&mut self) -> Result<I::Item, SourceExhausted> {
        self.try_next().ok_or(SourceExhausted)
    }

    pub fn size_hint(&self) -> (usize, Option<usize>) {
        match self.cache {
            Cache::Done => (0, Some(0)),
            Cache::Cached(_) => {
                let (lower, upper) = self.iter.size_hint();
                (
                    lower.saturating_add(1),
                    upper.and_then(|upper| upper.checked_add(1)),
                )
            }
            Cache::Empty => self.iter.size_hint(),
        }
    }
}

impl<I> fmt::Debug for WorkSource<I>
where
    I: Iterator + fmt::Debug,
    I::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = match &self.cache {
            Cache::Empty => "empty".to_string(),
            Cache::Cached(item) => format!("cached({item:?})"),
            Cache::Done => "done".to_string(),
        };
        f.debug_struct("WorkSource")
            .field("iter", &self.iter)
            .field("cache", &cache)
            .finish()
    }
}
