use std::cmp::Ordering;

///
/// Offer
///
/// Outcome of offering a candidate to a [`TopKHeap`]. Evicted and rejected
/// items are handed back to the caller.
///

#[derive(Debug, Eq, PartialEq)]
pub enum Offer<T> {
    Inserted,
    Replaced(T),
    Rejected(T),
}

///
/// TopKHeap
///
/// Bounded heap keeping the `max_size` best items under a caller-supplied
/// order, where `Less` means "better". The root is always the worst kept
/// item, so a full heap admits a candidate only if it is strictly better.
///

#[derive(Clone, Debug)]
pub struct TopKHeap<T> {
    items: Vec<T>,
    max_size: usize,
}

impl<T> TopKHeap<T> {
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self::with_capacity(max_size, max_size)
    }

    #[must_use]
    pub fn with_capacity(max_size: usize, initial_capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(initial_capacity.min(max_size)),
            max_size,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }

    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.items.len() >= self.max_size
    }

    /// Worst kept item.
    #[must_use]
    pub fn peek_worst(&self) -> Option<&T> {
        self.items.first()
    }

    /// Items in heap layout order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn offer(&mut self, item: T, order: impl Fn(&T, &T) -> Ordering) -> Offer<T> {
        if self.max_size == 0 {
            return Offer::Rejected(item);
        }

        if self.items.len() < self.max_size {
            self.items.push(item);
            self.sift_up(self.items.len() - 1, &order);
            return Offer::Inserted;
        }

        if order(&item, &self.items[0]) != Ordering::Less {
            return Offer::Rejected(item);
        }

        let evicted = std::mem::replace(&mut self.items[0], item);
        self.sift_down(0, &order);

        Offer::Replaced(evicted)
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        self.items
    }

    /// Drain best-first.
    #[must_use]
    pub fn into_sorted_vec(self, order: impl Fn(&T, &T) -> Ordering) -> Vec<T> {
        let mut items = self.items;
        items.sort_by(|a, b| order(a, b));

        items
    }

    /// Transform every item in place of its heap position. The layout is kept,
    /// so `f` must not change how items order against each other.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> TopKHeap<U> {
        TopKHeap {
            items: self.items.into_iter().map(f).collect(),
            max_size: self.max_size,
        }
    }

    fn sift_up(&mut self, mut index: usize, order: &impl Fn(&T, &T) -> Ordering) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if order(&self.items[index], &self.items[parent]) != Ordering::Greater {
                break;
            }
            self.items.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize, order: &impl Fn(&T, &T) -> Ordering) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut worst = index;

            if left < len && order(&self.items[left], &self.items[worst]) == Ordering::Greater {
                worst = left;
            }
            if right < len && order(&self.items[right], &self.items[worst]) == Ordering::Greater {
                worst = right;
            }
            if worst == index {
                break;
            }
            self.items.swap(index, worst);
            index = worst;
        }
    }
}
