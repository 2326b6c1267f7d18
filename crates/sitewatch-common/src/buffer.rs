use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// History length of the dashboard tables.
pub const DEFAULT_HISTORY: usize = 50;

/// A buffer shared between the dispatcher (writer) and a display surface (reader).
pub type SharedBuffer<T> = Arc<Mutex<TopicBuffer<T>>>;

/// Newest-first history for one topic.
///
/// Items are inserted at the front. When a cap is set and exceeded, the oldest
/// items are dropped from the back. Readers take owned copies via
/// [`TopicBuffer::snapshot`] or borrow through [`TopicBuffer::iter`] while
/// holding the lock.
#[derive(Debug, Clone)]
pub struct TopicBuffer<T> {
    items: VecDeque<T>,
    cap: Option<usize>,
}

impl<T> TopicBuffer<T> {
    /// Buffer holding at most `cap` items.
    pub fn bounded(cap: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(cap.min(1024) + 1),
            cap: Some(cap),
        }
    }

    /// Buffer that never drops items.
    pub fn unbounded() -> Self {
        Self {
            items: VecDeque::new(),
            cap: None,
        }
    }

    pub fn with_cap(cap: Option<usize>) -> Self {
        match cap {
            Some(cap) => Self::bounded(cap),
            None => Self::unbounded(),
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push_front(item);
        if let Some(cap) = self.cap {
            self.items.truncate(cap);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn cap(&self) -> Option<usize> {
        self.cap
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn shared(self) -> SharedBuffer<T> {
        Arc::new(Mutex::new(self))
    }
}

impl<T> TopicBuffer<T> {
    /// Borrowing iterator, newest first.
    pub fn iter(&self) -> std::collections::vec_deque::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T: Clone> TopicBuffer<T> {
    /// Owned copy of the current contents, newest first.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

impl<T> Default for TopicBuffer<T> {
    fn default() -> Self {
        Self::bounded(DEFAULT_HISTORY)
    }
}
