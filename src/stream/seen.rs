//! Bounded memory of recently yielded items.

use std::collections::{HashSet, VecDeque};

use crate::types::PostId;

/// Remembers up to `capacity` ids, evicting the least recently seen.
///
/// A lookup that hits refreshes the id's recency. Without that, an old
/// submission sitting in a slow feed's fetch window would be evicted by a
/// busy comment feed and then yielded a second time.
#[derive(Debug, Clone)]
pub struct SeenSet {
    capacity: usize,
    order: VecDeque<PostId>,
    members: HashSet<PostId>,
}

impl SeenSet {
    pub fn new(capacity: usize) -> Self {
        SeenSet {
            capacity: capacity.max(1),
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    /// Records `id`. Returns true if it was not already remembered.
    pub fn insert(&mut self, id: &PostId) -> bool {
        if self.members.contains(id) {
            if let Some(pos) = self.order.iter().position(|p| p == id)
                && let Some(existing) = self.order.remove(pos)
            {
                self.order.push_back(existing);
            }
            return false;
        }

        self.members.insert(id.clone());
        self.order.push_back(id.clone());

        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
        true
    }

    pub fn contains(&self, id: &PostId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(n: usize) -> PostId {
        PostId::new(format!("t1_{n}"))
    }

    #[test]
    fn duplicate_insert_reports_seen() {
        let mut seen = SeenSet::new(3);
        assert!(seen.insert(&id(1)));
        assert!(!seen.insert(&id(1)));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn oldest_is_evicted_past_capacity() {
        let mut seen = SeenSet::new(2);
        seen.insert(&id(1));
        seen.insert(&id(2));
        seen.insert(&id(3));

        assert!(!seen.contains(&id(1)));
        assert!(seen.contains(&id(2)));
        assert!(seen.contains(&id(3)));
    }

    #[test]
    fn hit_refreshes_recency() {
        let mut seen = SeenSet::new(2);
        seen.insert(&id(1));
        seen.insert(&id(2));
        seen.insert(&id(1));
        seen.insert(&id(3));

        assert!(seen.contains(&id(1)));
        assert!(!seen.contains(&id(2)));
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(
            capacity in 1usize..20,
            ids in prop::collection::vec(0usize..50, 0..200),
        ) {
            let mut seen = SeenSet::new(capacity);
            for n in ids {
                seen.insert(&id(n));
                prop_assert!(seen.len() <= capacity);
                prop_assert!(seen.contains(&id(n)));
            }
        }
    }
}
