//! Recency List Module
//!
//! Doubly linked list ordering entries from most recently used (head) to
//! least recently used (tail). Nodes live in an arena and link to each other
//! by slot index, so every operation is O(1) without unsafe code.

use crate::cache::CacheEntry;

// == Node Id ==
/// Handle to a node in the list, handed out by `add_first`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node<V> {
    entry: CacheEntry<V>,
    prev: Option<usize>,
    next: Option<usize>,
}

// == Recency List ==
/// Owns every node and the order between them.
///
/// There is no lookup by key; callers keep the `NodeId` returned on insertion.
#[derive(Debug)]
pub struct RecencyList<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<V> Default for RecencyList<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> RecencyList<V> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    // == Add First ==
    /// Inserts an entry at the head (most recently used) and returns its handle.
    pub fn add_first(&mut self, entry: CacheEntry<V>) -> NodeId {
        let node = Node {
            entry,
            prev: None,
            next: self.head,
        };

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };

        match self.head {
            Some(old_head) => self.node_mut(old_head).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
        self.len += 1;

        NodeId(idx)
    }

    // == Remove ==
    /// Unlinks a node and hands back its entry.
    ///
    /// Returns None for a handle that is not linked into this list.
    pub fn remove(&mut self, id: NodeId) -> Option<CacheEntry<V>> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.unlink(node.prev, node.next);
        self.free.push(id.0);
        self.len -= 1;
        Some(node.entry)
    }

    // == Remove Last ==
    /// Removes and returns the least recently used entry.
    pub fn remove_last(&mut self) -> Option<CacheEntry<V>> {
        let tail = self.tail?;
        self.remove(NodeId(tail))
    }

    // == Move To Front ==
    /// Marks a node as most recently used.
    pub fn move_to_front(&mut self, id: NodeId) {
        if self.head == Some(id.0) {
            return;
        }
        let (prev, next) = match self.slots.get(id.0).and_then(Option::as_ref) {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        self.unlink(prev, next);

        let old_head = self.head;
        {
            let node = self.node_mut(id.0);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(id.0),
            None => self.tail = Some(id.0),
        }
        self.head = Some(id.0);
    }

    // == Clear ==
    /// Drops every node.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    pub fn get(&self, id: NodeId) -> Option<&CacheEntry<V>> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|node| &node.entry)
    }

    /// Least recently used entry, without removing it.
    pub fn peek_last(&self) -> Option<&CacheEntry<V>> {
        self.tail.and_then(|t| self.get(NodeId(t)))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn unlink(&mut self, prev: Option<usize>, next: Option<usize>) {
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    // Links only ever point at occupied slots.
    fn node_mut(&mut self, idx: usize) -> &mut Node<V> {
        match self.slots[idx].as_mut() {
            Some(node) => node,
            None => unreachable!("recency list link points at an empty slot"),
        }
    }
}

// == Iterator ==
pub struct Iter<'a, V> {
    list: &'a RecencyList<V>,
    cursor: Option<usize>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a CacheEntry<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.slots.get(self.cursor?)?.as_ref()?;
        self.cursor = node.next;
        Some(&node.entry)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Expiry;

    fn entry(key: &str) -> CacheEntry<u32> {
        CacheEntry::new(key.to_string(), 0, Expiry::Never)
    }

    fn order(list: &RecencyList<u32>) -> Vec<&str> {
        list.iter().map(|e| e.key()).collect()
    }

    #[test]
    fn test_list_new() {
        let list: RecencyList<u32> = RecencyList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.peek_last().is_none());
    }

    #[test]
    fn test_add_first_orders_newest_at_head() {
        let mut list = RecencyList::new();
        list.add_first(entry("a"));
        list.add_first(entry("b"));
        list.add_first(entry("c"));

        assert_eq!(list.len(), 3);
        assert_eq!(order(&list), vec!["c", "b", "a"]);
        assert_eq!(list.peek_last().map(|e| e.key()), Some("a"));
    }

    #[test]
    fn test_remove_last_in_lru_order() {
        let mut list = RecencyList::new();
        list.add_first(entry("a"));
        list.add_first(entry("b"));
        list.add_first(entry("c"));

        assert_eq!(list.remove_last().map(|e| e.key().to_string()), Some("a".to_string()));
        assert_eq!(list.remove_last().map(|e| e.key().to_string()), Some("b".to_string()));
        assert_eq!(list.remove_last().map(|e| e.key().to_string()), Some("c".to_string()));
        assert!(list.remove_last().is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_middle_head_and_tail() {
        let mut list = RecencyList::new();
        let a = list.add_first(entry("a"));
        let b = list.add_first(entry("b"));
        let c = list.add_first(entry("c"));
        let d = list.add_first(entry("d"));

        assert_eq!(list.remove(b).map(|e| e.key().to_string()), Some("b".to_string()));
        assert_eq!(order(&list), vec!["d", "c", "a"]);

        list.remove(d);
        assert_eq!(order(&list), vec!["c", "a"]);

        list.remove(a);
        assert_eq!(order(&list), vec!["c"]);
        assert_eq!(list.peek_last().map(|e| e.key()), Some("c"));

        list.remove(c);
        assert!(list.is_empty());
        assert!(list.iter().next().is_none());
    }

    #[test]
    fn test_remove_stale_handle_is_none() {
        let mut list = RecencyList::new();
        let a = list.add_first(entry("a"));

        assert!(list.remove(a).is_some());
        assert!(list.remove(a).is_none());
        assert!(list.remove(NodeId(42)).is_none());
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_move_to_front() {
        let mut list = RecencyList::new();
        let a = list.add_first(entry("a"));
        list.add_first(entry("b"));
        let c = list.add_first(entry("c"));

        list.move_to_front(a);
        assert_eq!(order(&list), vec!["a", "c", "b"]);

        // Already at head
        list.move_to_front(a);
        assert_eq!(order(&list), vec!["a", "c", "b"]);

        list.move_to_front(c);
        assert_eq!(order(&list), vec!["c", "a", "b"]);
        assert_eq!(list.peek_last().map(|e| e.key()), Some("b"));
    }

    #[test]
    fn test_move_tail_to_front_updates_tail() {
        let mut list = RecencyList::new();
        let a = list.add_first(entry("a"));
        list.add_first(entry("b"));

        list.move_to_front(a);
        assert_eq!(order(&list), vec!["a", "b"]);
        assert_eq!(list.remove_last().map(|e| e.key().to_string()), Some("b".to_string()));
        assert_eq!(order(&list), vec!["a"]);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut list = RecencyList::new();
        let a = list.add_first(entry("a"));
        list.remove(a);
        let b = list.add_first(entry("b"));

        assert_eq!(a, b);
        assert_eq!(list.get(b).map(|e| e.key()), Some("b"));
        assert_eq!(list.slots.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut list = RecencyList::new();
        list.add_first(entry("a"));
        list.add_first(entry("b"));

        list.clear();
        assert!(list.is_empty());
        assert!(list.peek_last().is_none());

        // Clearing twice is fine
        list.clear();
        list.add_first(entry("c"));
        assert_eq!(order(&list), vec!["c"]);
    }
}
