//! LRU List Module
//!
//! Access-order list for LRU eviction, stored as an index arena.

// == Node Id ==
/// Stable handle to a node in the [`LruList`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
struct Node {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU List ==
/// Doubly linked list of keys ordered by access time.
///
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Links are arena indices, so push, promote, unlink and pop are all O(1).
/// Freed slots are recycled through a free list.
#[derive(Debug, Default)]
pub struct LruList {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl LruList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::default()
    }

    // == Push Front ==
    /// Inserts a key as the most recently used entry.
    pub fn push_front(&mut self, key: String) -> NodeId {
        let node = Node {
            key,
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

    // == Move To Front ==
    /// Promotes a node to most recently used.
    pub fn move_to_front(&mut self, id: NodeId) {
        if self.head == Some(id.0) {
            return;
        }
        self.unlink(id.0);

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

    // == Remove ==
    /// Unlinks a node from wherever it sits and returns its key.
    pub fn remove(&mut self, id: NodeId) -> Option<String> {
        self.slots.get(id.0)?.as_ref()?;
        self.unlink(id.0);
        let node = self.slots[id.0].take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node.key)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used key.
    pub fn pop_back(&mut self) -> Option<String> {
        let tail = self.tail?;
        self.remove(NodeId(tail))
    }

    // == Peek Back ==
    /// Returns the next eviction candidate without removing it.
    pub fn peek_back(&self) -> Option<&str> {
        self.tail
            .and_then(|idx| self.slots[idx].as_ref())
            .map(|node| node.key.as_str())
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.len);
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let Some(node) = self.slots[idx].as_ref() else {
                break;
            };
            out.push(node.key.as_str());
            cursor = node.next;
        }
        out
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node_mut(idx);
            (node.prev.take(), node.next.take())
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    // Indices handed out by this list always point at occupied slots until removed.
    fn node_mut(&mut self, idx: usize) -> &mut Node {
        match self.slots[idx].as_mut() {
            Some(node) => node,
            None => unreachable!("LRU list link points at a freed slot"),
        }
    }
}
