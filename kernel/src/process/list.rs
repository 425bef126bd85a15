//! Index-linked lists over the process table
//!
//! The process table keeps one [`Link`] per slot for each kind of list a
//! process can be on (all processes, scheduling list, siblings). A [`List`]
//! only stores head, tail and length; the links live in the table, so moving
//! a process between lists is O(1) and never allocates.

#[derive(Debug, Clone, Copy, Default)]
pub struct Link {
    prev: Option<usize>,
    next: Option<usize>,
    linked: bool,
}

impl Link {
    pub fn is_linked(&self) -> bool {
        self.linked
    }
}

#[derive(Debug, Default)]
pub struct List {
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl List {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn front(&self) -> Option<usize> {
        self.head
    }

    pub fn push_back(&mut self, links: &mut [Link], idx: usize) {
        debug_assert!(!links[idx].linked, "slot {} already linked", idx);
        links[idx] = Link {
            prev: self.tail,
            next: None,
            linked: true,
        };
        match self.tail {
            Some(tail) => links[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
    }

    /// Link `idx` right before `at`, which must be on this list.
    pub fn insert_before(&mut self, links: &mut [Link], at: usize, idx: usize) {
        debug_assert!(!links[idx].linked, "slot {} already linked", idx);
        let prev = links[at].prev;
        links[idx] = Link {
            prev,
            next: Some(at),
            linked: true,
        };
        links[at].prev = Some(idx);
        match prev {
            Some(p) => links[p].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.len += 1;
    }

    /// Unlink `idx`, which must be on this list.
    pub fn remove(&mut self, links: &mut [Link], idx: usize) {
        let Link { prev, next, linked } = links[idx];
        if !linked {
            return;
        }
        match prev {
            Some(p) => links[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => links[n].prev = prev,
            None => self.tail = prev,
        }
        links[idx] = Link::default();
        self.len -= 1;
    }

    pub fn pop_front(&mut self, links: &mut [Link]) -> Option<usize> {
        let head = self.head?;
        self.remove(links, head);
        Some(head)
    }

    pub fn iter<'a>(&self, links: &'a [Link]) -> Iter<'a> {
        Iter {
            links,
            next: self.head,
        }
    }
}

pub struct Iter<'a> {
    links: &'a [Link],
    next: Option<usize>,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let cur = self.next?;
        self.next = self.links[cur].next;
        Some(cur)
    }
}
