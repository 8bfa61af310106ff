//! Reusable visited marks for graph search
//!
//! Each mark is a generation number. Starting a new search bumps the
//! generation instead of zeroing the array, so a pooled list costs nothing
//! to reset. Lists are pooled per thread because searches run concurrently
//! under a shared read lock.

use std::cell::RefCell;

/// Pooled lists kept per thread
const POOL_SIZE: usize = 4;
const MIN_CAPACITY: usize = 1024;

thread_local! {
    static POOL: RefCell<Vec<Generations>> = const { RefCell::new(Vec::new()) };
}

#[derive(Default)]
struct Generations {
    marks: Vec<u32>,
    current: u32,
}

impl Generations {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            marks: vec![0; capacity.max(MIN_CAPACITY)],
            current: 0,
        }
    }

    fn next_generation(&mut self) {
        self.current = self.current.wrapping_add(1);
        if self.current == 0 {
            self.marks.fill(0);
            self.current = 1;
        }
    }
}

/// Visited marks borrowed from the thread's pool, returned on drop
pub(crate) struct VisitedList {
    generations: Generations,
}

impl VisitedList {
    /// Borrow a cleared list able to hold ids below `capacity`
    pub(crate) fn new(capacity: usize) -> Self {
        let mut generations = POOL
            .with(|pool| {
                let mut pool = pool.borrow_mut();
                let found = pool.iter().position(|g| g.marks.len() >= capacity);
                found.map(|index| pool.swap_remove(index))
            })
            .unwrap_or_else(|| Generations::with_capacity(capacity));

        generations.next_generation();
        Self { generations }
    }

    /// Mark `id`; false if it was already marked in this search
    pub(crate) fn insert(&mut self, id: usize) -> bool {
        let generations = &mut self.generations;

        if id >= generations.marks.len() {
            let len = id.saturating_add(1).next_power_of_two().max(MIN_CAPACITY);
            generations.marks.resize(len, 0);
        }

        if generations.marks[id] == generations.current {
            return false;
        }
        generations.marks[id] = generations.current;
        true
    }
}

impl Drop for VisitedList {
    fn drop(&mut self) {
        let generations = std::mem::take(&mut self.generations);
        POOL.with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < POOL_SIZE {
                pool.push(generations);
            }
        });
    }
}
