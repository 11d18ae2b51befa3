//! Write idempotency registry
//!
//! Remembers which write ids were committed so a resubmitted write returns
//! the original cell instead of debiting and committing twice. Write ids are
//! scoped to the identity that sent them. A write id is `Pending` from
//! admission until its commit resolves.
//!
//! Memory is bounded: once `capacity` committed ids are tracked, the oldest
//! are forgotten.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use shared_types::{Cell, Identity, WriteId};
use std::collections::VecDeque;

type WriteKey = (Identity, WriteId);

#[derive(Debug, Clone)]
enum WriteSlot {
    Pending,
    Committed(Cell),
}

/// Result of claiming a write id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// First time this id is seen. The caller must `complete` or `release` it.
    Fresh,
    /// Already committed; here is the original cell.
    Replay(Cell),
    /// Another request holds the id.
    InProgress,
}

pub struct WriteRegistry {
    slots: DashMap<WriteKey, WriteSlot>,
    order: Mutex<VecDeque<WriteKey>>,
    capacity: usize,
}

impl WriteRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn claim(&self, identity: &Identity, write_id: &WriteId) -> Claim {
        match self.slots.entry((identity.clone(), write_id.clone())) {
            Entry::Occupied(e) => match e.get() {
                WriteSlot::Pending => Claim::InProgress,
                WriteSlot::Committed(cell) => Claim::Replay(cell.clone()),
            },
            Entry::Vacant(v) => {
                v.insert(WriteSlot::Pending);
                Claim::Fresh
            }
        }
    }

    /// Record the committed cell for a claimed id.
    pub fn complete(&self, identity: &Identity, write_id: &WriteId, cell: Cell) {
        let key = (identity.clone(), write_id.clone());
        self.slots.insert(key.clone(), WriteSlot::Committed(cell));

        let evicted = {
            let mut order = self.order.lock();
            order.push_back(key);
            let mut evicted = Vec::new();
            while order.len() > self.capacity {
                if let Some(old) = order.pop_front() {
                    evicted.push(old);
                }
            }
            evicted
        };
        for old in evicted {
            self.slots.remove(&old);
        }
    }

    /// Give up a claimed id without committing.
    pub fn release(&self, identity: &Identity, write_id: &WriteId) {
        self.slots.remove_if(&(identity.clone(), write_id.clone()), |_, slot| {
            matches!(slot, WriteSlot::Pending)
        });
    }

    pub fn tracked(&self) -> usize {
        self.slots.len()
    }
}
