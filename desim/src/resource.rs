use std::collections::VecDeque;
use std::fmt;

use crate::Scheduler;

/// Callback resuming a process once it has been granted a slot.
pub(crate) type Waiter = Box<dyn FnOnce(Slot, &mut Scheduler)>;

/// A type-safe identifier of a resource within a [`State`](crate::State).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId {
    pub(crate) id: usize,
    pub(crate) state_hash: u64,
}

/// A held unit of a resource's capacity.
///
/// A slot can only be obtained from a grant, cannot be cloned, and is consumed when released,
/// so it is released at most once.
#[must_use = "A slot that is never released permanently reduces the resource's capacity"]
#[derive(Debug, PartialEq, Eq)]
pub struct Slot {
    resource: ResourceId,
    grant: u64,
}

impl Slot {
    /// The resource this slot belongs to.
    #[must_use]
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    /// Sequential number of the grant that produced this slot, starting at 0.
    #[must_use]
    pub fn grant(&self) -> u64 {
        self.grant
    }
}

/// Capacity-limited pool with FIFO admission.
///
/// Requests are granted immediately while fewer than `capacity` slots are in use.
/// Otherwise, they wait, and every released slot is handed over to the earliest waiting request.
pub struct Resource {
    id: ResourceId,
    capacity: usize,
    in_use: usize,
    waiting: VecDeque<Waiter>,
    total_grants: u64,
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("capacity", &self.capacity)
            .field("in_use", &self.in_use)
            .field("waiting", &self.waiting.len())
            .field("total_grants", &self.total_grants)
            .finish()
    }
}

impl Resource {
    pub(crate) fn new(id: ResourceId, capacity: usize) -> Self {
        assert!(capacity > 0, "Resource capacity must be positive");
        Self {
            id,
            capacity,
            in_use: 0,
            waiting: VecDeque::new(),
            total_grants: 0,
        }
    }

    /// Maximum number of slots that can be held at once.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of slots currently held.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// Number of free slots.
    #[must_use]
    pub fn available(&self) -> usize {
        self.capacity - self.in_use
    }

    /// Number of requests waiting for a slot.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    /// Number of slots granted since the resource was created.
    #[must_use]
    pub fn total_grants(&self) -> u64 {
        self.total_grants
    }

    fn grant(&mut self) -> Slot {
        self.in_use += 1;
        let slot = Slot {
            resource: self.id,
            grant: self.total_grants,
        };
        self.total_grants += 1;
        debug_assert!(self.in_use <= self.capacity);
        slot
    }

    pub(crate) fn request(&mut self, waiter: Waiter, scheduler: &mut Scheduler) {
        if self.in_use < self.capacity {
            let slot = self.grant();
            waiter(slot, scheduler);
        } else {
            self.waiting.push_back(waiter);
        }
    }

    pub(crate) fn release(&mut self, slot: Slot, scheduler: &mut Scheduler) {
        assert_eq!(slot.resource, self.id, "Slot released to a wrong resource");
        assert!(self.in_use > 0, "Released a slot of a resource with no slots in use");
        self.in_use -= 1;
        if let Some(waiter) = self.waiting.pop_front() {
            let slot = self.grant();
            waiter(slot, scheduler);
        }
    }
}
