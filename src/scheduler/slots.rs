//! Concurrency budget arithmetic

use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub free_slots: usize,
    pub admitted: Vec<String>,
    /// Eligible candidates left for a later run
    pub deferred: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct SlotAllocator {
    budget: usize,
}

impl SlotAllocator {
    pub fn new(budget: usize) -> Self {
        Self { budget }
    }

    pub fn free_slots(&self, ongoing: usize) -> usize {
        self.budget.saturating_sub(ongoing)
    }

    /// Admit the head of the ordered candidate list, never more than the free slots
    pub fn admit(&self, mut candidates: Vec<String>, ongoing: usize) -> Admission {
        let free_slots = self.free_slots(ongoing);
        info!("🎰 Remaining Slots: {}", free_slots);

        let deferred = candidates.split_off(free_slots.min(candidates.len()));
        Admission {
            free_slots,
            admitted: candidates,
            deferred,
        }
    }
}
