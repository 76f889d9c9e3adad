use crate::{
    world::{
        channel::error::ChannelError,
        component::{change_tracker::ChangeTracker, changelist::Changelist},
    },
    EntityId,
};

/// Fixed-capacity ring of changelists produced by successive replicate
/// passes but not yet folded into a sent update.
///
/// Indices grow monotonically (wrapping) and map to slot `index % capacity`.
/// At all times `0 <= end - start < capacity`, and every slot in
/// `[start, end)` holds a non-empty changelist.
pub struct ChangelistHistory {
    slots: Vec<Changelist>,
    history_start: u32,
    history_end: u32,
    last_changelist_index: u32,
}

impl ChangelistHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            slots: vec![Changelist::new(); capacity],
            history_start: 0,
            history_end: 0,
            last_changelist_index: 0,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn start(&self) -> u32 {
        self.history_start
    }

    pub fn end(&self) -> u32 {
        self.history_end
    }

    pub fn last_changelist_index(&self) -> u32 {
        self.last_changelist_index
    }

    /// Number of occupied slots
    pub fn len(&self) -> u32 {
        self.history_end.wrapping_sub(self.history_start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_index(&self, index: u32) -> usize {
        (index % self.capacity()) as usize
    }

    fn check_window(&self, entity: EntityId) -> Result<(), ChannelError> {
        let sent = self.last_changelist_index.wrapping_sub(self.history_start);
        if sent > self.len() {
            return Err(ChannelError::ChangelistIndexRegressed {
                entity_id: entity.to_string(),
                last_sent: self.last_changelist_index,
                start: self.history_start,
                end: self.history_end,
            });
        }
        if self.len() >= self.capacity() {
            return Err(ChannelError::HistoryOverflow {
                entity_id: entity.to_string(),
                pending: self.len(),
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Trims every slot already folded into a sent update, advancing the
    /// start of the window to the last sent index.
    pub fn update_changelist_history(&mut self, entity: EntityId) -> Result<(), ChannelError> {
        self.check_window(entity)?;
        while self.history_start != self.last_changelist_index {
            let slot = self.slot_index(self.history_start);
            self.slots[slot].clear();
            self.history_start = self.history_start.wrapping_add(1);
        }
        Ok(())
    }

    /// Inserts a non-empty changelist at the end of the ring. Refuses rather
    /// than wrapping over unsent entries.
    pub fn push(&mut self, entity: EntityId, changed: Changelist) -> Result<(), ChannelError> {
        if changed.is_empty() {
            return Ok(());
        }
        if self.len() + 1 >= self.capacity() {
            return Err(ChannelError::HistoryOverflow {
                entity_id: entity.to_string(),
                pending: self.len() + 1,
                capacity: self.capacity(),
            });
        }
        let slot = self.slot_index(self.history_end);
        self.slots[slot] = changed;
        self.history_end = self.history_end.wrapping_add(1);
        Ok(())
    }

    /// Merges every entry since the last sent index into one changelist and
    /// advances the last sent index to the end of the ring.
    pub fn collect_unsent(
        &mut self,
        entity: EntityId,
        tracker: &ChangeTracker,
    ) -> Result<Changelist, ChannelError> {
        self.check_window(entity)?;
        let mut unsent = Vec::new();
        let mut index = self.last_changelist_index;
        while index != self.history_end {
            unsent.push(&self.slots[self.slot_index(index)]);
            index = index.wrapping_add(1);
        }
        let merged = tracker.merge(unsent);
        self.last_changelist_index = self.history_end;
        Ok(merged)
    }

    /// Drops every entry, keeping indices monotonic
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.clear();
        }
        self.history_start = self.history_end;
        self.last_changelist_index = self.history_end;
    }

    /// Checks the window bound and that occupied slots are non-empty
    pub fn is_consistent(&self) -> bool {
        if self.len() >= self.capacity() {
            return false;
        }
        let mut index = self.history_start;
        while index != self.history_end {
            if self.slots[self.slot_index(index)].is_empty() {
                return false;
            }
            index = index.wrapping_add(1);
        }
        true
    }
}
