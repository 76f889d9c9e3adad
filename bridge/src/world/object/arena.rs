use std::fmt;

/// Stable handle to a slot in an [`ObjectArena`]. The generation guards
/// against a recycled slot being mistaken for the object that used to live
/// there.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug, PartialOrd, Ord)]
pub struct ObjectHandle {
    index: u32,
    generation: u32,
}

impl ObjectHandle {
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    alive: bool,
    value: Option<T>,
}

/// Slot table of objects with an explicit liveness flag per slot.
///
/// Killing an object only clears its flag; the value stays in place until
/// [`ObjectArena::sweep_dead`] reclaims it, so observers holding a handle
/// can still see that it went away.
pub struct ObjectArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live_count: usize,
}

impl<T> Default for ObjectArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObjectArena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live_count: 0,
        }
    }

    pub fn insert(&mut self, value: T) -> ObjectHandle {
        self.live_count += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.alive = true;
            slot.value = Some(value);
            return ObjectHandle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            alive: true,
            value: Some(value),
        });
        ObjectHandle::new(index, 0)
    }

    fn slot(&self, handle: ObjectHandle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    fn slot_mut(&mut self, handle: ObjectHandle) -> Option<&mut Slot<T>> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }

    pub fn is_alive(&self, handle: ObjectHandle) -> bool {
        self.slot(handle).map(|slot| slot.alive).unwrap_or(false)
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<&T> {
        self.slot(handle)
            .filter(|slot| slot.alive)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: ObjectHandle) -> Option<&mut T> {
        self.slot_mut(handle)
            .filter(|slot| slot.alive)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Clears the liveness flag. Returns false if the handle was already dead.
    pub fn kill(&mut self, handle: ObjectHandle) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            return false;
        };
        if !slot.alive {
            return false;
        }
        slot.alive = false;
        self.live_count -= 1;
        true
    }

    /// Reclaims every dead slot, returning the values that lived there
    pub fn sweep_dead(&mut self) -> Vec<(ObjectHandle, T)> {
        let mut swept = Vec::new();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.alive {
                continue;
            }
            if let Some(value) = slot.value.take() {
                swept.push((ObjectHandle::new(index as u32, slot.generation), value));
                self.free.push(index as u32);
            }
        }
        swept
    }

    pub fn iter_live(&self) -> impl Iterator<Item = (ObjectHandle, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            if !slot.alive {
                return None;
            }
            slot.value
                .as_ref()
                .map(|value| (ObjectHandle::new(index as u32, slot.generation), value))
        })
    }

    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }
}
