/// A handle into a [`SlotMap`]. Released slots bump their generation, so a
/// key held past a `release` never reaches whatever reuses the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    idx: u32,
    gen: u32,
}
impl Key {
    pub fn index(self) -> usize {
        self.idx as usize
    }
}

#[derive(Debug)]
struct Slot<T> {
    gen: u32,
    // Err holds the next free slot
    value: Result<T, u32>,
}

#[derive(Debug)]
pub struct SlotMap<T> {
    head: u32,
    len: usize,
    entries: Vec<Slot<T>>,
}
impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T> SlotMap<T> {
    pub fn new() -> Self {
        Self {
            head: u32::MAX,
            len: 0,
            entries: vec![],
        }
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn get(&self, key: Key) -> Option<&T> {
        self.entries.get(key.index())
            .filter(|slot| slot.gen == key.gen)
            .and_then(|slot| slot.value.as_ref().ok())
    }
    pub fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        self.entries.get_mut(key.index())
            .filter(|slot| slot.gen == key.gen)
            .and_then(|slot| slot.value.as_mut().ok())
    }
    /// The key of whatever currently lives at `idx`.
    pub fn key_at(&self, idx: usize) -> Option<Key> {
        self.entries.get(idx)
            .filter(|slot| slot.value.is_ok())
            .map(|slot| Key { idx: idx as u32, gen: slot.gen })
    }
    /// The key the next `insert` will hand out.
    pub fn next_key(&self) -> Key {
        if self.head == u32::MAX {
            Key { idx: self.entries.len() as u32, gen: 0 }
        } else {
            Key { idx: self.head, gen: self.entries[self.head as usize].gen }
        }
    }
    pub fn insert(&mut self, value: T) -> Key {
        self.len += 1;
        if self.head == u32::MAX {
            let idx = self.entries.len() as u32;
            self.entries.push(Slot { gen: 0, value: Ok(value) });
            Key { idx, gen: 0 }
        } else {
            let idx = self.head;
            let slot = &mut self.entries[idx as usize];
            self.head = match core::mem::replace(&mut slot.value, Ok(value)) {
                Err(next) => next,
                Ok(_) => unreachable!("corrupted slotmap"),
            };
            Key { idx, gen: slot.gen }
        }
    }
    pub fn release(&mut self, key: Key) -> Option<T> {
        let slot = self.entries.get_mut(key.index()).filter(|slot| slot.gen == key.gen)?;
        if slot.value.is_err() {
            return None;
        }
        let old = core::mem::replace(&mut slot.value, Err(self.head));
        slot.gen = slot.gen.wrapping_add(1);
        self.head = key.idx;
        self.len -= 1;
        old.ok()
    }
}
pub struct IterMut<'a, T> {
    entries: core::iter::Enumerate<core::slice::IterMut<'a, Slot<T>>>,
}
impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (Key, &'a mut T);
    fn next(&mut self) -> Option<Self::Item> {
        for (i, slot) in self.entries.by_ref() {
            if let Ok(v) = &mut slot.value {
                return Some((Key { idx: i as u32, gen: slot.gen }, v));
            }
        }
        None
    }
}
impl<T> SlotMap<T> {
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut { entries: self.entries.iter_mut().enumerate() }
    }
    pub fn retain(&mut self, mut f: impl FnMut(Key, &mut T) -> bool) {
        for (i, slot) in self.entries.iter_mut().enumerate() {
            if let Ok(item) = &mut slot.value {
                if !f(Key { idx: i as u32, gen: slot.gen }, item) {
                    slot.value = Err(core::mem::replace(&mut self.head, i as u32));
                    slot.gen = slot.gen.wrapping_add(1);
                    self.len -= 1;
                }
            }
        }
    }
}
