//! Draw-order result buffer.

/// One slot per launched item, filled when its future resolves.
#[derive(Debug, Clone)]
pub struct ResultSlots<R> {
    slots: Vec<Option<R>>,
    filled: usize,
}

impl<R> Default for ResultSlots<R> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            filled: 0,
        }
    }
}

impl<R> ResultSlots<R> {
    /// Open the slot for the next launched item and return its index.
    pub fn open(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    /// Store the result of item `index`. Each slot is written once.
    pub fn fill(&mut self, index: usize, value: R) {
        if let Some(slot) = self.slots.get_mut(index) {
            debug_assert!(slot.is_none(), "result slot {index} written twice");
            if slot.replace(value).is_none() {
                self.filled += 1;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Results in draw order. Only meaningful once every slot is filled.
    pub fn into_ordered(self) -> Vec<R> {
        debug_assert!(self.is_complete(), "results taken before every item finished");
        self.slots.into_iter().flatten().collect()
    }
}
