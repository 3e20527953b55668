use crate::address::{PhysFrame, VirtAddr};

/// Handle of a frame inside of a [`FrameTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FrameId(usize);

/// A physical frame lent to an address space
#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) phys: PhysFrame,

    /// Page that is resident in this frame.
    ///
    /// `None` while the frame is between eviction and reuse.
    pub(crate) page: Option<VirtAddr>,
}

/// Arena of the frames an address space currently holds.
///
/// Pages refer to their frame by [`FrameId`] and frames refer back to
/// their page by its address, so no reference can dangle.
pub(crate) struct FrameTable {
    slots: Vec<Option<Frame>>,
    free_slots: Vec<usize>,
    len: usize,
}

impl FrameTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            len: 0,
        }
    }

    /// Adds a frame that is not bound to any page yet
    pub(crate) fn insert(&mut self, phys: PhysFrame) -> FrameId {
        let frame = Frame { phys, page: None };
        self.len += 1;

        if let Some(index) = self.free_slots.pop() {
            debug_assert!(self.slots[index].is_none());
            self.slots[index] = Some(frame);
            FrameId(index)
        } else {
            self.slots.push(Some(frame));
            FrameId(self.slots.len() - 1)
        }
    }

    pub(crate) fn get(&self, id: FrameId) -> Option<&Frame> {
        self.slots.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.slots.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    pub(crate) fn remove(&mut self, id: FrameId) -> Option<Frame> {
        let frame = self.slots.get_mut(id.0)?.take()?;
        self.free_slots.push(id.0);
        self.len -= 1;
        Some(frame)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (FrameId, &Frame)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|frame| (FrameId(index), frame)))
    }

    /// Gives the memory of the arena back, only valid if it is empty
    pub(crate) fn release_storage(&mut self) {
        debug_assert_eq!(self.len, 0);
        self.slots = Vec::new();
        self.free_slots = Vec::new();
    }
}
