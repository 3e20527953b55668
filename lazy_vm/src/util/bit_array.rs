/// Fixed size bit array used to track used frames and swap slots
pub(crate) struct BitArray {
    arr: Vec<u8>,
    len: usize,
}

impl BitArray {
    /// Creates a new bit array with `len` bits which are all unset
    pub(crate) fn new(len: usize) -> Self {
        BitArray {
            arr: vec![0u8; (len + 7) / 8],
            len,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len, "index {} out of bounds ({})", index, self.len);
        let arr_index = index / 8;
        let internal_index = index % 8;

        let item = &mut self.arr[arr_index];
        if value {
            // set bit
            *item |= 1u8 << internal_index;
        } else {
            // unset bit
            *item &= !(1u8 << internal_index);
        }
    }

    pub(crate) fn is_set(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "index {} out of bounds ({})", index, self.len);
        let arr_index = index / 8;
        let internal_index = index % 8;

        let item = self.arr[arr_index];
        (item & (1u8 << internal_index)) != 0
    }

    /// Finds the first unset bit, sets it and returns its index
    pub(crate) fn scan_and_set(&mut self) -> Option<usize> {
        for (arr_index, item) in self.arr.iter_mut().enumerate() {
            if *item == u8::MAX {
                continue;
            }

            let internal_index = item.trailing_ones() as usize;
            let index = arr_index * 8 + internal_index;
            if index >= self.len {
                // only the padding bits of the last byte are left
                return None;
            }

            *item |= 1u8 << internal_index;
            return Some(index);
        }

        None
    }

    /// Number of set bits
    pub(crate) fn count_set(&self) -> usize {
        self.arr.iter().map(|item| item.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod test {
    use super::BitArray;

    #[test]
    fn test_set_and_unset() {
        let mut bits = BitArray::new(20);
        assert_eq!(bits.len(), 20);

        bits.set(3, true);
        bits.set(11, true);
        assert!(bits.is_set(3));
        assert!(bits.is_set(11));
        assert!(!bits.is_set(4));

        bits.set(3, false);
        assert!(!bits.is_set(3));
        // neighbours stay untouched
        assert!(bits.is_set(11));
        assert!(!bits.is_set(2));
        assert_eq!(bits.count_set(), 1);
    }

    #[test]
    fn test_scan_and_set() {
        let mut bits = BitArray::new(10);
        for i in 0..10 {
            assert_eq!(bits.scan_and_set(), Some(i));
        }

        // padding bits of the last byte must never be handed out
        assert_eq!(bits.scan_and_set(), None);
        assert_eq!(bits.count_set(), 10);

        bits.set(6, false);
        assert_eq!(bits.scan_and_set(), Some(6));
        assert_eq!(bits.scan_and_set(), None);
    }
}
