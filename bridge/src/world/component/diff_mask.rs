use std::fmt;

use crate::FieldHandle;

/// The DiffMask is a variable-length byte array, where each bit represents
/// whether the field with that handle has changed.
/// Used to merge changelists without sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffMask {
    mask: Vec<u8>,
}

impl DiffMask {
    /// Create a new DiffMask able to hold `field_count` bits
    pub fn new(field_count: usize) -> DiffMask {
        DiffMask {
            mask: vec![0; field_count.div_ceil(8)],
        }
    }

    /// Gets the bit at the specified position within the DiffMask
    pub fn bit(&self, handle: FieldHandle) -> Option<bool> {
        let index = handle.index();
        self.mask
            .get(index / 8)
            .map(|byte| byte & (1u8 << (index % 8)) != 0)
    }

    /// Sets the bit at the specified position within the DiffMask.
    /// Returns false if the handle is outside the mask.
    pub fn set_bit(&mut self, handle: FieldHandle, value: bool) -> bool {
        let index = handle.index();
        let Some(byte) = self.mask.get_mut(index / 8) else {
            return false;
        };
        let bit_mask = 1u8 << (index % 8);
        if value {
            *byte |= bit_mask;
        } else {
            *byte &= !bit_mask;
        }
        true
    }

    /// Clears the whole DiffMask
    pub fn clear(&mut self) {
        for byte in self.mask.iter_mut() {
            *byte = 0;
        }
    }

    /// Returns whether any bit has been set in the DiffMask
    pub fn is_clear(&self) -> bool {
        self.mask.iter().all(|byte| *byte == 0)
    }

    pub fn byte_number(&self) -> usize {
        self.mask.len()
    }

    /// Performs a NAND operation on the DiffMask, with another DiffMask
    pub fn nand(&mut self, other: &DiffMask) {
        //if other diff mask has different capacity, do nothing
        if other.byte_number() != self.byte_number() {
            return;
        }

        for (my_byte, other_byte) in self.mask.iter_mut().zip(other.mask.iter()) {
            *my_byte &= !*other_byte;
        }
    }

    /// Performs an OR operation on the DiffMask, with another DiffMask
    pub fn or(&mut self, other: &DiffMask) {
        //if other diff mask has different capacity, do nothing
        if other.byte_number() != self.byte_number() {
            return;
        }

        for (my_byte, other_byte) in self.mask.iter_mut().zip(other.mask.iter()) {
            *my_byte |= *other_byte;
        }
    }

    /// Iterates the handles of every set bit, in ascending order
    pub fn iter_set(&self) -> impl Iterator<Item = FieldHandle> + '_ {
        self.mask.iter().enumerate().flat_map(|(byte_index, byte)| {
            (0..8u16)
                .filter(move |bit| byte & (1u8 << bit) != 0)
                .map(move |bit| FieldHandle(byte_index as u16 * 8 + bit))
        })
    }

    pub fn count_set(&self) -> usize {
        self.mask
            .iter()
            .map(|byte| byte.count_ones() as usize)
            .sum()
    }
}

impl fmt::Display for DiffMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out_string: String = String::new();
        for byte in self.mask.iter() {
            for bit in 0..8 {
                out_string.push(if byte & (1u8 << bit) != 0 { '1' } else { '0' });
            }
        }
        write!(f, "{}", out_string)
    }
}
