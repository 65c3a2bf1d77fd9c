use std::ops::RangeInclusive;

/// Contains some helper methods to manipulate bits,
/// the index (`bit_idx`) is supposed to be from lsb to msb (right to left)
pub trait Bits: Copy {
    fn is_bit_on(self, bit_idx: u8) -> bool;

    fn set_bit(&mut self, bit_idx: u8, value: bool);

    /// Extracts the bits in `bits_range` and moves them to the lsb.
    fn get_bits(self, bits_range: RangeInclusive<u8>) -> Self;

    fn get_byte(self, byte_nth: u8) -> u8;

    fn set_byte(&mut self, byte_nth: u8, value: u8);

    /// Returns a sign-extended copy of the value.
    /// `number_of_bits` is the width of the two's complement number
    /// stored in the lowest bits.
    fn sign_extended(self, number_of_bits: u8) -> Self;

    fn is_bit_off(self, bit_idx: u8) -> bool {
        !self.is_bit_on(bit_idx)
    }

    fn get_bit(self, bit_idx: u8) -> bool {
        self.is_bit_on(bit_idx)
    }
}

macro_rules! impl_bits {
    ($($t:ty),*) => {
        $(
            impl Bits for $t {
                fn is_bit_on(self, bit_idx: u8) -> bool {
                    debug_assert!(u32::from(bit_idx) < <$t>::BITS);
                    (self >> bit_idx) & 1 == 1
                }

                fn set_bit(&mut self, bit_idx: u8, value: bool) {
                    debug_assert!(u32::from(bit_idx) < <$t>::BITS);
                    let mask: $t = 1 << bit_idx;
                    if value {
                        *self |= mask;
                    } else {
                        *self &= !mask;
                    }
                }

                fn get_bits(self, bits_range: RangeInclusive<u8>) -> Self {
                    let start = u32::from(*bits_range.start());
                    let length = u32::from(*bits_range.end()) - start + 1;
                    let value = self.checked_shr(start).unwrap_or(0);
                    if length >= <$t>::BITS {
                        value
                    } else {
                        value & ((1 << length) - 1)
                    }
                }

                fn get_byte(self, byte_nth: u8) -> u8 {
                    debug_assert!(u32::from(byte_nth) * 8 < <$t>::BITS);
                    (self >> (byte_nth * 8)) as u8
                }

                fn set_byte(&mut self, byte_nth: u8, value: u8) {
                    debug_assert!(u32::from(byte_nth) * 8 < <$t>::BITS);
                    let shift = byte_nth * 8;
                    *self = (*self & !(0xFF << shift)) | (<$t>::from(value) << shift);
                }

                fn sign_extended(self, number_of_bits: u8) -> Self {
                    debug_assert!(number_of_bits > 0 && u32::from(number_of_bits) <= <$t>::BITS);
                    let unused = <$t>::BITS - u32::from(number_of_bits);
                    let lead = 64 - <$t>::BITS;
                    // Move the sign bit up to bit 63 then arithmetic shift it back.
                    let widened = (u64::from(self) << lead) << unused;
                    ((widened as i64) >> (lead + unused)) as $t
                }
            }
        )*
    };
}

impl_bits!(u8, u16, u32, u64);
