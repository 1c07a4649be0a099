use crate::error::BitReaderError;

/// Reads big-endian, non-byte-aligned bit fields out of a message payload.
///
/// Bytes are pulled lazily into a 128-bit accumulator as wider fields are
/// requested. The accumulator holds its buffered bits right-justified (as
/// the low `acc_bits` bits of `acc`), oldest bits most significant, so a
/// read of `n` bits always comes off the top of what's currently buffered.
pub struct BitReader<'a> {
    payload: &'a [u8],
    byte_pos: usize,
    acc: u128,
    acc_bits: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        BitReader { payload, byte_pos: 0, acc: 0, acc_bits: 0 }
    }

    /// Number of whole bits not yet consumed, across the accumulator and the
    /// unread remainder of the payload.
    pub fn bits_remaining(&self) -> usize {
        self.acc_bits as usize + (self.payload.len() - self.byte_pos) * 8
    }

    fn fill(&mut self, want: u32) -> Result<(), BitReaderError> {
        while self.acc_bits < want {
            if self.byte_pos >= self.payload.len() {
                return Err(BitReaderError::Underrun {
                    requested: want,
                    available: self.bits_remaining() as u32,
                });
            }
            let byte = self.payload[self.byte_pos];
            self.byte_pos += 1;
            self.acc = (self.acc << 8) | byte as u128;
            self.acc_bits += 8;
        }
        Ok(())
    }

    /// Extracts an unsigned field of `n` bits (0..=64), MSB first.
    pub fn get_bits(&mut self, n: u32) -> Result<u64, BitReaderError> {
        if n == 0 {
            return Ok(0);
        }
        if n > 64 {
            return Err(BitReaderError::InvalidWidth(n));
        }
        self.fill(n)?;
        let shift = self.acc_bits - n;
        let value = (self.acc >> shift) as u64 & mask64(n);
        self.acc_bits = shift;
        self.acc &= (1u128 << shift) - 1;
        Ok(value)
    }

    /// Extracts a two's-complement signed field of `n` bits (1..=64).
    pub fn get_bits_signed(&mut self, n: u32) -> Result<i64, BitReaderError> {
        if n == 0 || n > 64 {
            return Err(BitReaderError::InvalidWidth(n));
        }
        let raw = self.get_bits(n)?;
        if n == 64 {
            return Ok(raw as i64);
        }
        let shift = 64 - n;
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Extracts an unsigned field and scales it into a float.
    pub fn get_float(&mut self, n: u32, scale: f64) -> Result<f64, BitReaderError> {
        Ok(self.get_bits(n)? as f64 * scale)
    }

    /// Extracts a two's-complement signed field and scales it into a float.
    pub fn get_float_signed(&mut self, n: u32, scale: f64) -> Result<f64, BitReaderError> {
        Ok(self.get_bits_signed(n)? as f64 * scale)
    }

    /// Extracts a sign-magnitude field: the top bit is the sign (1 = negative),
    /// the remaining `n - 1` bits are the magnitude. Used by GLONASS
    /// ephemeris fields, which RTCM encodes sign-magnitude rather than
    /// two's-complement.
    pub fn get_float_sign_magnitude(&mut self, n: u32, scale: f64) -> Result<f64, BitReaderError> {
        if n == 0 || n > 64 {
            return Err(BitReaderError::InvalidWidth(n));
        }
        let raw = self.get_bits(n)?;
        let sign_bit = 1u64 << (n - 1);
        let magnitude = (raw & (sign_bit - 1)) as f64 * scale;
        if raw & sign_bit != 0 {
            Ok(-magnitude)
        } else {
            Ok(magnitude)
        }
    }

    /// Discards `n` bits without interpreting them.
    pub fn skip(&mut self, n: u32) -> Result<(), BitReaderError> {
        let mut remaining = n;
        while remaining > 64 {
            self.get_bits(64)?;
            remaining -= 64;
        }
        self.get_bits(remaining)?;
        Ok(())
    }
}

fn mask64(n: u32) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn reads_unaligned_fields() {
        let data = [0b1010_1100u8, 0b1111_0000u8];
        let mut r = BitReader::new(&data);
        assert_eq!(r.get_bits(4).unwrap(), 0b1010);
        assert_eq!(r.get_bits(4).unwrap(), 0b1100);
        assert_eq!(r.get_bits(4).unwrap(), 0b1111);
        assert_eq!(r.get_bits(4).unwrap(), 0b0000);
    }

    #[test]
    fn signed_field_sign_extends() {
        let data = [0b1111_1110u8];
        let mut r = BitReader::new(&data);
        assert_eq!(r.get_bits_signed(4).unwrap(), -1);
    }

    #[test]
    fn sign_magnitude_negative() {
        let data = [0b1000_0101u8];
        let mut r = BitReader::new(&data);
        let v = r.get_float_sign_magnitude(8, 1.0).unwrap();
        assert_eq!(v, -5.0);
    }

    #[test]
    fn scaled_float_fields_apply_scale_after_sign_extension() {
        use float_eq::assert_float_eq;
        // 16-bit signed field, value -100, scaled by 2^-5 as GPS Crs is.
        let mut bits = Vec::new();
        let raw = (-100i32 as u32) & 0xFFFF;
        for i in (0..16).rev() {
            bits.push((raw >> i) & 1 != 0);
        }
        let data: Vec<u8> = bits.chunks(8).map(|c| c.iter().fold(0u8, |acc, &b| (acc << 1) | b as u8)).collect();
        let mut r = BitReader::new(&data);
        let value = r.get_float_signed(16, 2f64.powi(-5)).unwrap();
        assert_float_eq!(value, -100.0 * 2f64.powi(-5), abs <= 1e-12);
    }

    #[test]
    fn underrun_reports_requested_and_available() {
        let data = [0xFFu8];
        let mut r = BitReader::new(&data);
        let err = r.get_bits(16).unwrap_err();
        assert_eq!(err, BitReaderError::Underrun { requested: 16, available: 8 });
    }

    #[test]
    fn crosses_multiple_accumulator_fills() {
        let data = [0xFFu8; 9];
        let mut r = BitReader::new(&data);
        assert_eq!(r.get_bits(64).unwrap(), u64::MAX);
        assert_eq!(r.get_bits(8).unwrap(), 0xFF);
    }

    #[test]
    fn odd_widths_stay_aligned_across_many_reads() {
        let data = [0x12u8, 0x34, 0x56, 0x78, 0x9A, 0xBC];
        let mut r = BitReader::new(&data);
        let mut bits = Vec::new();
        for _ in 0..16 {
            bits.push(r.get_bits(3).unwrap());
        }
        // re-read the same payload 1 bit at a time and repack into 3-bit groups
        let mut r2 = BitReader::new(&data);
        let mut single = Vec::new();
        for _ in 0..48 {
            single.push(r2.get_bits(1).unwrap());
        }
        for (i, chunk) in single.chunks(3).enumerate() {
            let v = chunk.iter().fold(0u64, |acc, b| (acc << 1) | b);
            assert_eq!(v, bits[i]);
        }
    }

    proptest! {
        #[test]
        fn get_bits_roundtrips_against_manual_shift(bytes in proptest::collection::vec(any::<u8>(), 4..8)) {
            let mut r = BitReader::new(&bytes);
            let value = r.get_bits(32).unwrap();
            let expected = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as u64;
            prop_assert_eq!(value, expected);
        }
    }
}
