// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

static BIT_MASK: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];

/// Returns ceil(value / divisor)
#[inline]
pub fn ceil(value: usize, divisor: usize) -> usize {
    value / divisor + ((value % divisor != 0) as usize)
}

/// Returns the nearest number that is `>=` than `num` and is a multiple of `factor`. `factor` must
/// be a power of 2.
#[inline]
pub fn round_upto_power_of_2(num: usize, factor: usize) -> usize {
    debug_assert!(factor > 0 && (factor & (factor - 1)) == 0);
    (num + (factor - 1)) & !(factor - 1)
}

/// Returns whether bit at position `i` in `data` is set or not
#[inline]
pub fn get_bit(data: &[u8], i: usize) -> bool {
    (data[i >> 3] & BIT_MASK[i & 7]) != 0
}

#[inline]
pub fn set_bit(bits: &mut [u8], i: usize) {
    bits[i / 8] |= 1 << (i % 8);
}

/// Packs a sequence of booleans into a LSB-first bitmap, as used by Arrow validity buffers.
pub fn pack_bools<I: IntoIterator<Item = bool>>(bools: I) -> Vec<u8> {
    let mut bits = Vec::new();
    for (i, b) in bools.into_iter().enumerate() {
        if i % 8 == 0 {
            bits.push(0);
        }
        if b {
            set_bit(&mut bits, i);
        }
    }
    bits
}

/// Reads a little-endian `i32` at byte `offset` of `src`.
#[inline]
pub fn read_i32_le(src: &[u8], offset: usize) -> i32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&src[offset..offset + 4]);
    i32::from_le_bytes(bytes)
}

/// Writes `value` as a little-endian `i32` at byte `offset` of `dst`.
#[inline]
pub fn write_i32_le(dst: &mut [u8], offset: usize, value: i32) {
    dst[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_ceil() {
        assert_eq!(ceil(0, 1), 0);
        assert_eq!(ceil(1, 1), 1);
        assert_eq!(ceil(1, 2), 1);
        assert_eq!(ceil(1, 8), 1);
        assert_eq!(ceil(7, 8), 1);
        assert_eq!(ceil(8, 8), 1);
        assert_eq!(ceil(9, 8), 2);
        assert_eq!(ceil(9, 9), 1);
        assert_eq!(ceil(10000000000, 10), 1000000000);
        assert_eq!(ceil(10, 10000000000), 1);
    }

    #[test]
    fn test_round_upto_power_of_2() {
        assert_eq!(round_upto_power_of_2(0, 8), 0);
        assert_eq!(round_upto_power_of_2(1, 8), 8);
        assert_eq!(round_upto_power_of_2(8, 8), 8);
        assert_eq!(round_upto_power_of_2(13, 8), 16);
        assert_eq!(round_upto_power_of_2(63, 64), 64);
    }

    #[test]
    fn test_get_bit() {
        // 00001101
        assert!(get_bit(&[0b00001101], 0));
        assert!(!get_bit(&[0b00001101], 1));
        assert!(get_bit(&[0b00001101], 2));
        assert!(get_bit(&[0b00001101], 3));

        // 01001001 01010010
        assert!(get_bit(&[0b01001001, 0b01010010], 0));
        assert!(!get_bit(&[0b01001001, 0b01010010], 1));
        assert!(!get_bit(&[0b01001001, 0b01010010], 2));
        assert!(get_bit(&[0b01001001, 0b01010010], 3));
        assert!(!get_bit(&[0b01001001, 0b01010010], 4));
        assert!(!get_bit(&[0b01001001, 0b01010010], 5));
        assert!(get_bit(&[0b01001001, 0b01010010], 6));
        assert!(!get_bit(&[0b01001001, 0b01010010], 7));
        assert!(!get_bit(&[0b01001001, 0b01010010], 8));
        assert!(get_bit(&[0b01001001, 0b01010010], 9));
        assert!(!get_bit(&[0b01001001, 0b01010010], 10));
        assert!(!get_bit(&[0b01001001, 0b01010010], 11));
        assert!(get_bit(&[0b01001001, 0b01010010], 12));
        assert!(!get_bit(&[0b01001001, 0b01010010], 13));
        assert!(get_bit(&[0b01001001, 0b01010010], 14));
        assert!(!get_bit(&[0b01001001, 0b01010010], 15));
    }

    #[test]
    fn test_set_bit() {
        let mut buffer = vec![0, 0, 0];
        set_bit(&mut buffer[..], 1);
        assert_eq!(buffer, vec![2, 0, 0]);
        set_bit(&mut buffer[..], 4);
        assert_eq!(buffer, vec![18, 0, 0]);
        set_bit(&mut buffer[..], 10);
        assert_eq!(buffer, vec![18, 4, 0]);
        set_bit(&mut buffer[..], 10);
        assert_eq!(buffer, vec![18, 4, 0]);
        set_bit(&mut buffer[..], 11);
        assert_eq!(buffer, vec![18, 12, 0]);
    }

    #[test]
    fn test_pack_bools() {
        assert!(pack_bools(Vec::<bool>::new()).is_empty());
        assert_eq!(pack_bools([true, false, true, true, true]), vec![0b00011101]);

        let mut rng = rand::rng();
        let bools: Vec<bool> = (0..100).map(|_| rng.random_bool(0.5)).collect();
        let packed = pack_bools(bools.iter().copied());
        assert_eq!(packed.len(), ceil(bools.len(), 8));
        for (i, b) in bools.iter().enumerate() {
            assert_eq!(get_bit(&packed, i), *b);
        }
    }

    #[test]
    fn test_read_write_i32() {
        let mut buffer = vec![0u8; 8];
        write_i32_le(&mut buffer, 4, -2);
        assert_eq!(buffer, vec![0, 0, 0, 0, 0xFE, 0xFF, 0xFF, 0xFF]);
        assert_eq!(read_i32_le(&buffer, 4), -2);
        assert_eq!(read_i32_le(&buffer, 0), 0);
    }
}
