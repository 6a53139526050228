use std::f64::consts::LN_2;
use std::io::Cursor;

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

/// Upper bound on hash functions; beyond this the filter is mostly
/// hashing cost for negligible gain.
const MAX_HASH_FUNCS: usize = 50;

const MIN_SIZE_BITS: usize = 8;

/// Probabilistic set over byte strings.
///
/// `contains` never returns `false` for an inserted element; it may return
/// `true` for one that was never inserted. Bit positions come from two
/// MurmurHash3 values combined by double hashing, `h1 + i * h2 (mod m)`,
/// with the tweak added to both seeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBloomFilter")]
pub struct BloomFilter {
    #[serde(serialize_with = "packed_bits::serialize")]
    bits: BitVec<u8, Lsb0>,
    hash_funcs: usize,
    tweak: u32,
    inserted: usize,
}

/// Wire form of a [`BloomFilter`], checked before it becomes one.
#[derive(Deserialize)]
struct RawBloomFilter {
    #[serde(deserialize_with = "packed_bits::deserialize")]
    bits: BitVec<u8, Lsb0>,
    hash_funcs: usize,
    tweak: u32,
    inserted: usize,
}

impl TryFrom<RawBloomFilter> for BloomFilter {
    type Error = String;

    fn try_from(raw: RawBloomFilter) -> Result<Self, Self::Error> {
        if raw.bits.len() < MIN_SIZE_BITS {
            return Err(format!(
                "filter has {} bits, need at least {MIN_SIZE_BITS}",
                raw.bits.len()
            ));
        }
        if !(1..=MAX_HASH_FUNCS).contains(&raw.hash_funcs) {
            return Err(format!(
                "hash function count {} outside 1..={MAX_HASH_FUNCS}",
                raw.hash_funcs
            ));
        }
        Ok(Self {
            bits: raw.bits,
            hash_funcs: raw.hash_funcs,
            tweak: raw.tweak,
            inserted: raw.inserted,
        })
    }
}

impl BloomFilter {
    /// An empty filter of `size_bits` bits probed by `hash_funcs` hashes.
    pub fn new(size_bits: usize, hash_funcs: usize, tweak: u32) -> Self {
        Self {
            bits: bitvec![u8, Lsb0; 0; size_bits.max(MIN_SIZE_BITS)],
            hash_funcs: hash_funcs.clamp(1, MAX_HASH_FUNCS),
            tweak,
            inserted: 0,
        }
    }

    /// A filter sized so that `expected` insertions give roughly
    /// `false_positive_rate`.
    pub fn with_rate(expected: usize, false_positive_rate: f64, tweak: u32) -> Self {
        let (size_bits, hash_funcs) = optimal_params(expected, false_positive_rate);
        Self::new(size_bits, hash_funcs, tweak)
    }

    pub fn insert(&mut self, element: &[u8]) {
        let positions = hash_positions(element, self.bits.len(), self.hash_funcs, self.tweak);
        for pos in positions {
            self.bits.set(pos, true);
        }
        self.inserted += 1;
    }

    pub fn contains(&self, element: &[u8]) -> bool {
        hash_positions(element, self.bits.len(), self.hash_funcs, self.tweak)
            .all(|pos| self.bits[pos])
    }

    pub fn clear(&mut self) {
        self.bits.fill(false);
        self.inserted = 0;
    }

    /// Estimated false-positive rate at the current load,
    /// `(1 - e^(-kn/m))^k`.
    pub fn estimated_fpr(&self) -> f64 {
        let m = self.bits.len() as f64;
        let k = self.hash_funcs as f64;
        let n = self.inserted as f64;
        (1.0 - (-k * n / m).exp()).powf(k)
    }

    pub fn size_bits(&self) -> usize {
        self.bits.len()
    }

    pub fn hash_funcs(&self) -> usize {
        self.hash_funcs
    }

    pub fn tweak(&self) -> u32 {
        self.tweak
    }

    /// Number of `insert` calls, including repeats.
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Packed bit array, little-endian bit order within each byte.
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }
}

/// The `k` bit positions probed for `element` in an `m`-bit filter.
/// `m` is never zero: both constructors enforce a minimum size.
fn hash_positions(element: &[u8], m: usize, k: usize, tweak: u32) -> impl Iterator<Item = usize> {
    let m = m as u64;
    let h1 = murmur(element, 0, tweak);
    let h2 = murmur(element, 1, tweak);
    (0..k as u64).map(move |i| (h1.wrapping_add(i.wrapping_mul(h2)) % m) as usize)
}

/// Low 64 bits of MurmurHash3 x64-128.
fn murmur(element: &[u8], seed: u32, tweak: u32) -> u64 {
    let mut cursor = Cursor::new(element);
    // Reading from an in-memory cursor cannot fail.
    murmur3::murmur3_x64_128(&mut cursor, seed.wrapping_add(tweak)).unwrap_or(0) as u64
}

/// `(bits, hash functions)` for `n` elements at false-positive rate `p`:
/// `m = -n ln p / ln²2`, `k = (m / n) ln 2`.
pub fn optimal_params(n: usize, p: f64) -> (usize, usize) {
    if n == 0 || !(p > 0.0 && p < 1.0) {
        return (8, 1);
    }
    let n = n as f64;
    let m = (-n * p.ln() / (LN_2 * LN_2)).ceil();
    let k = ((m / n) * LN_2).round() as usize;
    (m as usize, k.clamp(1, MAX_HASH_FUNCS))
}

mod packed_bits {
    use bitvec::prelude::*;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bits: &BitVec<u8, Lsb0>, s: S) -> Result<S::Ok, S::Error> {
        (bits.as_raw_slice(), bits.len()).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BitVec<u8, Lsb0>, D::Error> {
        let (bytes, len): (Vec<u8>, usize) = Deserialize::deserialize(d)?;
        if len > bytes.len() * 8 {
            return Err(serde::de::Error::custom("bit length exceeds packed bytes"));
        }
        let mut bits = BitVec::from_vec(bytes);
        bits.truncate(len);
        Ok(bits)
    }
}
