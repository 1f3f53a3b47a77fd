/// Szudzik pairing function.
///
/// ```text
/// (a, b) -> if (a<b) then (b^2 + a) else (a^2 + a + b)
/// ```
///
/// Arithmetic wraps on overflow: the result is used as a hash, not as a
/// bijection, once the inputs grow past `2^32`.
pub fn pairing_szudzik(a: u64, b: u64) -> u64 {
    if a < b {
        b.wrapping_mul(b).wrapping_add(a)
    } else {
        a.wrapping_mul(a).wrapping_add(a).wrapping_add(b)
    }
}

/// [Pairing function][pairing] for two `u64` values.
///
/// [pairing]: https://en.wikipedia.org/wiki/Pairing_function
pub fn pairing2(a: u64, b: u64) -> u64 {
    pairing_szudzik(a, b)
}

/// Folds a sequence into one value by repeated pairing.
///
/// The length is mixed in first, so `[0]` and `[0, 0]` hash differently.
pub fn pairing_seq(values: impl ExactSizeIterator<Item = u64>) -> u64 {
    let len = values.len() as u64;
    values.fold(len, pairing2)
}

pub trait MyHash {
    /// Hash used for bucket selection in [`Table`][crate::table::Table].
    fn hash(&self) -> u64;
}

impl MyHash for [u32] {
    fn hash(&self) -> u64 {
        pairing_seq(self.iter().map(|&x| x as u64))
    }
}
