/// Squared Euclidean distance between two points.
///
/// # Examples
/// ```
/// use rs_sph_tree::utils::distance_squared;
///
/// assert_eq!(distance_squared(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
/// ```
#[inline]
pub fn distance_squared<const D: usize>(a: &[f64; D], b: &[f64; D]) -> f64 {
    let mut sum = 0.0;
    for k in 0..D {
        let d = a[k] - b[k];
        sum += d * d;
    }
    sum
}

/// `2^exponent`. Callers keep `exponent` below `usize::BITS`.
#[inline]
pub fn pow2(exponent: u32) -> usize {
    1usize << exponent
}
