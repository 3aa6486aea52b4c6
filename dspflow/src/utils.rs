//! Utilities.

/// Returns ceiling log2.
pub const fn clog2(value: usize) -> usize {
    if value == 0 {
        0
    } else {
        (::std::mem::size_of::<usize>() * 8) - (value - 1).leading_zeros() as usize
    }
}

/// Returns the smallest power of two that is greater than or equal to `value`.
///
/// ### Example
/// ```
/// # use dspflow::ceil_pow2;
/// assert_eq!(ceil_pow2(5), 8);
/// assert_eq!(ceil_pow2(8), 8);
/// assert_eq!(ceil_pow2(0), 1);
/// ```
pub const fn ceil_pow2(value: usize) -> usize { 1 << clog2(value) }

/// Some or executing the given expression.
#[macro_export]
macro_rules! some_or {
    ($e:expr, $err:expr) => {{
        match $e {
            Some(r) => r,
            None => $err,
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log2_and_pow2() {
        assert_eq!(clog2(1), 0);
        assert_eq!(clog2(2), 1);
        assert_eq!(clog2(3), 2);
        assert_eq!(clog2(1024), 10);
        assert_eq!(ceil_pow2(1), 1);
        assert_eq!(ceil_pow2(2000), 2048);
    }
}
