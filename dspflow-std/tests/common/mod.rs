//! Helpers shared by the integration tests.

#![allow(dead_code)]

use dspflow::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

/// Asserts that every simulated sample lies within `tol` of its reference.
pub fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len(), "number of samples");
    for (n, (a, e)) in actual.iter().zip(expected).enumerate() {
        let err = (a - e).abs();
        if err > tol {
            warn!(n, actual = a, expected = e, err, "simulated sample deviates from the reference");
        }
        assert!(err <= tol, "sample {}: simulated {} vs reference {} (tolerance {})", n, a, e, tol);
    }
}

/// `convolve(x, b)` truncated to the length of `x`.
pub fn convolve(x: &[f64], b: &[f64]) -> Vec<f64> {
    (0..x.len()).map(|n| b.iter().enumerate().filter(|(k, _)| *k <= n).map(|(k, b)| b * x[n - k]).sum()).collect()
}

/// Seeded uniform samples in `[lo, hi)`, snapped to `t`.
pub fn random_samples(seed: u64, len: usize, lo: f64, hi: f64, t: FixpType) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| Fixp::from_f64(t, rng.gen_range(lo..hi)).unwrap().to_f64()).collect()
}

/// Integer number of type `t`.
pub fn int(t: FixpType, x: i128) -> Value { Value::Num(Fixp::from_int(t, x).unwrap()) }

/// Feeds `x` with `n % 3` idle ticks before sample `n`, checking that idle ticks produce nothing.
pub fn run_with_gaps(module: &Module, x: &[Value]) -> Vec<Value> {
    let mut sim = Simulator::new(module);
    let mut dout = vec![];
    for (n, x) in x.iter().enumerate() {
        for _ in 0..n % 3 {
            assert_eq!(sim.step(&[]).unwrap()[DOUT], None);
        }
        dout.extend(sim.step(&[(DIN, x.clone())]).unwrap()[DOUT].clone());
    }
    dout
}
