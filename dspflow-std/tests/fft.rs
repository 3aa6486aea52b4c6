use std::f64::consts::PI;

use dspflow::*;
use dspflow_std::fft::*;
use proptest::prelude::*;

const IN_T: FixpType = FixpType::fixp(1, 7);

fn config(stages: usize, implementation: FftImpl) -> FftConfig {
    FftConfig { stages, twiddle_t: IN_T, din_t: IN_T, dout_t: FixpType::fixp(3, 5), implementation }
}

fn points(x: &[(f64, f64)]) -> Value {
    let part = |x: f64| Value::from_f64(IN_T, x).unwrap();
    Value::Array(x.iter().map(|(re, im)| Value::Array(vec![part(*re), part(*im)])).collect())
}

fn transform(config: &FftConfig, x: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let dout = sim::drive_collect(&config.module().unwrap(), vec![points(x)], 1, 10).unwrap();
    dout[0]
        .as_slice()
        .unwrap()
        .iter()
        .map(|point| (point.field(0).unwrap().to_f64().unwrap(), point.field(1).unwrap().to_f64().unwrap()))
        .collect()
}

fn dft(x: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let n = x.len() as f64;
    (0..x.len())
        .map(|k| {
            x.iter().enumerate().fold((0.0, 0.0), |(re, im), (i, (xr, xi))| {
                let angle = -2.0 * PI * (k * i) as f64 / n;
                (re + xr * angle.cos() - xi * angle.sin(), im + xr * angle.sin() + xi * angle.cos())
            })
        })
        .collect()
}

fn assert_near_dft(x: &[(f64, f64)]) {
    let expected = dft(x);
    for implementation in [FftImpl::List, FftImpl::Recursive] {
        let dout = transform(&config(3, implementation), x);
        for (k, (y, e)) in dout.iter().zip(&expected).enumerate() {
            let close = (y.0 - e.0).abs() < 0.1 && (y.1 - e.1).abs() < 0.1;
            assert!(close, "{:?} bin {}: {:?} vs {:?}", implementation, k, y, e);
        }
    }
}

#[test]
fn ramp_matches_dft() {
    let x = (0..8).map(|i| (f64::from(i) / 8.0, 0.0)).collect::<Vec<_>>();
    assert_near_dft(&x);
}

#[test]
fn complex_input_matches_dft() {
    let x = [
        (0.5, 0.0),
        (0.25, -0.25),
        (-0.5, 0.125),
        (0.0, 0.0),
        (0.75, 0.5),
        (-0.25, -0.75),
        (0.125, 0.25),
        (-1.0, 0.0),
    ];
    assert_near_dft(&x);
}

#[test]
fn index_table_covers_every_slot() {
    for stages in 1..=5 {
        let n = 1 << stages;
        let lists = fft_index_lists(stages);
        assert_eq!(lists.len(), stages);
        for [din0, din1, w] in &lists {
            assert!(din0.iter().zip(din1).all(|(a, b)| a != b && *a < n && *b < n));
            assert!(w.iter().all(|ix| *ix < n));
        }
    }
}

proptest! {
    #[test]
    fn list_equals_recursive(stages in 1usize..=4, raw in prop::collection::vec(-128i32..128, 32)) {
        let n = 1 << stages;
        let x = raw.chunks(2).take(n).map(|c| (f64::from(c[0]) / 128.0, f64::from(c[1]) / 128.0)).collect::<Vec<_>>();
        let list = transform(&config(stages, FftImpl::List), &x);
        prop_assert_eq!(list, transform(&config(stages, FftImpl::Recursive), &x));
    }
}
