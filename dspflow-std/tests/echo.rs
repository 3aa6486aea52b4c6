mod common;

use dspflow::*;
use dspflow_std::*;

const T: FixpType = FixpType::fixp(1, 15);

fn config(stereo: bool) -> EchoConfig {
    EchoConfig { feedback_gain: 0.6, sample_rate: 8000.0, delay: 0.001, din_t: T, stereo }
}

/// `y[n] = x[n] + floor(g * y[n - delay])` on the sample grid.
fn recurrence(x: &[f64], gain: f64, delay: usize) -> Vec<f64> {
    let q = T.quantum();
    let mut y: Vec<f64> = vec![];
    for (n, x) in x.iter().enumerate() {
        let past = if n >= delay { y[n - delay] } else { 0.0 };
        y.push(x + (gain * past / q).floor() * q);
    }
    y
}

#[test]
fn mono_follows_recurrence() {
    let config = config(false);
    assert_eq!(config.delay_samples(), 8);
    let gain = Fixp::from_f64(T, config.feedback_gain).unwrap().to_f64();

    let x = common::random_samples(11, 64, -0.25, 0.25, T);
    let dout = sim::drive_collect_f64(&config.module().unwrap(), &x, x.len(), 500).unwrap();
    assert_eq!(dout, recurrence(&x, gain, 8));
}

#[test]
fn stereo_follows_recurrence() {
    let config = config(true);
    let gain = Fixp::from_f64(T, config.feedback_gain).unwrap().to_f64();

    let left = common::random_samples(12, 40, -0.25, 0.25, T);
    let right = common::random_samples(13, 40, -0.25, 0.25, T);
    let din = left
        .iter()
        .zip(&right)
        .map(|(l, r)| Value::Tuple(vec![Value::from_f64(T, *l).unwrap(), Value::from_f64(T, *r).unwrap()]))
        .collect();
    let dout = sim::drive_collect(&config.module().unwrap(), din, 40, 500).unwrap();

    let channel = |i: usize| dout.iter().map(|sample| sample.field(i).unwrap().to_f64().unwrap()).collect::<Vec<_>>();
    assert_eq!(channel(0), recurrence(&left, gain, 8));
    assert_eq!(channel(1), recurrence(&right, gain, 8));
}
