mod common;

use std::f64::consts::PI;

use dspflow::*;
use dspflow_std::*;

const PHASE_T: FixpType = FixpType::uint(19);

fn sin_cos(config: &CordicConfig, phases: &[i128]) -> Vec<(i128, i128)> {
    let module = config.module().unwrap();
    let din = phases.iter().map(|p| common::int(PHASE_T, *p)).collect();
    let dout = sim::drive_collect(&module, din, phases.len(), 10 * phases.len() + 100).unwrap();
    dout.into_iter()
        .map(|value| {
            let [sin, cos] = value.into_fields::<2>().unwrap();
            (sin.as_num().unwrap().to_int(), cos.as_num().unwrap().to_int())
        })
        .collect()
}

#[test]
fn quadrant_vectors() {
    let config = CordicConfig { iw: 12, ow: 12, pw: 19, norm_gain: false };
    let phases = [0, 1 << 17, 1 << 18, 3 << 17, 1 << 16];
    let expected = vec![(0, 1192), (1192, 0), (0, -1192), (-1192, 0), (843, 843)];
    assert_eq!(sin_cos(&config, &phases), expected);
}

/// Multiples of `pi/6` and `pi/4` over a full turn, ending one step short of `2pi`.
#[test]
fn directed_table() {
    let config = CordicConfig { iw: 12, ow: 12, pw: 19, norm_gain: false };
    let phases = [
        0, 43690, 65536, 87381, 131072, 174762, 196608, 218453, 262144, 305834, 327680, 349525, 393216, 436906,
        458752, 480597, 524287,
    ];
    let sin: [i128; 17] = [0, 596, 843, 1032, 1192, 1032, 843, 596, 0, -596, -842, -1032, -1192, -1032, -843, -596, 0];
    let cos: [i128; 17] =
        [1192, 1032, 843, 596, 0, -596, -843, -1032, -1192, -1032, -843, -596, 0, 596, 842, 1032, 1192];
    let expected = sin.into_iter().zip(cos).collect::<Vec<_>>();
    assert_eq!(sin_cos(&config, &phases), expected);
    assert!((config.params().unwrap().amplitude(false) - 1191.74).abs() < 0.01);
}

#[test]
fn full_turn_within_a_few_lsb() {
    for norm_gain in [false, true] {
        let config = CordicConfig { iw: 12, ow: 12, pw: 19, norm_gain };
        let amplitude = config.params().unwrap().amplitude(norm_gain);
        let phases = (0..1 << 19).step_by(997).collect::<Vec<i128>>();

        for (phase, (sin, cos)) in phases.iter().zip(sin_cos(&config, &phases)) {
            let angle = 2.0 * PI * *phase as f64 / f64::from(1 << 19);
            let (sin_ref, cos_ref) = (amplitude * angle.sin(), amplitude * angle.cos());
            assert!((sin as f64 - sin_ref).abs() <= 6.0, "sin({}) = {}, expected {}", phase, sin, sin_ref);
            assert!((cos as f64 - cos_ref).abs() <= 6.0, "cos({}) = {}, expected {}", phase, cos, cos_ref);
        }
    }
}

#[test]
fn one_result_per_tick() {
    let config = CordicConfig { iw: 10, ow: 10, pw: 12, norm_gain: true };
    let params = config.params().unwrap();
    let module = config.module().unwrap();
    let mut sim = Simulator::new(&module);
    sim.drive(DIN, (0..16).map(|p| common::int(FixpType::uint(12), p * 256))).unwrap();
    sim.collect(DOUT, Some(16)).unwrap();
    let ticks = sim.run(100).unwrap();
    assert_eq!(ticks, 16 + params.latency());
}
