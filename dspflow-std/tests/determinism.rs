mod common;

use dspflow::*;
use dspflow_std::*;
use proptest::prelude::*;

/// Drives `values` into `din`, runs to completion, resets and runs again.
fn run_twice(module: &Module, values: &[Value], expected: usize) -> (Vec<Value>, Vec<Value>) {
    let mut sim = Simulator::new(module);
    let run = |sim: &mut Simulator| {
        sim.drive(DIN, values.to_vec()).unwrap();
        sim.collect(DOUT, Some(expected)).unwrap();
        let _ = sim.run(1000).unwrap();
        sim.collected(DOUT).unwrap().to_vec()
    };
    let first = run(&mut sim);
    sim.reset();
    let second = run(&mut sim);
    (first, second)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn iir_rerun_is_identical(x in prop::collection::vec(-1.0f64..0.99, 1..64)) {
        let t = FixpType::fixp(2, 14);
        let module = IirConfig {
            b: vec![[0.2, 0.4, 0.2], [1.0, -1.0, 0.0]],
            a: vec![[1.0, -0.5, 0.25], [1.0, 0.3, 0.0]],
            gain: vec![0.5, 1.0],
            ogain: 1.5,
            coef_t: t,
            gain_t: t,
            din_t: t,
            form: IirForm::Df1,
        }
        .module()
        .unwrap();
        let values = x.iter().map(|x| Value::from_f64(t, *x).unwrap()).collect::<Vec<_>>();
        let (first, second) = run_twice(&module, &values, values.len());
        prop_assert_eq!(first.len(), values.len());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn echo_rerun_is_identical(x in prop::collection::vec(-0.5f64..0.5, 1..64)) {
        let t = FixpType::fixp(1, 15);
        let config = EchoConfig { feedback_gain: 0.5, sample_rate: 1000.0, delay: 0.005, din_t: t, stereo: false };
        let values = x.iter().map(|x| Value::from_f64(t, *x).unwrap()).collect::<Vec<_>>();
        let (first, second) = run_twice(&config.module().unwrap(), &values, values.len());
        prop_assert_eq!(first, second);
    }
}

#[test]
fn pulse_rerun_is_identical() {
    let config = PulseConfig { period_w: 4, width_w: 4, depth: 4 };
    let t = FixpType::uint(4);
    let cfg = |period, width| Value::Tuple(vec![common::int(t, period), common::int(t, width)]);
    let values = vec![cfg(3, 0), cfg(5, 3), cfg(1, 0)];
    let (first, second) = run_twice(&config.module().unwrap(), &values, 9);
    assert_eq!(first.len(), 9);
    assert_eq!(first, second);
}
