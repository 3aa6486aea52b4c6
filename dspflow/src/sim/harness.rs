//! Drive-and-collect helpers for single-input, single-output modules.

use linked_hash_map::LinkedHashMap;

use super::{SimError, Simulator};
use crate::hir::{DIN, DOUT};
use crate::lir::Module;
use crate::value::Value;

/// Drives `values` into `din` and collects `expected` values from `dout`.
pub fn drive_collect(
    module: &Module, values: Vec<Value>, expected: usize, timeout: usize,
) -> Result<Vec<Value>, SimError> {
    let mut sim = Simulator::new(module);
    sim.drive(DIN, values)?;
    sim.collect(DOUT, Some(expected))?;
    let _ = sim.run(timeout)?;
    Ok(sim.collected(DOUT)?.to_vec())
}

/// Drives float literals into `din` and collects `expected` numbers from `dout` as floats.
pub fn drive_collect_f64(
    module: &Module, values: &[f64], expected: usize, timeout: usize,
) -> Result<Vec<f64>, SimError> {
    let mut sim = Simulator::new(module);
    sim.drive_f64(DIN, values.iter().copied())?;
    sim.collect(DOUT, Some(expected))?;
    let _ = sim.run(timeout)?;
    sim.collected_f64(DOUT)
}

/// Drives every listed port and collects every output port until the module is flushed.
pub fn simulate(
    module: &Module, drives: Vec<(&str, Vec<Value>)>, timeout: usize,
) -> Result<LinkedHashMap<String, Vec<Value>>, SimError> {
    let mut sim = Simulator::new(module);
    for (port, values) in drives {
        sim.drive(port, values)?;
    }
    for port in module.outputs().keys() {
        sim.collect(port, None)?;
    }
    let _ = sim.run(timeout)?;
    module.outputs().keys().map(|port| Ok((port.clone(), sim.collected(port)?.to_vec()))).collect()
}
