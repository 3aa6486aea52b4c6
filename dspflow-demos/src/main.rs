//! Builds and simulates the standard topologies on synthetic signals.

mod cordic;
mod echo;
mod fft;
mod filters;
mod matrix;
mod pulse;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dspflow::Module;
use serde::de::DeserializeOwned;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Streaming DSP demos.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON configuration, the built-in one if omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Number of input samples
    #[arg(long, global = true, default_value_t = 32)]
    len: usize,

    #[command(subcommand)]
    demo: Demo,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Demo {
    /// FIR filter on a two-tone signal
    Fir,
    /// IIR filter on a two-tone signal
    Iir,
    /// Echo effect on a decaying click
    Echo,
    /// CORDIC sine and cosine over a phase ramp
    Cordic,
    /// FFT of a ramp
    Fft,
    /// Matrix product of random integer matrices
    Matrix,
    /// Pulse generator
    Pulse,
}

/// Reads a configuration from `path`, or falls back to `default`.
pub(crate) fn load_config<T: DeserializeOwned>(path: Option<&Path>, default: impl FnOnce() -> T) -> Result<T> {
    let path = match path {
        Some(path) => path,
        None => return Ok(default()),
    };
    let json = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid configuration {}", path.display()))
}

/// Logs the shape of a built module.
pub(crate) fn describe(module: &Module) {
    for (port, _) in module.inputs() {
        tracing::info!(module = module.name(), port = port.as_str(), typ = ?module.input_typ(port), "input");
    }
    for (port, _) in module.outputs() {
        tracing::info!(module = module.name(), port = port.as_str(), typ = ?module.output_typ(port), "output");
    }
    tracing::info!(
        module = module.name(),
        nodes = module.graph().len(),
        stateful = module.num_stateful(),
        "built"
    );
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.config.as_deref();
    match args.demo {
        Demo::Fir => filters::fir(load_config(config, filters::fir_config)?, args.len),
        Demo::Iir => filters::iir(load_config(config, filters::iir_config)?, args.len),
        Demo::Echo => echo::run(load_config(config, echo::config)?, args.len),
        Demo::Cordic => cordic::run(load_config(config, cordic::config)?, args.len),
        Demo::Fft => fft::run(load_config(config, fft::config)?),
        Demo::Matrix => matrix::run(load_config(config, matrix::config)?),
        Demo::Pulse => pulse::run(load_config(config, pulse::config)?),
    }
}
