//! Standard library of signal-processing topologies.

// # Tries to deny all lints (`rustc -W help`).
#![deny(absolute_paths_not_starting_with_crate)]
#![deny(anonymous_parameters)]
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(missing_debug_implementations)]
#![deny(non_ascii_idents)]
#![deny(rust_2018_idioms)]
#![deny(trivial_numeric_casts)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
#![deny(unused_qualifications)]
//
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::invalid_rust_codeblocks)]
#![deny(rustdoc::bare_urls)]
#![deny(unreachable_pub)]
//
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::type_complexity)]
#![allow(elided_lifetimes_in_paths)]

use dspflow::*;

pub mod basic_blocks;
pub mod cordic;
pub mod echo;
pub mod fft;
pub mod fir;
mod fsm;
pub mod iir;
pub mod matrix_ops;
mod prefill;
pub mod pulse;
mod queue;

pub use basic_blocks::{DspConfig, DspExt, FormatFixpExt, MuxDspExt};
pub use cordic::{CordicConfig, CordicExt, CordicParams};
pub use echo::{EchoConfig, EchoExt};
pub use fft::{FftConfig, FftExt, FftImpl};
pub use fir::{FirConfig, FirExt, FirForm};
pub use fsm::ConsumeExt;
pub use iir::{IirConfig, IirExt, IirForm};
pub use matrix_ops::{MatrixConfig, MatrixExt};
pub use prefill::PrefillExt;
pub use pulse::{PulseConfig, PulseExt};
pub use queue::QueueExt;
