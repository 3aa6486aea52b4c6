//! DspFlow: streaming fixed-point dataflow networks with cycle-accurate simulation.

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
//
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::invalid_rust_codeblocks)]
#![deny(rustdoc::bare_urls)]
//
#![allow(clippy::needless_lifetimes)]
#![allow(elided_lifetimes_in_paths)]

pub mod hir;
pub mod lir;
pub mod num;
pub mod signal;
pub mod sim;
pub mod utils;
pub mod value;

pub use dspflow_macro::Signal;
pub use hir::*;
#[doc(hidden)]
pub use linked_hash_map;
pub use lir::{GraphError, Module, NodeId};
pub use num::*;
pub use signal::Signal;
pub use sim::{SimError, Simulator};
pub use utils::*;
pub use value::*;
