//! Implementation of `#[derive(Signal)]`.
//!
//! # Note
//!
//! A struct is carried as a tuple of its fields in declaration order, so every field type has to implement
//! `Signal` as well.
//!
//! ```ignore
//! #[derive(Debug, Clone, Signal)]
//! struct State {
//!     count: usize,
//!     loaded: bool,
//! }
//!
//! // State { count: 3, loaded: true } <-> Value::Tuple(vec![Value::Num(3: Uint[64]), Value::Bool(true)])
//! ```

mod signal;

use proc_macro::TokenStream;

#[proc_macro_derive(Signal)]
pub fn signal(input: TokenStream) -> TokenStream { signal::derive(input) }
