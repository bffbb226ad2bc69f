//! Call-expression parsing, argument coercion, and ABI encode/decode.

pub mod codec;
pub mod coerce;
pub mod expr;

pub use codec::{coerce_arguments, decode, encode, encode_call, selector, MethodSignature};
pub use coerce::{to_text, to_typed, to_typed_array, ArgKind, ScalarKind};
pub use expr::parse_call;
