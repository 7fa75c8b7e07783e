//! Order-preserving encodings for composite storage keys.

pub mod terminated_bytes;
