//! PDU types generated by `pdugen` at build time.
//!
//! - [`dis`]: the DIS subset in `schemas/dis_subset.xml` at the repository root
//! - [`edge`]: awkward names, signed and wide counts, text arrays and
//!   extreme literals from `schemas/edge_cases.xml`
//!
//! Nothing here is written by hand; `build.rs` renders every class with the
//! Rust backend and this crate compiles the result.

pub mod dis {
    include!(concat!(env!("OUT_DIR"), "/dis.rs"));
}

pub mod edge {
    include!(concat!(env!("OUT_DIR"), "/edge.rs"));
}
