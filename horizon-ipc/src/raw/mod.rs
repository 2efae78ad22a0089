//! Contains raw types for Horizon IPC
//!
//! The HIPC bitfield layouts used to be bindgen output over a C header; the
//! header never made it into the tree, so `hipc` below is hand-written
//! straight from the wire description instead.

#[allow(dead_code)]
pub mod cmif;
#[allow(non_camel_case_types, dead_code, clippy::too_many_arguments)]
pub mod hipc;
