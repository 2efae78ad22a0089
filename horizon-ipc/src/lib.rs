#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub use horizon_svc::RawHandle;

pub mod buffer;
pub mod cmif;
pub mod error;
pub mod handle_storage;
pub mod hipc;
pub mod hos_version;
pub mod raw;
pub mod session;
pub mod sm;
pub mod util;
