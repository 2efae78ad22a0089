#![cfg_attr(not(test), no_std)]

//! Concrete service bindings. Just `sm`'s `IUserInterface`, needed to
//! bootstrap the service manager; see `horizon_ipc::session` for the
//! dispatch engine every binding here is a thin wrapper over.

mod gen;

pub use gen::*;
