//! Thin binding for `sm`'s `IUserInterface`, the one concrete service this
//! crate needs to bootstrap itself. All of the framing/dispatch work lives
//! in `horizon_ipc::session`; this is just the stable, named entry point a
//! caller reaches for instead of constructing a `ServiceManager` by hand.

use horizon_ipc::error::Result;
use horizon_ipc::session::{ServiceManager, Session};
use horizon_svc::RawHandle;

pub struct IUserInterface(ServiceManager);

impl IUserInterface {
    pub fn initialize() -> Result<Self> {
        Ok(Self(ServiceManager::initialize()?))
    }

    pub fn get_service(&self, name: &str, original: bool) -> Result<Session> {
        self.0.get_service(name, original)
    }

    pub fn set_override(&self, name: &str, handle: RawHandle) {
        self.0.set_override(name, handle)
    }

    pub fn register_service(&self, name: &str, is_light: bool, max_sessions: u32) -> Result<Session> {
        self.0.register_service(name, is_light, max_sessions)
    }

    pub fn unregister_service(&self, name: &str) -> Result<()> {
        self.0.unregister_service(name)
    }

    pub fn is_service_registered(&self, name: &str) -> Result<bool> {
        self.0.is_service_registered(name)
    }
}
