//! Service session/domain lifecycle and the typed dispatch engine.
//!
//! Grounded on `original_source/nx/sf/service.py`'s `Service`/
//! `NonDomainSubService`/`DomainSubService` split (folded here into one
//! tagged record, per spec's suggestion of a shared method set over an
//! inheritance chain) and `nx/services/sm.py`'s `ServiceManager`.

use crate::buffer::{Buffer, BufferAttr, OutHandleAttr};
use crate::cmif::{self, RequestFormat};
use crate::error::{IpcError, Result};
use crate::sm::SmServiceName;
use crate::util;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;
use horizon_error::SmErrorCode;
use horizon_svc::RawHandle;

/// A live (or closed) IPC session: a plain session, a domain root, or a
/// domain sub-object, per the `(own_handle, object_id)` state table.
pub struct Session {
    handle: RawHandle,
    own_handle: bool,
    object_id: u32,
    pointer_buffer_size: u16,
}

impl Session {
    /// Adopts `handle` as a freshly-born plain session, querying its
    /// pointer-buffer size once, as every live session must.
    pub fn from_raw_handle(handle: RawHandle) -> Self {
        let pointer_buffer_size = cmif::query_pointer_buffer_size(handle).unwrap_or(0);

        Self {
            handle,
            own_handle: true,
            object_id: 0,
            pointer_buffer_size,
        }
    }

    fn sub_object(parent: &Session, object_id: u32) -> Self {
        Self {
            handle: parent.handle,
            own_handle: false,
            object_id,
            pointer_buffer_size: parent.pointer_buffer_size,
        }
    }

    /// Adopts `handle` as a non-owning plain session: used for an
    /// overrides-mapping hit, where the handle is shared across callers and
    /// closing this session must not close it.
    fn borrowed(handle: RawHandle) -> Self {
        let pointer_buffer_size = cmif::query_pointer_buffer_size(handle).unwrap_or(0);

        Self {
            handle,
            own_handle: false,
            object_id: 0,
            pointer_buffer_size,
        }
    }

    pub fn handle(&self) -> RawHandle {
        self.handle
    }

    pub fn object_id(&self) -> u32 {
        self.object_id
    }

    pub fn pointer_buffer_size(&self) -> u16 {
        self.pointer_buffer_size
    }

    pub fn is_domain(&self) -> bool {
        self.object_id != 0
    }

    pub fn is_domain_sub_object(&self) -> bool {
        self.object_id != 0 && !self.own_handle
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_null()
    }

    /// Issues the `ConvertCurrentObjectToDomain` control request. The
    /// session's own object id becomes the value the server assigned it
    /// within its new domain; subsequent dispatches include a domain header.
    pub fn convert_to_domain(&mut self) -> Result<()> {
        debug_assert!(self.own_handle, "only a session we own a handle for can become a domain");

        let object_id = cmif::control::convert_to_domain(self.handle)?;
        self.object_id = object_id;
        Ok(())
    }

    /// Closes the session, idempotently. A root's Close frame addresses
    /// object_id 0 and releases the kernel handle; a sub-object's Close
    /// frame addresses its own object_id and leaves the shared handle alone.
    pub fn close(&mut self) {
        if self.is_closed() {
            return;
        }

        if self.own_handle {
            cmif::control::close_object(self.handle);
        } else {
            cmif::control::close_domain_object(self.handle, self.object_id);
        }

        self.handle = RawHandle(0);
        self.own_handle = false;
        self.object_id = 0;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Builds a single typed IPC call against a [`Session`]: mandatory
/// `request_id`, then chained setters for everything the request planner
/// needs, terminated by [`DispatchRequest::send`].
pub struct DispatchRequest {
    request_id: u32,
    context: u32,
    send_pid: bool,
    in_data: Vec<u8>,
    buffers: Vec<(Buffer, BufferAttr)>,
    in_objects: Vec<u32>,
    in_handles: Vec<RawHandle>,
    expect_handles: Vec<OutHandleAttr>,
    expect_objects: u32,
    target_session: Option<RawHandle>,
}

impl DispatchRequest {
    pub fn new(request_id: u32) -> Self {
        Self {
            request_id,
            context: 0,
            send_pid: false,
            in_data: Vec::new(),
            buffers: Vec::new(),
            in_objects: Vec::new(),
            in_handles: Vec::new(),
            expect_handles: Vec::new(),
            expect_objects: 0,
            target_session: None,
        }
    }

    pub fn context(mut self, context: u32) -> Self {
        self.context = context;
        self
    }

    /// Overrides which session handle actually carries the synchronous-send,
    /// while the call is still planned/decoded against the bound `Session`
    /// passed to `send` (its domain/object_id bookkeeping still applies).
    pub fn target_session(mut self, handle: RawHandle) -> Self {
        self.target_session = Some(handle);
        self
    }

    pub fn send_pid(mut self, send_pid: bool) -> Self {
        self.send_pid = send_pid;
        self
    }

    /// Sets the in-data payload, bit-copied from `value`.
    pub fn in_data<T: Copy>(mut self, value: T) -> Self {
        let bytes = unsafe {
            core::slice::from_raw_parts(&value as *const T as *const u8, core::mem::size_of::<T>())
        };
        self.in_data = bytes.to_vec();
        self
    }

    pub fn add_buffer(mut self, buffer: Buffer, attr: BufferAttr) -> Self {
        self.buffers.push((buffer, attr));
        self
    }

    pub fn add_in_object(mut self, object_id: u32) -> Self {
        self.in_objects.push(object_id);
        self
    }

    pub fn add_in_handle(mut self, handle: RawHandle) -> Self {
        self.in_handles.push(handle);
        self
    }

    pub fn expect_handle(mut self, attr: OutHandleAttr) -> Self {
        self.expect_handles.push(attr);
        self
    }

    pub fn expect_objects(mut self, count: u32) -> Self {
        self.expect_objects = count;
        self
    }

    /// Plans, encodes, transports and decodes the call, reconstructing a
    /// typed reply from the declared shape. `Out` must be the exact wire
    /// layout of the out-data; pass `()` when the command has none.
    pub fn send<Out: Copy>(self, session: &Session) -> Result<DispatchResponse<Out>> {
        if session.is_closed() {
            return Err(IpcError::InvalidArgument("dispatch on a closed session"));
        }

        let mut fmt = RequestFormat {
            object_id: session.object_id(),
            request_id: self.request_id,
            context: self.context,
            data_size: self.in_data.len(),
            server_pointer_size: session.pointer_buffer_size() as usize,
            num_objects: self.in_objects.len() as u32,
            num_handles: self.in_handles.len() as u32,
            send_pid: self.send_pid,
            ..Default::default()
        };

        for (_, attr) in &self.buffers {
            fmt.process_buffer(*attr);
        }

        let mut base = Vec::new();
        let mut req = cmif::Request::new(&mut base, &fmt);

        req.add_payload(&mut base, &self.in_data);

        for handle in &self.in_handles {
            req.add_handle(&mut base, *handle);
        }

        for (buffer, attr) in &self.buffers {
            req.process_buffer(&mut base, *buffer, *attr);
        }

        for object_id in &self.in_objects {
            req.add_object(&mut base, *object_id);
        }

        util::extend_to(&mut base, crate::buffer::BUFFER_SIZE);

        #[cfg(feature = "log-ipc-buffers")]
        log_buffer("request", &base);

        let tls = unsafe { crate::buffer::get_ipc_buffer_mut() };
        tls[..base.len()].copy_from_slice(&base);

        let transport_handle = match self.target_session {
            Some(handle) if !handle.is_null() => handle,
            _ => session.handle(),
        };
        unsafe { horizon_svc::send_sync_request(transport_handle) }?;

        let tls = unsafe { crate::buffer::get_ipc_buffer() };

        #[cfg(feature = "log-ipc-buffers")]
        log_buffer("response", tls);

        let out_size = core::mem::size_of::<Out>();
        let mut resp = cmif::Response::new(tls, session.is_domain(), out_size)?;

        let out = unsafe { core::ptr::read_unaligned(tls[resp.data..].as_ptr() as *const Out) };

        let mut objects = Vec::with_capacity(self.expect_objects as usize);
        for _ in 0..self.expect_objects {
            if session.is_domain() {
                let object_id = resp.get_object(tls);
                objects.push(Session::sub_object(session, object_id));
            } else {
                let handle = resp.get_move_handle(tls);
                objects.push(Session::from_raw_handle(handle));
            }
        }

        let mut handles = Vec::with_capacity(self.expect_handles.len());
        for attr in &self.expect_handles {
            let handle = match attr {
                OutHandleAttr::HipcCopy => resp.get_copy_handle(tls),
                OutHandleAttr::HipcMove => resp.get_move_handle(tls),
            };
            handles.push(handle);
        }

        let buffers = self
            .buffers
            .iter()
            .filter(|(_, attr)| attr.contains(BufferAttr::OUT))
            .map(|(buffer, _)| *buffer)
            .collect();

        Ok(DispatchResponse {
            out,
            objects,
            handles,
            buffers,
        })
    }
}

#[cfg(feature = "log-ipc-buffers")]
fn log_buffer(label: &str, buf: &[u8]) {
    assert_eq!(buf.len() % 4, 0);
    eprint!("IPC {} = ", label);
    for w in buf.chunks(4) {
        let w: [u8; 4] = w.try_into().unwrap();
        eprint!("{:02x}{:02x}{:02x}{:02x} ", w[0], w[1], w[2], w[3]);
    }
    eprintln!();
}

/// The typed result of a dispatch call.
pub struct DispatchResponse<Out> {
    pub out: Out,
    pub objects: Vec<Session>,
    pub handles: Vec<RawHandle>,
    /// The Out-attributed entries of the buffers passed to the request,
    /// in declaration order. Their contents are already visible through the
    /// caller's own `Buffer` (the kernel writes map-alias/pointer replies
    /// straight into that memory); this is a convenience view over the same
    /// storage, not a separate copy.
    pub buffers: Vec<Buffer>,
}

const SM_CMD_GET_SERVICE: u32 = 1;
const SM_CMD_REGISTER_SERVICE: u32 = 2;
const SM_CMD_UNREGISTER_SERVICE: u32 = 3;
const SM_CMD_IS_SERVICE_REGISTERED: u32 = 65100;

/// The service-manager client: a plain session to the `sm:` named port,
/// bootstrapped once per process.
///
/// `overrides` is a process-wide adjunct for tests/mocks: a write-once
/// registry of service name to a handle `get_service` should hand back
/// instead of actually asking `sm:`.
pub struct ServiceManager {
    session: Session,
    overrides: RefCell<BTreeMap<String, RawHandle>>,
}

impl ServiceManager {
    /// Connects to `sm:`, retrying while the port doesn't exist yet (the
    /// service manager itself may not have started), then calls Initialize
    /// with the caller's PID, treating "already initialized" as success.
    pub fn initialize() -> Result<Self> {
        let handle = loop {
            match unsafe { horizon_svc::connect_to_named_port(b"sm:\0\0\0\0\0") } {
                Ok(handle) => break handle,
                Err(err)
                    if matches!(
                        err.try_as::<horizon_error::KernelErrorCode>(),
                        Some(horizon_error::KernelErrorCode::NotFound)
                    ) =>
                {
                    unsafe { horizon_svc::sleep_thread(50_000_000) };
                }
                Err(err) => return Err(err.into()),
            }
        };

        let session = Session::from_raw_handle(handle);

        let result = DispatchRequest::new(0)
            .send_pid(true)
            .in_data(0u64)
            .send::<()>(&session);

        match result {
            Ok(_) => {}
            Err(IpcError::Result(code)) if code.try_as::<SmErrorCode>().map(|c| matches!(c, SmErrorCode::AlreadyInitialized)).unwrap_or(false) => {}
            Err(err) => return Err(err),
        }

        Ok(Self {
            session,
            overrides: RefCell::new(BTreeMap::new()),
        })
    }

    /// Registers `handle` as the override for `name`: `get_service(name,
    /// false)` will hand back this handle (non-owning, shared across
    /// callers) instead of asking `sm:`. Write-once: overriding an
    /// already-overridden name is a programmer error.
    pub fn set_override(&self, name: &str, handle: RawHandle) {
        let previous = self.overrides.borrow_mut().insert(name.to_string(), handle);
        debug_assert!(previous.is_none(), "service override for {name:?} registered twice");
    }

    /// Looks up a service by name. Unless `original` is set, a name present
    /// in the overrides mapping returns the overridden handle (shared,
    /// `own_handle=false`) instead of issuing the real `GetService` command.
    pub fn get_service(&self, name: &str, original: bool) -> Result<Session> {
        if !original {
            if let Some(&handle) = self.overrides.borrow().get(name) {
                return Ok(Session::borrowed(handle));
            }
        }

        let sm_name = SmServiceName::try_new(name).ok_or(IpcError::InvalidArgument("service name too long"))?;

        let resp = DispatchRequest::new(SM_CMD_GET_SERVICE)
            .in_data(name_bytes(&sm_name))
            .expect_handle(OutHandleAttr::HipcMove)
            .send::<()>(&self.session)?;

        Ok(Session::from_raw_handle(resp.handles[0]))
    }

    pub fn register_service(&self, name: &str, is_light: bool, max_sessions: u32) -> Result<Session> {
        let name = SmServiceName::try_new(name).ok_or(IpcError::InvalidArgument("service name too long"))?;

        #[derive(Copy, Clone)]
        #[repr(C)]
        struct In {
            name: [u8; 8],
            is_light: bool,
            _padding: [u8; 3],
            max_sessions: u32,
        }

        let resp = DispatchRequest::new(SM_CMD_REGISTER_SERVICE)
            .in_data(In {
                name: name_bytes(&name),
                is_light,
                _padding: [0; 3],
                max_sessions,
            })
            .expect_handle(OutHandleAttr::HipcMove)
            .send::<()>(&self.session)?;

        Ok(Session::from_raw_handle(resp.handles[0]))
    }

    pub fn unregister_service(&self, name: &str) -> Result<()> {
        let name = SmServiceName::try_new(name).ok_or(IpcError::InvalidArgument("service name too long"))?;

        DispatchRequest::new(SM_CMD_UNREGISTER_SERVICE)
            .in_data(name_bytes(&name))
            .send::<()>(&self.session)?;

        Ok(())
    }

    pub fn is_service_registered(&self, name: &str) -> Result<bool> {
        let name = SmServiceName::try_new(name).ok_or(IpcError::InvalidArgument("service name too long"))?;

        let resp = DispatchRequest::new(SM_CMD_IS_SERVICE_REGISTERED)
            .in_data(name_bytes(&name))
            .send::<u8>(&self.session)?;

        Ok(resp.out != 0)
    }
}

fn name_bytes(name: &SmServiceName) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    let s = name.as_str().as_bytes();
    bytes[..s.len()].copy_from_slice(s);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    // Constructs a `Session` bypassing `from_raw_handle`/`sub_object` (which
    // issue a real control request and a syscall respectively), then leaks it
    // so `Drop` doesn't try to close a handle that was never really open.
    fn fake_session(handle: u32, own_handle: bool, object_id: u32) -> Session {
        Session {
            handle: RawHandle(handle),
            own_handle,
            object_id,
            pointer_buffer_size: 0,
        }
    }

    #[test]
    fn plain_session_state() {
        let s = fake_session(1, true, 0);
        assert!(!s.is_domain());
        assert!(!s.is_domain_sub_object());
        assert!(!s.is_closed());
        core::mem::forget(s);
    }

    #[test]
    fn domain_root_state() {
        let s = fake_session(1, true, 3);
        assert!(s.is_domain());
        assert!(!s.is_domain_sub_object());
        assert!(!s.is_closed());
        core::mem::forget(s);
    }

    #[test]
    fn domain_sub_object_state() {
        let s = fake_session(1, false, 7);
        assert!(s.is_domain());
        assert!(s.is_domain_sub_object());
        assert!(!s.is_closed());
        core::mem::forget(s);
    }

    #[test]
    fn closed_session_state() {
        let s = fake_session(0, false, 0);
        assert!(s.is_closed());
        core::mem::forget(s);
    }

    #[test]
    fn close_on_already_closed_session_is_a_no_op() {
        let mut s = fake_session(0, false, 0);
        s.close();
        assert!(s.is_closed());
        core::mem::forget(s);
    }

    #[test]
    fn name_bytes_zero_pads_short_names() {
        let name = SmServiceName::try_new("fsp-srv").unwrap();
        let bytes = name_bytes(&name);
        assert_eq!(&bytes, b"fsp-srv\0");
    }

    #[test]
    fn name_bytes_handles_max_length_name() {
        let name = SmServiceName::try_new("1234567").unwrap();
        let bytes = name_bytes(&name);
        assert_eq!(&bytes, b"1234567\0");
    }
}
