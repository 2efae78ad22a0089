//! Control-class requests: clone/close handling used directly by
//! `session::Session`, grounded on `original_source/nx/sf/service.py`'s
//! `Service.close`/`convert_to_domain` and `nx/sf/cmif.py`'s control helpers.

use crate::buffer::{get_ipc_buffer, get_ipc_buffer_mut, BUFFER_SIZE};
use crate::cmif::{self, control_command, Response};
use crate::error::Result;
use crate::util;
use alloc::vec::Vec;
use horizon_svc::RawHandle;

/// Issues control command 2 (`CloneCurrentObject`) and returns the move
/// handle for the clone.
///
/// Used by `handle_storage::PooledHandle::new` to populate its pool, which
/// has no way to propagate a failure; a clone failing there means the
/// session is unusable anyway, so this panics rather than threading a
/// `Result` through handle-pool construction.
pub fn clone_object(handle: RawHandle) -> RawHandle {
    try_clone_object(handle).expect("failed to clone session handle")
}

fn try_clone_object(handle: RawHandle) -> Result<RawHandle> {
    let mut base = Vec::new();
    cmif::make_control_request(&mut base, control_command::CLONE_CURRENT_OBJECT, 0);
    util::extend_to(&mut base, BUFFER_SIZE);

    let tls = unsafe { get_ipc_buffer_mut() };
    tls[..base.len()].copy_from_slice(&base);

    unsafe { horizon_svc::send_sync_request(handle) }?;

    let tls = unsafe { get_ipc_buffer() };
    let mut resp = Response::new(tls, false, 0)?;
    Ok(resp.get_move_handle(tls))
}

/// Issues control command 0 (`ConvertCurrentObjectToDomain`) and returns the
/// object id the session becomes known as within its own domain.
pub fn convert_to_domain(handle: RawHandle) -> Result<u32> {
    let mut base = Vec::new();
    cmif::make_control_request(&mut base, control_command::CONVERT_TO_DOMAIN, 0);
    util::extend_to(&mut base, BUFFER_SIZE);

    let tls = unsafe { get_ipc_buffer_mut() };
    tls[..base.len()].copy_from_slice(&base);

    unsafe { horizon_svc::send_sync_request(handle) }?;

    let tls = unsafe { get_ipc_buffer() };
    let resp = Response::new(tls, false, 4)?;

    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&tls[resp.data..resp.data + 4]);
    Ok(u32::from_le_bytes(bytes))
}

/// Sends the Close frame for a session or domain sub-object. The server
/// never replies meaningfully to this (some return "port dead"), so the
/// reply itself is never inspected.
fn send_close_request(handle: RawHandle, object_id: u32) {
    let mut base = Vec::new();
    cmif::make_close_request(&mut base, object_id);
    util::extend_to(&mut base, BUFFER_SIZE);

    let tls = unsafe { get_ipc_buffer_mut() };
    tls[..base.len()].copy_from_slice(&base);

    let _ = unsafe { horizon_svc::send_sync_request(handle) };
}

/// Closes a plain session handle: sends the Close frame, then releases the
/// kernel handle. Both Results are deliberately swallowed — closing must
/// never itself raise — so this is safe to call from `Drop`.
pub fn close_object(handle: RawHandle) {
    send_close_request(handle, 0);
    let _ = horizon_svc::close_handle(handle);
}

/// Closes a domain sub-object: sends the Close frame for `object_id` only.
/// The kernel handle belongs to the domain root and is left untouched.
pub fn close_domain_object(handle: RawHandle, object_id: u32) {
    debug_assert_ne!(object_id, 0);
    send_close_request(handle, object_id);
}
