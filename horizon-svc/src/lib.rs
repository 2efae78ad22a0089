#![no_std]
// hard to specify when dealing with syscalls..
#![allow(clippy::missing_safety_doc)]

//! Defines wrappers around horizon kernel system calls and related types

use bitflags::bitflags;
use core::arch::asm;
use horizon_error::{ErrorCode, Result};

pub type Address = *const u8;
pub type Size = usize;
pub type ThreadEntrypointFn = unsafe extern "C" fn(*mut u8) -> !;
pub type AddressRange = (Address, Size);

/// Opaque reference to a kernel object (session, port, event, ...).
///
/// Released with [close_handle]. A handle value of 0 never refers to a live
/// object and is used as a sentinel for "no handle" throughout the IPC core.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[repr(transparent)]
pub struct RawHandle(pub u32);

impl RawHandle {
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

bitflags! {
    pub struct MemoryPermission: u32 {
        const READ      = 1 << 0;
        const WRITE     = 1 << 1;
        const EXECUTE   = 1 << 2;
        const DONT_CARE  = 1 << 28;
    }
}

/// # Safety
/// `error_code` is a valid error code according to `ErrorCode::new_unchecked`
unsafe fn pack_result<T>(ok_result: T, error_code: u32) -> Result<T> {
    ErrorCode::new_unchecked(error_code).into_result(ok_result)
}

pub unsafe fn set_heap_size(size: Size) -> Result<Address> {
    let mut address: *mut u8;
    let mut error: u32;

    asm!("svc 0x1", in("x0") size, lateout("w0") error, lateout("x1") address);

    pack_result(address, error)
}

pub unsafe fn set_memory_permission(
    range: AddressRange,
    permission: MemoryPermission,
) -> Result<()> {
    let mut error: u32;

    asm!("svc 0x2", in("x0") range.0, in("x1") range.1, in("w2") permission.bits, lateout("w0") error);

    pack_result((), error)
}

pub unsafe fn map_physical_memory(range: AddressRange) -> Result<()> {
    let mut error: u32;

    asm!("svc 0x2C", in("x0") range.0, in("x1") range.1, lateout("w0") error);

    pack_result((), error)
}

/// Blocks until the server handling `handle` replies, per the request built
/// into the calling thread's TLS IPC buffer; the reply overwrites the same
/// buffer in place.
pub unsafe fn send_sync_request(handle: RawHandle) -> Result<()> {
    let mut error: u32;

    asm!("svc 0x21", in("w0") handle.0, lateout("w0") error);

    pack_result((), error)
}

/// Releases a kernel handle. Safe to call on an already-released handle only
/// in the sense that the kernel returns an error rather than corrupting
/// state; callers must still track ownership themselves.
pub unsafe fn close_handle(handle: RawHandle) -> Result<()> {
    let mut error: u32;

    asm!("svc 0x16", in("w0") handle.0, lateout("w0") error);

    pack_result((), error)
}

/// `name` must be at most 8 bytes; the kernel reads exactly 8 bytes from the
/// pointer regardless of the port name's actual length.
pub unsafe fn connect_to_named_port(name: &[u8; 8]) -> Result<RawHandle> {
    let mut error: u32;
    let mut handle: u32;

    asm!(
        "svc 0x1F",
        in("x1") name.as_ptr(),
        lateout("w0") error,
        lateout("w1") handle,
    );

    pack_result(RawHandle(handle), error)
}

/// Suspends the current thread for at least `nanos` nanoseconds. Passing 0
/// yields to another thread of equal priority without actually sleeping.
pub unsafe fn sleep_thread(nanos: i64) {
    asm!("svc 0x0B", in("x0") nanos);
}
