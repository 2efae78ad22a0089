//! Thread-local IPC mailbox access, plus the `Buffer`/`BufferAttr` types the
//! CMIF request planner consumes for send/recv/exch buffer transfers.

use bitflags::bitflags;
use core::arch::asm;

#[inline]
pub unsafe fn get_ipc_buffer_ptr() -> *mut u8 {
    let buffer_ptr: *mut u8;
    asm! {
        "mrs {}, TPIDRRO_EL0",
        out(reg) buffer_ptr
    };
    buffer_ptr
}

/// Size of the thread-local IPC mailbox window.
pub const BUFFER_SIZE: usize = 0x100;

/// Get a (mutable) reference to thread-local IPC buffer
///
/// # Safety
///
/// Do not use it to get two mutable references to the IPC buffer
/// Do not store it's result across IPC calls
#[inline]
pub unsafe fn get_ipc_buffer_mut() -> &'static mut [u8] {
    let buffer_ptr = get_ipc_buffer_ptr();
    core::slice::from_raw_parts_mut(buffer_ptr, BUFFER_SIZE)
}

/// Get a read-only reference to thread-local IPC buffer
///
/// Note that it may be unsafe to do while a slice returned by [get_ipc_buffer_mut] is slill alive
///
/// # Safety
///
/// Do not use it to get two mutable references to the IPC buffer
/// Do not store it's result across IPC calls
#[inline]
pub unsafe fn get_ipc_buffer() -> &'static [u8] {
    // SAFETY: we return a read-only reference, which is safe
    get_ipc_buffer_mut()
}

/// Marker for a `#[repr(packed)]` request/response struct that is safe to
/// `ptr::write`/`ptr::read` straight into/out of the thread-local mailbox:
/// plain-old-data, no padding that matters, size ≤ [`BUFFER_SIZE`].
///
/// # Safety
/// Implementors must guarantee the struct has no invalid bit patterns and
/// fits in the IPC buffer.
pub unsafe trait IpcBufferRepr {}

/// Gets a typed pointer into the thread-local IPC mailbox, for the
/// write-request / read-response dance hand-rolled command bindings use.
///
/// # Safety
/// Same caveats as [get_ipc_buffer_mut]; `T` must satisfy [IpcBufferRepr].
#[inline]
pub unsafe fn get_ipc_buffer_for<T: IpcBufferRepr>() -> *mut T {
    debug_assert!(core::mem::size_of::<T>() <= BUFFER_SIZE);
    get_ipc_buffer_ptr() as *mut T
}

bitflags! {
    pub struct BufferAttr: u32 {
        const IN = 1 << 0;
        const OUT = 1 << 1;
        const HIPC_MAP_ALIAS = 1 << 2;
        const HIPC_POINTER = 1 << 3;
        const FIXED_SIZE = 1 << 4;
        const HIPC_AUTO_SELECT = 1 << 5;
        const HIPC_MAP_TRANSFER_ALLOWS_NON_SECURE = 1 << 6;
        const HIPC_MAP_TRANSFER_ALLOWS_NON_DEVICE = 1 << 7;
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum OutHandleAttr {
    HipcCopy,
    HipcMove,
}

/// A region of caller memory (address, size) used as a send/recv/exch
/// buffer. Carries no ownership; the dispatch engine never retains it past
/// the call that used it.
#[derive(Copy, Clone, Debug)]
pub struct Buffer {
    pub address: usize,
    pub size: usize,
}

impl Buffer {
    pub const fn empty() -> Self {
        Self { address: 0, size: 0 }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            address: data.as_ptr() as usize,
            size: data.len(),
        }
    }

    pub fn from_slice_mut(data: &mut [u8]) -> Self {
        Self {
            address: data.as_mut_ptr() as usize,
            size: data.len(),
        }
    }
}
