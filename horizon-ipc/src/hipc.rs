//! HIPC framing: the outer message layout shared by every command, domain
//! or not. Builds on the bit-packed wire structures in `raw::hipc`.

use crate::raw::hipc::{BufferDescriptor, HipcHeader, HipcSpecialHeader, RecvListEntry, StaticDescriptor};
use crate::util;
use alloc::vec::Vec;
use core::mem::size_of;

/// Determines what MemoryState to use with the mapped memory in the sysmodule.
/// Used to enforce whether or not device mapping is allowed for src and dst buffers respectively.
#[repr(u32)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum MapAliasBufferMode {
    /// Device mapping *not* allowed for src or dst.
    Normal = 0,
    /// Device mapping allowed for src and dst.
    NonSecure = 1,
    /// This buffer mode is invalid
    Invalid = 2,
    // Device mapping allowed for src but not for dst.
    NonDevice = 3,
}

pub const AUTO_RECV_STATIC: u32 = 0xff;

/// Everything the HIPC frame encoder needs to know; mirrors CMIF's
/// `RequestFormat` output one level down.
#[derive(Copy, Clone, Default)]
pub struct Metadata {
    pub type_: u16,
    pub num_send_statics: u32,
    pub num_send_buffers: u32,
    pub num_recv_buffers: u32,
    pub num_exch_buffers: u32,
    pub num_data_words: u32,
    pub num_recv_statics: u32,
    pub send_pid: bool,
    pub num_copy_handles: u32,
    pub num_move_handles: u32,
}

/// Byte offsets of each section of an encoded frame, valid once `Request`
/// has finished writing the header(s).
pub struct Request {
    pub copy_handles: Option<usize>,
    pub move_handles: Option<usize>,
    pub send_statics: Option<usize>,
    pub send_buffers: Option<usize>,
    pub recv_buffers: Option<usize>,
    pub exch_buffers: Option<usize>,
    pub data_words: Option<usize>,
    pub recv_list: Option<usize>,
}

fn recv_static_mode(num_recv_statics: u32) -> u32 {
    if num_recv_statics == 0 {
        0
    } else if num_recv_statics == AUTO_RECV_STATIC {
        2
    } else {
        2 + num_recv_statics
    }
}

impl Request {
    /// Writes the header (and special header/PID slot if needed) at the
    /// front of `base`, then reserves section offsets in declaration order.
    pub fn new(base: &mut Vec<u8>, meta: &Metadata) -> Self {
        let has_special_header =
            meta.send_pid || meta.num_copy_handles > 0 || meta.num_move_handles > 0;

        let header = HipcHeader::new(
            meta.type_,
            meta.num_send_statics,
            meta.num_send_buffers,
            meta.num_recv_buffers,
            meta.num_exch_buffers,
            meta.num_data_words,
            recv_static_mode(meta.num_recv_statics),
            0,
            has_special_header,
        );

        debug_assert_eq!(base.len(), 0);
        unsafe { util::splice_value(base, 0, &header) };

        let mut offset = size_of::<HipcHeader>();

        if has_special_header {
            let special = HipcSpecialHeader::new(
                meta.send_pid,
                meta.num_copy_handles,
                meta.num_move_handles,
            );

            unsafe { util::splice_value(base, offset, &special) };
            offset += size_of::<HipcSpecialHeader>();

            if meta.send_pid {
                util::splice(base, offset, &[0u8; 8]);
                offset += 8;
            }
        }

        let mut take = |count: u32, size: usize| -> Option<usize> {
            if count == 0 {
                return None;
            }

            let here = offset;
            offset += size * count as usize;
            Some(here)
        };

        let copy_handles = take(meta.num_copy_handles, 4);
        let move_handles = take(meta.num_move_handles, 4);
        let send_statics = take(meta.num_send_statics, size_of::<StaticDescriptor>());
        let send_buffers = take(meta.num_send_buffers, size_of::<BufferDescriptor>());
        let recv_buffers = take(meta.num_recv_buffers, size_of::<BufferDescriptor>());
        let exch_buffers = take(meta.num_exch_buffers, size_of::<BufferDescriptor>());
        let data_words = take(meta.num_data_words, 4);
        let recv_list = take(meta.num_recv_statics, size_of::<RecvListEntry>());

        Self {
            copy_handles,
            move_handles,
            send_statics,
            send_buffers,
            recv_buffers,
            exch_buffers,
            data_words,
            recv_list,
        }
    }
}

/// Decoded view over an HIPC reply. Offsets are absolute into the buffer
/// that was passed to `Response::new`.
pub struct Response {
    pub num_send_statics: u32,
    pub num_data_words: u32,
    pub num_copy_handles: u32,
    pub num_move_handles: u32,
    pub pid: u64,
    pub copy_handles: usize,
    pub move_handles: usize,
    pub data_words: usize,
}

impl Response {
    pub fn new(base: &[u8]) -> Self {
        let header: HipcHeader = unsafe { core::ptr::read_unaligned(base.as_ptr() as *const _) };
        let mut offset = size_of::<HipcHeader>();

        let mut num_copy_handles = 0;
        let mut num_move_handles = 0;
        let mut pid = 0xffff_ffff_ffff_ffffu64;

        if header.has_special_header() != 0 {
            let special: HipcSpecialHeader =
                unsafe { core::ptr::read_unaligned(base[offset..].as_ptr() as *const _) };
            offset += size_of::<HipcSpecialHeader>();

            num_copy_handles = special.num_copy_handles();
            num_move_handles = special.num_move_handles();

            if special.send_pid() != 0 {
                let mut pid_bytes = [0u8; 8];
                pid_bytes.copy_from_slice(&base[offset..offset + 8]);
                pid = u64::from_le_bytes(pid_bytes);
                offset += 8;
            }
        }

        let copy_handles = offset;
        offset += 4 * num_copy_handles as usize;

        let move_handles = offset;
        offset += 4 * num_move_handles as usize;

        let data_words = offset;

        Self {
            num_send_statics: header.num_send_statics(),
            num_data_words: header.num_data_words(),
            num_copy_handles,
            num_move_handles,
            pid,
            copy_handles,
            move_handles,
            data_words,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_preserves_counts() {
        let meta = Metadata {
            type_: 4,
            num_send_statics: 0,
            num_send_buffers: 0,
            num_recv_buffers: 0,
            num_exch_buffers: 0,
            num_data_words: 5,
            num_recv_statics: 0,
            send_pid: false,
            num_copy_handles: 0,
            num_move_handles: 0,
        };

        let mut base = Vec::new();
        Request::new(&mut base, &meta);
        util::extend_to(&mut base, 0x100);

        let resp = Response::new(&base);
        assert_eq!(resp.num_data_words, 5);
        assert_eq!(resp.num_send_statics, 0);
    }

    #[test]
    fn recv_static_mode_encoding() {
        assert_eq!(recv_static_mode(0), 0);
        assert_eq!(recv_static_mode(AUTO_RECV_STATIC), 2);
        assert_eq!(recv_static_mode(3), 5);
    }

    #[test]
    fn special_header_set_iff_send_pid_or_handles() {
        let meta = Metadata {
            type_: 4,
            num_copy_handles: 1,
            num_data_words: 10,
            ..Default::default()
        };

        let mut base = Vec::new();
        Request::new(&mut base, &meta);

        let header: HipcHeader = unsafe { core::ptr::read_unaligned(base.as_ptr() as *const _) };
        assert_eq!(header.has_special_header(), 1);
    }
}
