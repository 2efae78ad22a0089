//! Bit-packed wire structures for the outer HIPC frame: header, special
//! header, and the three descriptor kinds (static, buffer, recv-list).
//!
//! These used to be bindgen output over a C header (see `raw/mod.rs`); the
//! header never shipped, so the layouts are hand-written here from the wire
//! description instead, keeping the same per-field accessor shape bindgen
//! would have produced.

use crate::cmif::CommandType;
use crate::hipc::MapAliasBufferMode;

#[derive(Copy, Clone)]
#[repr(C)]
pub struct HipcHeader {
    word0: u32,
    word1: u32,
}

impl HipcHeader {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        type_: impl Into<u16>,
        num_send_statics: u32,
        num_send_buffers: u32,
        num_recv_buffers: u32,
        num_exch_buffers: u32,
        num_data_words: u32,
        recv_static_mode: u32,
        recv_list_offset: u32,
        has_special_header: bool,
    ) -> Self {
        let type_ = type_.into() as u32;

        debug_assert_eq!(num_send_statics >> 4, 0);
        debug_assert_eq!(num_send_buffers >> 4, 0);
        debug_assert_eq!(num_recv_buffers >> 4, 0);
        debug_assert_eq!(num_exch_buffers >> 4, 0);
        debug_assert_eq!(num_data_words >> 10, 0);
        debug_assert_eq!(recv_static_mode >> 4, 0);
        debug_assert_eq!(recv_list_offset >> 11, 0);

        let word0 = type_
            | (num_send_statics << 16)
            | (num_send_buffers << 20)
            | (num_recv_buffers << 24)
            | (num_exch_buffers << 28);

        let word1 = num_data_words
            | (recv_static_mode << 10)
            | (recv_list_offset << 20)
            | ((has_special_header as u32) << 31);

        Self { word0, word1 }
    }

    pub fn type_(&self) -> u16 {
        (self.word0 & 0xffff) as u16
    }

    pub fn num_send_statics(&self) -> u32 {
        (self.word0 >> 16) & 0xf
    }

    pub fn num_send_buffers(&self) -> u32 {
        (self.word0 >> 20) & 0xf
    }

    pub fn num_recv_buffers(&self) -> u32 {
        (self.word0 >> 24) & 0xf
    }

    pub fn num_exch_buffers(&self) -> u32 {
        (self.word0 >> 28) & 0xf
    }

    pub fn num_data_words(&self) -> u32 {
        self.word1 & 0x3ff
    }

    pub fn recv_static_mode(&self) -> u32 {
        (self.word1 >> 10) & 0xf
    }

    pub fn recv_list_offset(&self) -> u32 {
        (self.word1 >> 20) & 0x7ff
    }

    pub fn has_special_header(&self) -> u32 {
        self.word1 >> 31
    }

    // Convenience accessors used by hand-written dispatch code to sanity
    // check a decoded reply header; these read back the same four counts
    // under the names the CMIF side of the protocol actually cares about.
    pub fn num_in_pointers(&self) -> u32 {
        self.num_send_statics()
    }

    pub fn num_in_map_aliases(&self) -> u32 {
        self.num_send_buffers()
    }

    pub fn num_out_map_aliases(&self) -> u32 {
        self.num_recv_buffers()
    }

    pub fn num_inout_map_aliases(&self) -> u32 {
        self.num_exch_buffers()
    }

    pub fn out_pointer_mode(&self) -> u32 {
        self.recv_static_mode()
    }
}

impl From<CommandType> for u16 {
    fn from(ty: CommandType) -> Self {
        ty as u16
    }
}

#[derive(Copy, Clone)]
#[repr(C)]
pub struct HipcSpecialHeader {
    word0: u32,
}

impl HipcSpecialHeader {
    pub fn new(send_pid: bool, num_copy_handles: u32, num_move_handles: u32) -> Self {
        debug_assert_eq!(num_copy_handles >> 4, 0);
        debug_assert_eq!(num_move_handles >> 4, 0);

        let word0 = (send_pid as u32) | (num_copy_handles << 1) | (num_move_handles << 5);

        Self { word0 }
    }

    pub fn send_pid(&self) -> u32 {
        self.word0 & 1
    }

    pub fn num_copy_handles(&self) -> u32 {
        (self.word0 >> 1) & 0xf
    }

    pub fn num_move_handles(&self) -> u32 {
        (self.word0 >> 5) & 0xf
    }
}

/// Send-static descriptor (the "A descriptor"): describes a pointer-transfer
/// buffer on the sender's side. 8 bytes on the wire.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct StaticDescriptor {
    word0: u32,
    address_low: u32,
}

impl StaticDescriptor {
    pub fn new(index: usize, address: usize, size: usize) -> Self {
        assert_eq!(index >> 6, 0, "Invalid static descriptor index");
        assert_eq!(address >> 42, 0, "Invalid static descriptor address");
        assert_eq!(size >> 16, 0, "Invalid static descriptor size");

        let address_low = address as u32;
        let address_mid = ((address >> 32) & 0b1111) as u32;
        let address_high = ((address >> 36) & 0b111111) as u32;

        let word0 =
            (index as u32) | (address_high << 6) | (address_mid << 12) | ((size as u32) << 16);

        Self { word0, address_low }
    }

    pub fn index(&self) -> u32 {
        self.word0 & 0x3f
    }

    pub fn size(&self) -> u32 {
        self.word0 >> 16
    }

    pub fn address(&self) -> usize {
        let address_high = ((self.word0 >> 6) & 0x3f) as usize;
        let address_mid = ((self.word0 >> 12) & 0xf) as usize;

        (self.address_low as usize) | (address_mid << 32) | (address_high << 36)
    }
}

/// Map-alias descriptor (the "B/X descriptor"): describes a send/recv/exch
/// buffer transferred by memory mapping. 12 bytes on the wire.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct BufferDescriptor {
    size_low: u32,
    address_low: u32,
    word2: u32,
}

impl BufferDescriptor {
    pub fn new(mode: MapAliasBufferMode, address: usize, size: usize) -> Self {
        assert_eq!(address >> 58, 0, "Invalid buffer descriptor address");
        assert_eq!(size >> 36, 0, "Invalid buffer descriptor size");

        let size_low = size as u32;
        let address_low = address as u32;

        let address_mid = ((address >> 32) & 0b1111) as u32;
        let address_high = ((address >> 36) & 0x3fffff) as u32;
        let size_high = ((size >> 32) & 0b1111) as u32;

        let word2 = (mode as u32) | (address_high << 2) | (size_high << 24) | (address_mid << 28);

        Self {
            size_low,
            address_low,
            word2,
        }
    }

    pub fn size(&self) -> usize {
        let size_high = ((self.word2 >> 24) & 0xf) as usize;

        (self.size_low as usize) | (size_high << 32)
    }

    pub fn address(&self) -> usize {
        let address_mid = ((self.word2 >> 28) & 0xf) as usize;
        let address_high = ((self.word2 >> 2) & 0x3fffff) as usize;

        (self.address_low as usize) | (address_mid << 32) | (address_high << 36)
    }

    pub fn mode(&self) -> u32 {
        self.word2 & 0b11
    }
}

/// Recv-list entry (the "C descriptor"): tells the server where it may
/// write an out-pointer reply buffer. 8 bytes on the wire.
#[derive(Copy, Clone)]
#[repr(C)]
pub struct RecvListEntry {
    address_low: u32,
    word1: u32,
}

impl RecvListEntry {
    pub fn new(address: usize, size: usize) -> Self {
        assert_eq!(address >> 48, 0, "Invalid recv-list entry address");
        assert_eq!(size >> 16, 0, "Invalid recv-list entry size");

        let address_low = address as u32;
        let address_high = ((address >> 32) & 0xffff) as u32;

        let word1 = address_high | ((size as u32) << 16);

        Self { address_low, word1 }
    }

    pub fn address(&self) -> usize {
        let address_high = (self.word1 & 0xffff) as usize;

        (self.address_low as usize) | (address_high << 32)
    }

    pub fn size(&self) -> u32 {
        self.word1 >> 16
    }
}
