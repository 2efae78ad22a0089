//! CMIF framing: the inner command layout carried inside a HIPC frame's data
//! words — magic/version/command id/token headers, the domain variant, the
//! request-format planner, and the control/close request builders.

pub mod control;

use crate::buffer::{Buffer, BufferAttr};
use crate::error::{IpcError, Result as IpcResult};
use crate::hipc;
use crate::raw::cmif::{CmifDomainInHeader, CmifDomainOutHeader, CmifInHeader, CmifOutHeader};
use crate::util;
use alloc::vec::Vec;
use core::mem::size_of;
use horizon_svc::RawHandle;

#[repr(u16)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum CommandType {
    Invalid = 0,
    LegacyRequest = 1,
    Close = 2,
    LegacyControl = 3,
    Request = 4,
    Control = 5,
    RequestWithContext = 6,
    ControlWithContext = 7,
}

impl From<CommandType> for u16 {
    fn from(ty: CommandType) -> Self {
        ty as u16
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum DomainRequestType {
    Invalid = 0,
    SendMessage = 1,
    Close = 2,
}

/// Newtype around a session's kernel handle, used by thin per-service
/// bindings that would rather hold a raw handle than a full [`crate::session::Session`].
#[derive(Copy, Clone)]
pub struct SessionHandle(pub RawHandle);

/// Control commands with a fixed id across Horizon OS revisions.
pub mod control_command {
    pub const CONVERT_TO_DOMAIN: u32 = 0;
    pub const CLONE_CURRENT_OBJECT: u32 = 2;
    pub const QUERY_POINTER_BUFFER_SIZE: u32 = 3;
}

/// Derives HIPC section counts from a logical call description, one
/// `process_buffer` call per buffer argument. Mirrors the original's
/// `RequestFormat`.
#[derive(Default)]
pub struct RequestFormat {
    pub object_id: u32,
    pub request_id: u32,
    pub context: u32,
    pub data_size: usize,
    pub server_pointer_size: usize,
    pub num_in_auto_buffers: u32,
    pub num_out_auto_buffers: u32,
    pub num_in_buffers: u32,
    pub num_out_buffers: u32,
    pub num_inout_buffers: u32,
    pub num_in_pointers: u32,
    pub num_out_pointers: u32,
    pub num_out_fixed_pointers: u32,
    pub num_objects: u32,
    pub num_handles: u32,
    pub send_pid: bool,
}

impl RequestFormat {
    pub fn process_buffer(&mut self, attr: BufferAttr) {
        if attr.is_empty() {
            return;
        }

        let is_in = attr.contains(BufferAttr::IN);
        let is_out = attr.contains(BufferAttr::OUT);

        if attr.contains(BufferAttr::HIPC_AUTO_SELECT) {
            if is_in {
                self.num_in_auto_buffers += 1;
            }
            if is_out {
                self.num_out_auto_buffers += 1;
            }
        } else if attr.contains(BufferAttr::HIPC_POINTER) {
            if is_in {
                self.num_in_pointers += 1;
            }
            if is_out {
                if attr.contains(BufferAttr::FIXED_SIZE) {
                    self.num_out_fixed_pointers += 1;
                } else {
                    self.num_out_pointers += 1;
                }
            }
        } else if attr.contains(BufferAttr::HIPC_MAP_ALIAS) {
            if is_in && is_out {
                self.num_inout_buffers += 1;
            } else if is_in {
                self.num_in_buffers += 1;
            } else if is_out {
                self.num_out_buffers += 1;
            }
        }
    }
}

fn buffer_mode(attr: BufferAttr) -> hipc::MapAliasBufferMode {
    if attr.contains(BufferAttr::HIPC_MAP_TRANSFER_ALLOWS_NON_DEVICE) {
        hipc::MapAliasBufferMode::NonDevice
    } else if attr.contains(BufferAttr::HIPC_MAP_TRANSFER_ALLOWS_NON_SECURE) {
        hipc::MapAliasBufferMode::NonSecure
    } else {
        hipc::MapAliasBufferMode::Normal
    }
}

/// Encodes a CMIF request (domain or not) on top of a freshly-started HIPC
/// frame. Construction writes the header(s) and in/domain headers; callers
/// then use the `add_*`/`process_buffer` methods to fill in the rest.
pub struct Request {
    data: usize,
    objects: usize,
    out_pointer_sizes: usize,
    server_pointer_size: usize,
    cur_in_ptr_id: usize,
    send_statics: usize,
    send_buffers: usize,
    recv_buffers: usize,
    exch_buffers: usize,
    recv_list: usize,
    copy_handles: usize,
}

impl Request {
    pub fn new(base: &mut Vec<u8>, fmt: &RequestFormat) -> Self {
        let mut actual_size = 16usize;

        if fmt.object_id != 0 {
            actual_size += size_of::<CmifDomainInHeader>() + fmt.num_objects as usize * 4;
        }

        actual_size += size_of::<CmifInHeader>() + fmt.data_size;
        actual_size = util::align(actual_size, 2, true);

        let out_pointer_size_table_offset = actual_size;
        let out_pointer_size_table_size = fmt.num_out_auto_buffers + fmt.num_out_pointers;

        actual_size += 2 * out_pointer_size_table_size as usize;

        let num_data_words = ((actual_size + 3) / 4) as u32;

        let meta = hipc::Metadata {
            type_: if fmt.context != 0 {
                CommandType::RequestWithContext
            } else {
                CommandType::Request
            }
            .into(),
            num_send_statics: fmt.num_in_auto_buffers + fmt.num_in_pointers,
            num_send_buffers: fmt.num_in_auto_buffers + fmt.num_in_buffers,
            num_recv_buffers: fmt.num_out_auto_buffers + fmt.num_out_buffers,
            num_exch_buffers: fmt.num_inout_buffers,
            num_data_words,
            num_recv_statics: out_pointer_size_table_size + fmt.num_out_fixed_pointers,
            send_pid: fmt.send_pid,
            num_copy_handles: fmt.num_handles,
            num_move_handles: 0,
        };

        let hipc_req = hipc::Request::new(base, &meta);

        let data_words_offset = hipc_req.data_words.expect("a request always has data words");
        let mut data = util::align(data_words_offset, 16, true);
        let mut objects = 0;

        if fmt.object_id != 0 {
            let payload_size = size_of::<CmifInHeader>() + fmt.data_size;

            let domain_hdr = CmifDomainInHeader {
                type_: DomainRequestType::SendMessage as u8,
                num_in_objects: fmt.num_objects as u8,
                data_size: payload_size as u16,
                object_id: fmt.object_id,
                padding: 0,
                token: fmt.context,
            };

            unsafe { util::splice_value(base, data, &domain_hdr) };
            data += size_of::<CmifDomainInHeader>();
            objects = data + payload_size;
        }

        let in_hdr = CmifInHeader {
            magic: CmifInHeader::MAGIC,
            version: if fmt.context != 0 { 1 } else { 0 },
            command_id: fmt.request_id,
            token: if fmt.object_id != 0 { 0 } else { fmt.context },
        };

        unsafe { util::splice_value(base, data, &in_hdr) };
        data += size_of::<CmifInHeader>();

        Self {
            out_pointer_sizes: data_words_offset + out_pointer_size_table_offset,
            server_pointer_size: fmt.server_pointer_size,
            cur_in_ptr_id: 0,
            send_statics: hipc_req.send_statics.unwrap_or(0),
            send_buffers: hipc_req.send_buffers.unwrap_or(0),
            recv_buffers: hipc_req.recv_buffers.unwrap_or(0),
            exch_buffers: hipc_req.exch_buffers.unwrap_or(0),
            recv_list: hipc_req.recv_list.unwrap_or(0),
            copy_handles: hipc_req.copy_handles.unwrap_or(0),
            data,
            objects,
        }
    }

    pub fn data_offset(&self) -> usize {
        self.data
    }

    pub fn add_payload(&mut self, base: &mut Vec<u8>, payload: &[u8]) {
        util::splice(base, self.data, payload);
    }

    pub fn add_object(&mut self, base: &mut Vec<u8>, object_id: u32) {
        util::splice(base, self.objects, &object_id.to_le_bytes());
        self.objects += 4;
    }

    pub fn add_handle(&mut self, base: &mut Vec<u8>, handle: RawHandle) {
        util::splice(base, self.copy_handles, &handle.0.to_le_bytes());
        self.copy_handles += 4;
    }

    fn add_in_buffer(&mut self, base: &mut Vec<u8>, buf: Buffer, mode: hipc::MapAliasBufferMode) {
        use crate::raw::hipc::BufferDescriptor;

        let desc = BufferDescriptor::new(mode, buf.address, buf.size);
        unsafe { util::splice_value(base, self.send_buffers, &desc) };
        self.send_buffers += size_of::<BufferDescriptor>();
    }

    fn add_out_buffer(&mut self, base: &mut Vec<u8>, buf: Buffer, mode: hipc::MapAliasBufferMode) {
        use crate::raw::hipc::BufferDescriptor;

        let desc = BufferDescriptor::new(mode, buf.address, buf.size);
        unsafe { util::splice_value(base, self.recv_buffers, &desc) };
        self.recv_buffers += size_of::<BufferDescriptor>();
    }

    fn add_inout_buffer(&mut self, base: &mut Vec<u8>, buf: Buffer, mode: hipc::MapAliasBufferMode) {
        use crate::raw::hipc::BufferDescriptor;

        let desc = BufferDescriptor::new(mode, buf.address, buf.size);
        unsafe { util::splice_value(base, self.exch_buffers, &desc) };
        self.exch_buffers += size_of::<BufferDescriptor>();
    }

    fn add_in_pointer(&mut self, base: &mut Vec<u8>, buf: Buffer) {
        use crate::raw::hipc::StaticDescriptor;

        let desc = StaticDescriptor::new(self.cur_in_ptr_id, buf.address, buf.size);
        self.cur_in_ptr_id += 1;

        unsafe { util::splice_value(base, self.send_statics, &desc) };
        self.send_statics += size_of::<StaticDescriptor>();

        self.server_pointer_size = self.server_pointer_size.saturating_sub(buf.size);
    }

    fn add_out_fixed_pointer(&mut self, base: &mut Vec<u8>, buf: Buffer) {
        use crate::raw::hipc::RecvListEntry;

        let entry = RecvListEntry::new(buf.address, buf.size);
        unsafe { util::splice_value(base, self.recv_list, &entry) };
        self.recv_list += size_of::<RecvListEntry>();

        self.server_pointer_size = self.server_pointer_size.saturating_sub(buf.size);
    }

    fn add_out_pointer(&mut self, base: &mut Vec<u8>, buf: Buffer) {
        self.add_out_fixed_pointer(base, buf);

        util::splice(base, self.out_pointer_sizes, &(buf.size as u16).to_le_bytes());
        self.out_pointer_sizes += 2;
    }

    fn add_in_auto_buffer(&mut self, base: &mut Vec<u8>, buf: Buffer) {
        if self.server_pointer_size > 0 && buf.size <= self.server_pointer_size {
            self.add_in_pointer(base, buf);
            self.add_in_buffer(base, Buffer::empty(), hipc::MapAliasBufferMode::Normal);
        } else {
            self.add_in_pointer(base, Buffer::empty());
            self.add_in_buffer(base, buf, hipc::MapAliasBufferMode::Normal);
        }
    }

    fn add_out_auto_buffer(&mut self, base: &mut Vec<u8>, buf: Buffer) {
        if self.server_pointer_size > 0 && buf.size <= self.server_pointer_size {
            self.add_out_pointer(base, buf);
            self.add_out_buffer(base, Buffer::empty(), hipc::MapAliasBufferMode::Normal);
        } else {
            self.add_out_pointer(base, Buffer::empty());
            self.add_out_buffer(base, buf, hipc::MapAliasBufferMode::Normal);
        }
    }

    /// Dispatches a `(buffer, attribute)` pair to the right section per the
    /// attribute-driven tallies `RequestFormat::process_buffer` computed.
    pub fn process_buffer(&mut self, base: &mut Vec<u8>, buf: Buffer, attr: BufferAttr) {
        if attr.is_empty() {
            return;
        }

        let is_in = attr.contains(BufferAttr::IN);
        let is_out = attr.contains(BufferAttr::OUT);

        if attr.contains(BufferAttr::HIPC_AUTO_SELECT) {
            if is_in {
                self.add_in_auto_buffer(base, buf);
            }
            if is_out {
                self.add_out_auto_buffer(base, buf);
            }
        } else if attr.contains(BufferAttr::HIPC_POINTER) {
            if is_in {
                self.add_in_pointer(base, buf);
            }
            if is_out {
                if attr.contains(BufferAttr::FIXED_SIZE) {
                    self.add_out_fixed_pointer(base, buf);
                } else {
                    self.add_out_pointer(base, buf);
                }
            }
        } else if attr.contains(BufferAttr::HIPC_MAP_ALIAS) {
            let mode = buffer_mode(attr);

            if is_in && is_out {
                self.add_inout_buffer(base, buf, mode);
            } else if is_in {
                self.add_in_buffer(base, buf, mode);
            } else if is_out {
                self.add_out_buffer(base, buf, mode);
            }
        }
    }
}

/// Decoded view over a CMIF reply.
pub struct Response {
    pub copy_handles: usize,
    pub move_handles: usize,
    pub data: usize,
    objects: Option<usize>,
}

impl Response {
    pub fn new(base: &[u8], is_domain: bool, out_size: usize) -> IpcResult<Self> {
        let h = hipc::Response::new(base);

        let mut data = util::align(h.data_words, 16, true);

        let mut objects = None;
        if is_domain {
            let domain_hdr: CmifDomainOutHeader =
                unsafe { core::ptr::read_unaligned(base[data..].as_ptr() as *const _) };
            data += size_of::<CmifDomainOutHeader>();

            objects = Some(data + size_of::<CmifOutHeader>() + out_size);
            let _ = domain_hdr.num_out_objects;
        }

        let out_hdr: CmifOutHeader = unsafe { core::ptr::read_unaligned(base[data..].as_ptr() as *const _) };

        if out_hdr.magic != CmifOutHeader::MAGIC {
            return Err(IpcError::BadMagic {
                expected: CmifOutHeader::MAGIC,
                found: out_hdr.magic,
            });
        }

        out_hdr.result.into_result(())?;

        data += size_of::<CmifOutHeader>();

        Ok(Self {
            copy_handles: h.copy_handles,
            move_handles: h.move_handles,
            data,
            objects,
        })
    }

    pub fn get_object(&mut self, base: &[u8]) -> u32 {
        let offset = self.objects.expect("response carries no domain objects");
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&base[offset..offset + 4]);
        self.objects = Some(offset + 4);

        u32::from_le_bytes(bytes)
    }

    pub fn get_copy_handle(&mut self, base: &[u8]) -> RawHandle {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&base[self.copy_handles..self.copy_handles + 4]);
        self.copy_handles += 4;

        RawHandle(u32::from_le_bytes(bytes))
    }

    pub fn get_move_handle(&mut self, base: &[u8]) -> RawHandle {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&base[self.move_handles..self.move_handles + 4]);
        self.move_handles += 4;

        RawHandle(u32::from_le_bytes(bytes))
    }
}

/// Builds a bare Control-type request carrying `request_id` and `size` bytes
/// of payload; returns the byte offset the caller should splice its payload
/// into.
pub fn make_control_request(base: &mut Vec<u8>, request_id: u32, size: usize) -> usize {
    let actual_size = 16 + size_of::<CmifInHeader>() + size;

    let meta = hipc::Metadata {
        type_: CommandType::Control.into(),
        num_data_words: ((actual_size + 3) / 4) as u32,
        ..Default::default()
    };

    let hipc_req = hipc::Request::new(base, &meta);
    let data_offset = util::align(hipc_req.data_words.unwrap(), 16, true);

    let hdr = CmifInHeader {
        magic: CmifInHeader::MAGIC,
        version: 0,
        command_id: request_id,
        token: 0,
    };

    unsafe { util::splice_value(base, data_offset, &hdr) };

    data_offset + size_of::<CmifInHeader>()
}

/// Builds the Close frame for either a domain sub-object (`object_id != 0`)
/// or a root/plain session (`object_id == 0`).
pub fn make_close_request(base: &mut Vec<u8>, object_id: u32) {
    if object_id != 0 {
        let meta = hipc::Metadata {
            type_: CommandType::Request.into(),
            num_data_words: ((16 + size_of::<CmifDomainInHeader>() + 3) / 4) as u32,
            ..Default::default()
        };

        let hipc_req = hipc::Request::new(base, &meta);
        let data_offset = util::align(hipc_req.data_words.unwrap(), 16, true);

        let domain_hdr = CmifDomainInHeader {
            type_: DomainRequestType::Close as u8,
            num_in_objects: 0,
            data_size: 0,
            object_id,
            padding: 0,
            token: 0,
        };

        unsafe { util::splice_value(base, data_offset, &domain_hdr) };
    } else {
        let meta = hipc::Metadata {
            type_: CommandType::Close.into(),
            ..Default::default()
        };

        hipc::Request::new(base, &meta);
    }
}

/// Issues control command 3 against `handle` and returns the server's
/// advertised pointer-buffer size. Called once at session birth.
pub fn query_pointer_buffer_size(handle: RawHandle) -> IpcResult<u16> {
    let mut base = Vec::new();
    let data_offset = make_control_request(&mut base, control_command::QUERY_POINTER_BUFFER_SIZE, 4);
    util::splice(&mut base, data_offset, &0u32.to_le_bytes());
    util::extend_to(&mut base, crate::buffer::BUFFER_SIZE);

    let tls = unsafe { crate::buffer::get_ipc_buffer_mut() };
    tls[..base.len()].copy_from_slice(&base);

    unsafe { horizon_svc::send_sync_request(handle) }?;

    let tls = unsafe { crate::buffer::get_ipc_buffer() };
    let resp = Response::new(tls, false, 4)?;

    let mut bytes = [0u8; 2];
    bytes.copy_from_slice(&tls[resp.data..resp.data + 2]);
    Ok(u16::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::cmif::CmifDomainOutHeader;
    use horizon_error::ErrorCode;

    fn write_cmif_out_header(base: &mut Vec<u8>, offset: usize, result: ErrorCode) {
        let hdr = CmifOutHeader {
            magic: CmifOutHeader::MAGIC,
            version: 0,
            result,
            token: 0,
        };
        unsafe { util::splice_value(base, offset, &hdr) };
    }

    #[test]
    fn request_format_tallies_map_alias_by_direction() {
        let mut fmt = RequestFormat::default();
        fmt.process_buffer(BufferAttr::IN | BufferAttr::HIPC_MAP_ALIAS);
        fmt.process_buffer(BufferAttr::OUT | BufferAttr::HIPC_MAP_ALIAS);
        fmt.process_buffer(BufferAttr::IN | BufferAttr::OUT | BufferAttr::HIPC_MAP_ALIAS);

        assert_eq!(fmt.num_in_buffers, 1);
        assert_eq!(fmt.num_out_buffers, 1);
        assert_eq!(fmt.num_inout_buffers, 1);
    }

    #[test]
    fn request_format_tallies_pointers_and_auto_select() {
        let mut fmt = RequestFormat::default();
        fmt.process_buffer(BufferAttr::IN | BufferAttr::HIPC_POINTER);
        fmt.process_buffer(BufferAttr::OUT | BufferAttr::HIPC_POINTER | BufferAttr::FIXED_SIZE);
        fmt.process_buffer(BufferAttr::OUT | BufferAttr::HIPC_POINTER);
        fmt.process_buffer(BufferAttr::IN | BufferAttr::HIPC_AUTO_SELECT);
        fmt.process_buffer(BufferAttr::OUT | BufferAttr::HIPC_AUTO_SELECT);

        assert_eq!(fmt.num_in_pointers, 1);
        assert_eq!(fmt.num_out_fixed_pointers, 1);
        assert_eq!(fmt.num_out_pointers, 1);
        assert_eq!(fmt.num_in_auto_buffers, 1);
        assert_eq!(fmt.num_out_auto_buffers, 1);
    }

    #[test]
    fn request_format_ignores_empty_attr() {
        let mut fmt = RequestFormat::default();
        fmt.process_buffer(BufferAttr::empty());
        assert_eq!(fmt.num_in_buffers, 0);
        assert_eq!(fmt.num_out_buffers, 0);
    }

    #[test]
    fn auto_select_buffer_prefers_pointer_within_server_budget() {
        let fmt = RequestFormat {
            request_id: 1,
            data_size: 0,
            server_pointer_size: 64,
            num_in_auto_buffers: 1,
            ..Default::default()
        };

        let mut base = Vec::new();
        let mut req = Request::new(&mut base, &fmt);
        req.add_payload(&mut base, &[]);

        let some_bytes = [0u8; 32];
        req.process_buffer(&mut base, Buffer::from_slice(&some_bytes), BufferAttr::IN | BufferAttr::HIPC_AUTO_SELECT);

        // the buffer fit under the server's advertised pointer budget, so it
        // should have been sent as a static/in-pointer descriptor, leaving
        // the map-alias send-buffer descriptor pointing at an empty buffer.
        assert_eq!(req.server_pointer_size, 64 - 32);
    }

    #[test]
    fn auto_select_buffer_falls_back_to_map_alias_over_budget() {
        let fmt = RequestFormat {
            request_id: 1,
            data_size: 0,
            server_pointer_size: 8,
            num_in_auto_buffers: 1,
            ..Default::default()
        };

        let mut base = Vec::new();
        let mut req = Request::new(&mut base, &fmt);
        req.add_payload(&mut base, &[]);

        let some_bytes = [0u8; 32];
        req.process_buffer(&mut base, Buffer::from_slice(&some_bytes), BufferAttr::IN | BufferAttr::HIPC_AUTO_SELECT);

        // too big for the server's pointer budget: the pointer descriptor
        // carries an empty buffer and the budget is untouched.
        assert_eq!(req.server_pointer_size, 8);
    }

    #[test]
    fn response_decodes_non_domain_payload() {
        let meta = hipc::Metadata {
            type_: CommandType::Request.into(),
            num_data_words: 4,
            ..Default::default()
        };

        let mut base = Vec::new();
        let hreq = hipc::Request::new(&mut base, &meta);
        let data_offset = hreq.data_words.unwrap();

        write_cmif_out_header(&mut base, data_offset, ErrorCode::new(0));
        util::splice(&mut base, data_offset + size_of::<CmifOutHeader>(), &0xdead_beefu32.to_le_bytes());
        util::extend_to(&mut base, crate::buffer::BUFFER_SIZE);

        let resp = Response::new(&base, false, 4).unwrap();

        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&base[resp.data..resp.data + 4]);
        assert_eq!(u32::from_le_bytes(bytes), 0xdead_beef);
    }

    #[test]
    fn response_rejects_bad_magic() {
        let meta = hipc::Metadata {
            type_: CommandType::Request.into(),
            num_data_words: 4,
            ..Default::default()
        };

        let mut base = Vec::new();
        let hreq = hipc::Request::new(&mut base, &meta);
        let data_offset = hreq.data_words.unwrap();

        let hdr = CmifOutHeader {
            magic: 0,
            version: 0,
            result: ErrorCode::new(0),
            token: 0,
        };
        unsafe { util::splice_value(&mut base, data_offset, &hdr) };
        util::extend_to(&mut base, crate::buffer::BUFFER_SIZE);

        let err = Response::new(&base, false, 0).unwrap_err();
        assert!(matches!(err, IpcError::BadMagic { .. }));
    }

    #[test]
    fn response_propagates_failure_result() {
        let meta = hipc::Metadata {
            type_: CommandType::Request.into(),
            num_data_words: 4,
            ..Default::default()
        };

        let mut base = Vec::new();
        let hreq = hipc::Request::new(&mut base, &meta);
        let data_offset = hreq.data_words.unwrap();

        write_cmif_out_header(&mut base, data_offset, ErrorCode::from_parts(21, 2));
        util::extend_to(&mut base, crate::buffer::BUFFER_SIZE);

        let err = Response::new(&base, false, 0).unwrap_err();
        match err {
            IpcError::Result(code) => assert_eq!(code, 0x415u32),
            _ => panic!("expected a Result error"),
        }
    }

    #[test]
    fn response_decodes_domain_object_id() {
        let meta = hipc::Metadata {
            type_: CommandType::Request.into(),
            num_data_words: 8,
            ..Default::default()
        };

        let mut base = Vec::new();
        let hreq = hipc::Request::new(&mut base, &meta);
        let mut offset = hreq.data_words.unwrap();

        let domain_hdr = CmifDomainOutHeader {
            num_out_objects: 1,
            padding: [0; 3],
        };
        unsafe { util::splice_value(&mut base, offset, &domain_hdr) };
        offset += size_of::<CmifDomainOutHeader>();

        write_cmif_out_header(&mut base, offset, ErrorCode::new(0));
        offset += size_of::<CmifOutHeader>();

        util::splice(&mut base, offset, &7u32.to_le_bytes());
        util::extend_to(&mut base, crate::buffer::BUFFER_SIZE);

        let mut resp = Response::new(&base, true, 0).unwrap();
        assert_eq!(resp.get_object(&base), 7);
    }

    #[test]
    fn make_close_request_root_uses_bare_close_type() {
        let mut base = Vec::new();
        make_close_request(&mut base, 0);

        let header: crate::raw::hipc::HipcHeader =
            unsafe { core::ptr::read_unaligned(base.as_ptr() as *const _) };
        assert_eq!(header.type_(), CommandType::Close as u16);
    }

    #[test]
    fn make_close_request_sub_object_carries_domain_header() {
        let mut base = Vec::new();
        make_close_request(&mut base, 5);

        let header: crate::raw::hipc::HipcHeader =
            unsafe { core::ptr::read_unaligned(base.as_ptr() as *const _) };
        assert_eq!(header.type_(), CommandType::Request as u16);

        let data_offset = util::align(size_of::<crate::raw::hipc::HipcHeader>(), 16, true);
        let domain_hdr: CmifDomainInHeader =
            unsafe { core::ptr::read_unaligned(base[data_offset..].as_ptr() as *const _) };
        assert_eq!(domain_hdr.type_, DomainRequestType::Close as u8);
        assert_eq!(domain_hdr.object_id, 5);
    }
}
