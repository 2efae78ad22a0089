use horizon_error::ErrorCode;

#[repr(C)]
pub struct CmifInHeader {
    pub magic: u32,
    pub version: u32,
    pub command_id: u32,
    pub token: u32,
}

impl CmifInHeader {
    /// `SFCI`, little-endian.
    pub const MAGIC: u32 = 0x49434653;
}

#[repr(C)]
pub struct CmifOutHeader {
    pub magic: u32,
    pub version: u32,
    pub result: ErrorCode,
    pub token: u32,
}

impl CmifOutHeader {
    /// `SFCO`, little-endian.
    pub const MAGIC: u32 = 0x4f434653;
}

#[repr(C)]
pub struct CmifDomainInHeader {
    pub type_: u8,
    pub num_in_objects: u8,
    pub data_size: u16,
    pub object_id: u32,
    pub padding: u32,
    pub token: u32,
}

impl CmifDomainInHeader {
    pub const TYPE_SEND_MESSAGE: u8 = 1;
    pub const TYPE_CLOSE: u8 = 2;
}

#[repr(C)]
pub struct CmifDomainOutHeader {
    pub num_out_objects: u32,
    pub padding: [u32; 3],
}
