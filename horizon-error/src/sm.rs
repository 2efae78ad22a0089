use crate::ErrorCodeModule;

use crate::kernel::back_to_enum;

back_to_enum! {
    #[derive(Debug)]
    #[repr(u32)]
    pub enum SmErrorCode {
        OutOfProcesses = 1,
        AlreadyInitialized = 2,
        NotInitialized = 3,
        AlreadyRegistered = 4,
        OutOfServices = 5,
        InvalidServiceName = 6,
        NotRegistered = 7,
        NotAllowed = 8,
        TooLargeAccessControl = 9,
    }
}

impl ErrorCodeModule for SmErrorCode {
    const MODULE: u32 = 21;

    fn from_desc(desc: u32) -> Self {
        SmErrorCode::try_from(desc).expect("Unknown sm error code")
    }
}
