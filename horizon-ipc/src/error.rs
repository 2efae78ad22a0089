//! `IpcError`: the one error type the dispatch engine returns, folding the
//! three failure classes spec'd for a dispatch call (transport/Result,
//! decode, programmer error) into a single enum.

use core::fmt::{Debug, Display, Formatter};
use horizon_error::ErrorCode;

#[derive(Copy, Clone, Debug)]
pub enum IpcError {
    /// A non-zero `Result` came back from the kernel or from an `OutHeader`.
    Result(ErrorCode),
    /// The reply's magic didn't match `SFCO`, or the frame was otherwise
    /// structurally impossible to parse.
    BadMagic { expected: u32, found: u32 },
    /// The caller built an invalid `DispatchRequest` (missing out-type where
    /// one is expected, buffer/attribute mismatch, ...). Never reaches the
    /// kernel.
    InvalidArgument(&'static str),
}

impl From<ErrorCode> for IpcError {
    fn from(code: ErrorCode) -> Self {
        IpcError::Result(code)
    }
}

impl Display for IpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            IpcError::Result(code) => write!(f, "{}", code),
            IpcError::BadMagic { expected, found } => {
                write!(f, "bad magic: expected {:#x}, found {:#x}", expected, found)
            }
            IpcError::InvalidArgument(msg) => write!(f, "invalid dispatch argument: {}", msg),
        }
    }
}

pub type Result<T> = core::result::Result<T, IpcError>;
