//! Utility modules

pub mod error;
pub mod resp;

pub use error::{classify_io_error, CollectorError, ConnectionError, ProtocolError, Result};
pub use resp::{RespDecoder, RespEncoder, RespValue, MAX_BULK_LEN};
