//! Request encoding and reply framing for the Redis wire protocol
//!
//! Requests go out as inline command lines where possible. Replies are
//! decoded one frame at a time: simple strings, errors, integers and bulk
//! strings, which covers everything the introspection commands return.

use std::io::BufRead;

use super::error::{CollectorError, ProtocolError};

/// Largest bulk payload accepted. INFO output is a few tens of KiB; anything
/// this size means the length header is garbage.
pub const MAX_BULK_LEN: usize = 64 * 1024 * 1024;

/// Decoded reply frame
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple string (+OK\r\n)
    SimpleString(String),
    /// Error (-ERR message\r\n)
    Error(String),
    /// Integer (:1000\r\n)
    Integer(i64),
    /// Bulk string ($6\r\nfoobar)
    BulkString(Vec<u8>),
    /// Null bulk string ($-1\r\n)
    Null,
}

impl RespValue {
    /// Short description used in error messages
    pub fn describe(&self) -> String {
        match self {
            RespValue::SimpleString(s) => format!("+{}", s),
            RespValue::Error(e) => format!("-{}", e),
            RespValue::Integer(i) => format!(":{}", i),
            RespValue::BulkString(b) => format!("bulk string of {} bytes", b.len()),
            RespValue::Null => "null".to_string(),
        }
    }
}

/// Request encoder with pre-allocated buffer
pub struct RespEncoder {
    buf: Vec<u8>,
}

impl RespEncoder {
    /// Create new encoder with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Clear buffer for reuse
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Get encoded bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Encode a command as a multi-bulk array
    pub fn encode_command(&mut self, args: &[&[u8]]) {
        // Array header: *<count>\r\n
        self.buf.push(b'*');
        self.write_int(args.len() as i64);
        self.buf.extend_from_slice(b"\r\n");

        // Each argument as bulk string: $<len>\r\n<data>\r\n
        for arg in args {
            self.buf.push(b'$');
            self.write_int(arg.len() as i64);
            self.buf.extend_from_slice(b"\r\n");
            self.buf.extend_from_slice(arg);
            self.buf.extend_from_slice(b"\r\n");
        }
    }

    /// Encode inline command (space-separated, CRLF terminated)
    pub fn encode_inline(&mut self, args: &[&str]) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.buf.push(b' ');
            }
            self.buf.extend_from_slice(arg.as_bytes());
        }
        self.buf.extend_from_slice(b"\r\n");
    }

    /// Encode a request, inline unless an argument would be split or
    /// dropped by the server's inline tokenizer.
    pub fn encode_request(&mut self, args: &[&str]) {
        if args.iter().all(|a| is_inline_safe(a)) {
            self.encode_inline(args);
        } else {
            let byte_args: Vec<&[u8]> = args.iter().map(|s| s.as_bytes()).collect();
            self.encode_command(&byte_args);
        }
    }

    #[inline]
    fn write_int(&mut self, value: i64) {
        let mut buffer = itoa::Buffer::new();
        let s = buffer.format(value);
        self.buf.extend_from_slice(s.as_bytes());
    }
}

fn is_inline_safe(arg: &str) -> bool {
    !arg.is_empty()
        && !arg
            .bytes()
            .any(|b| b.is_ascii_whitespace() || b == b'"' || b == b'\'')
}

/// Reply decoder for streaming reads
pub struct RespDecoder<R> {
    reader: R,
    line_buf: Vec<u8>,
}

impl<R: BufRead> RespDecoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buf: Vec::with_capacity(256),
        }
    }

    /// Read the next status line, without its terminator.
    ///
    /// Bare empty lines are skipped: a bulk payload is read by length only,
    /// so its trailing CRLF shows up here in front of the next frame.
    fn read_status_line(&mut self) -> Result<String, CollectorError> {
        loop {
            self.line_buf.clear();
            let n = self.reader.read_until(b'\n', &mut self.line_buf)?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Connection closed",
                )
                .into());
            }

            let mut end = self.line_buf.len();
            while end > 0 && matches!(self.line_buf[end - 1], b'\r' | b'\n') {
                end -= 1;
            }
            if end == 0 {
                continue;
            }

            return Ok(String::from_utf8_lossy(&self.line_buf[..end]).into_owned());
        }
    }

    /// Decode next reply from stream
    pub fn decode(&mut self) -> Result<RespValue, CollectorError> {
        let line = self.read_status_line()?;

        let type_byte = line.as_bytes()[0];
        let content = line.get(1..).unwrap_or("");

        match type_byte {
            b'+' => Ok(RespValue::SimpleString(content.to_string())),
            b'-' => Ok(RespValue::Error(content.to_string())),
            b':' => {
                let value: i64 = content
                    .parse()
                    .map_err(|_| ProtocolError::Parse(format!("Invalid integer: {}", content)))?;
                Ok(RespValue::Integer(value))
            }
            b'$' => {
                let len: i64 = content
                    .parse()
                    .map_err(|_| ProtocolError::InvalidLength(content.to_string()))?;

                if len == -1 {
                    return Ok(RespValue::Null);
                }
                if len < 0 || len as u64 > MAX_BULK_LEN as u64 {
                    return Err(ProtocolError::InvalidLength(content.to_string()).into());
                }

                let mut data = vec![0u8; len as usize];
                self.reader.read_exact(&mut data)?;

                Ok(RespValue::BulkString(data))
            }
            other => Err(ProtocolError::InvalidType(other).into()),
        }
    }
}
