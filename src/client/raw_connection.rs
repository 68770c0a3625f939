//! Raw TCP connection to a monitored instance
//!
//! One connection is opened per endpoint per collection cycle and carries
//! the AUTH exchange plus every section request, strictly one at a time.

use std::io::{self, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use super::control_plane::ControlPlane;
use crate::utils::{
    classify_io_error, ConnectionError, RespDecoder, RespEncoder, RespValue, Result,
};

/// TCP connection split into buffered reader and writer halves
pub struct RawConnection {
    writer: BufWriter<TcpStream>,
    reader: BufReader<TcpStream>,
    io_timeout_ms: u64,
    encoder: RespEncoder,
}

impl RawConnection {
    /// Create new TCP connection
    ///
    /// `connect_timeout` bounds the TCP handshake; `io_timeout` bounds every
    /// subsequent read and write.
    pub fn connect_tcp(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        io_timeout: Duration,
    ) -> std::result::Result<Self, ConnectionError> {
        let connect_failed = |source: io::Error| ConnectionError::ConnectFailed {
            host: host.to_string(),
            port,
            source,
        };

        // Resolve hostname to socket address
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(connect_failed)?
            .next()
            .ok_or_else(|| {
                connect_failed(io::Error::new(io::ErrorKind::NotFound, "No addresses found"))
            })?;

        let stream = TcpStream::connect_timeout(&addr, connect_timeout).map_err(connect_failed)?;

        stream.set_nodelay(true).ok();
        stream
            .set_read_timeout(Some(io_timeout))
            .map_err(connect_failed)?;
        stream
            .set_write_timeout(Some(io_timeout))
            .map_err(connect_failed)?;

        let writer = BufWriter::with_capacity(4096, stream.try_clone().map_err(connect_failed)?);
        let reader = BufReader::with_capacity(65536, stream);

        Ok(RawConnection {
            writer,
            reader,
            io_timeout_ms: io_timeout.as_millis() as u64,
            encoder: RespEncoder::with_capacity(256),
        })
    }

    fn send(&mut self, args: &[&str]) -> io::Result<()> {
        self.encoder.clear();
        self.encoder.encode_request(args);
        self.writer.write_all(self.encoder.as_bytes())?;
        self.writer.flush()
    }
}

impl ControlPlane for RawConnection {
    fn execute(&mut self, args: &[&str]) -> Result<RespValue> {
        let timeout_ms = self.io_timeout_ms;
        self.send(args)
            .map_err(|e| classify_io_error(e, timeout_ms))?;

        let mut decoder = RespDecoder::new(&mut self.reader);
        decoder.decode().map_err(|e| match e {
            crate::utils::CollectorError::Io(io_err) => classify_io_error(io_err, timeout_ms),
            other => other,
        })
    }
}

impl Drop for RawConnection {
    fn drop(&mut self) {
        let _ = self.writer.get_ref().shutdown(std::net::Shutdown::Both);
    }
}
