//! Control plane trait for instance communication
//!
//! Abstracts the request/reply exchange so the section fetcher can run
//! against a live `RawConnection` or a scripted stand-in.

use crate::utils::{ConnectionError, ProtocolError, RespValue, Result};

/// Control plane operations trait
///
/// One call sends one request and reads exactly one reply frame.
pub trait ControlPlane {
    /// Execute a command with string arguments
    ///
    /// # Example
    /// ```ignore
    /// let response = conn.execute(&["INFO"])?;
    /// let response = conn.execute(&["INFO", "commandstats"])?;
    /// ```
    fn execute(&mut self, args: &[&str]) -> Result<RespValue>;
}

/// Extension trait with the introspection commands the collector issues
pub trait ControlPlaneExt: ControlPlane {
    /// Send AUTH and require a `+OK` reply
    fn authenticate(&mut self, password: &str) -> Result<()> {
        match self.execute(&["AUTH", password])? {
            RespValue::SimpleString(s) if s.starts_with("OK") => Ok(()),
            // -ERR invalid password
            // -ERR Client sent AUTH, but no password is set
            other => Err(ConnectionError::AuthFailed(other.describe()).into()),
        }
    }

    /// Execute a command whose reply must be a bulk string
    fn fetch_bulk(&mut self, args: &[&str]) -> Result<String> {
        match self.execute(args)? {
            RespValue::BulkString(data) => Ok(String::from_utf8_lossy(&data).into_owned()),
            RespValue::Error(e) => Err(ProtocolError::ServerError(e).into()),
            other => Err(ProtocolError::UnexpectedResponse {
                expected: format!("bulk reply to {}", args.join(" ")),
                actual: other.describe(),
            }
            .into()),
        }
    }

    /// Get INFO text for a section (empty string for the default sections)
    fn info(&mut self, section: &str) -> Result<String> {
        if section.is_empty() {
            self.fetch_bulk(&["INFO"])
        } else {
            self.fetch_bulk(&["INFO", section])
        }
    }

    /// Get CLUSTER INFO text
    fn cluster_info(&mut self) -> Result<String> {
        self.fetch_bulk(&["CLUSTER", "INFO"])
    }
}

// Blanket implementation: any ControlPlane automatically gets ControlPlaneExt
impl<T: ControlPlane> ControlPlaneExt for T {}
