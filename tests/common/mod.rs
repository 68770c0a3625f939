//! Shared test utilities for collector integration tests.
//!
//! Import via `mod common;` in integration test files:
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use redis_info_collector::config::EndpointConfig;

// ============================================================================
// Fixtures
// ============================================================================

/// INFO payload of a primary with two replicas and two databases
#[allow(dead_code)]
pub const PRIMARY_INFO: &str = "# Server\r\n\
redis_version:7.2.4\r\n\
uptime_in_seconds:86400\r\n\
\r\n\
# Clients\r\n\
connected_clients:12\r\n\
blocked_clients:0\r\n\
\r\n\
# Memory\r\n\
used_memory:1048576\r\n\
used_memory_human:1.00M\r\n\
\r\n\
# Persistence\r\n\
rdb_changes_since_last_save:42\r\n\
\r\n\
# Stats\r\n\
total_connections_received:1500\r\n\
total_commands_processed:987654\r\n\
evicted_keys:3\r\n\
\r\n\
# Replication\r\n\
role:master\r\n\
connected_slaves:2\r\n\
slave0:ip=10.0.0.2,port=6379,state=online,offset=1000,lag=0\r\n\
slave1:ip=10.0.0.3,port=6379,state=online,offset=900,lag=1\r\n\
master_repl_offset:1050\r\n\
repl_backlog_active:1\r\n\
repl_backlog_size:1048576\r\n\
\r\n\
# Keyspace\r\n\
db0:keys=10,expires=0,avg_ttl=0\r\n\
db3:keys=7,expires=1,avg_ttl=100\r\n";

/// Type instances the default selection yields for [`PRIMARY_INFO`]
#[allow(dead_code)]
pub const PRIMARY_METRICS: &[&str] = &[
    "uptime_in_seconds",
    "connected_clients",
    "connected_slaves",
    "blocked_clients",
    "evicted_keys",
    "used_memory",
    "changes_since_last_save",
    "connections_received",
    "commands_processed",
    "master_repl_offset",
    "repl_backlog_active",
    "repl_backlog_size",
    "db0-keys",
    "db3-keys",
    "slave0-delay",
    "slave1-delay",
];

#[allow(dead_code)]
pub const COMMANDSTATS_INFO: &str = "# Commandstats\r\n\
cmdstat_get:calls=120,usec=240,usec_per_call=2.00\r\n\
cmdstat_set:calls=80,usec=400,usec_per_call=5.00\r\n";

// ============================================================================
// Reply builders
// ============================================================================

#[allow(dead_code)]
pub fn bulk(text: &str) -> Vec<u8> {
    let mut out = format!("${}\r\n", text.len()).into_bytes();
    out.extend_from_slice(text.as_bytes());
    out.extend_from_slice(b"\r\n");
    out
}

#[allow(dead_code)]
pub fn error(message: &str) -> Vec<u8> {
    format!("-{}\r\n", message).into_bytes()
}

#[allow(dead_code)]
pub fn ok() -> Vec<u8> {
    b"+OK\r\n".to_vec()
}

// ============================================================================
// Fake server
// ============================================================================

/// Scripted server on a random local port.
///
/// Every request is recorded and answered with whatever the handler
/// returns. An empty reply closes the connection.
pub struct FakeServer {
    pub port: u16,
    received: Arc<Mutex<Vec<String>>>,
}

impl FakeServer {
    pub fn start<F>(handler: F) -> Self
    where
        F: Fn(&[String]) -> Vec<u8> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("should bind to random port");
        let port = listener.local_addr().expect("should have local addr").port();
        let received = Arc::new(Mutex::new(Vec::new()));

        let log = Arc::clone(&received);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let _ = serve(stream, &handler, &log);
            }
        });

        Self { port, received }
    }

    /// Server answering the collector's commands with the given sections
    #[allow(dead_code)]
    pub fn with_sections(info: &'static str, commandstats: Option<&'static str>) -> Self {
        Self::start(move |args| match args_str(args).as_slice() {
            ["INFO"] => bulk(info),
            ["INFO", "commandstats"] => match commandstats {
                Some(text) => bulk(text),
                None => error("ERR unknown section"),
            },
            ["CLUSTER", "INFO"] => error("ERR This instance has cluster support disabled"),
            _ => error("ERR unknown command"),
        })
    }

    /// Requests received so far, arguments joined by spaces
    #[allow(dead_code)]
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    #[allow(dead_code)]
    pub fn endpoint(&self) -> EndpointConfig {
        let mut endpoint = EndpointConfig::new("127.0.0.1", self.port);
        endpoint.connect_timeout_ms = 500;
        endpoint.read_timeout_ms = 2000;
        endpoint
    }
}

#[allow(dead_code)]
pub fn args_str(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

/// Port with nothing listening on it
#[allow(dead_code)]
pub fn refused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("should bind to random port");
    listener.local_addr().expect("should have local addr").port()
}

fn serve<F>(stream: TcpStream, handler: &F, log: &Mutex<Vec<String>>) -> io::Result<()>
where
    F: Fn(&[String]) -> Vec<u8>,
{
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);

    while let Some(args) = read_request(&mut reader)? {
        log.lock().push(args.join(" "));
        let reply = handler(&args);
        if reply.is_empty() {
            return Ok(());
        }
        writer.write_all(&reply)?;
        writer.flush()?;
    }
    Ok(())
}

/// Read one inline or multibulk request; `None` on EOF
fn read_request<R: BufRead>(reader: &mut R) -> io::Result<Option<Vec<String>>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let line = line.trim_end();

    let Some(count) = line.strip_prefix('*') else {
        return Ok(Some(line.split_whitespace().map(str::to_string).collect()));
    };

    let count: usize = count.parse().map_err(invalid)?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let mut header = String::new();
        reader.read_line(&mut header)?;
        let len: usize = header
            .trim_end()
            .strip_prefix('$')
            .ok_or_else(|| invalid("expected bulk header"))?
            .parse()
            .map_err(invalid)?;
        let mut data = vec![0u8; len + 2];
        reader.read_exact(&mut data)?;
        data.truncate(len);
        args.push(String::from_utf8_lossy(&data).into_owned());
    }
    Ok(Some(args))
}

fn invalid<E: ToString>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

// ============================================================================
// Output capture
// ============================================================================

/// `Write` handle whose bytes can be read back after the writer is moved
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
