//! Diagnostic binary: fetch one status section and show how it parses
//!
//! Usage: dump-info <host> <port> [section]
//!
//! `section` is any INFO section name, or `cluster` for CLUSTER INFO.
//! Prints the nested map, then the flattened `parent_sub` form that metric
//! keys are matched against.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use redis_info_collector::client::{ControlPlaneExt, RawConnection};
use redis_info_collector::info::{derive_fields, StatusMap, StatusValue};

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("Usage: dump-info <host> <port> [section]");
    }

    let host = &args[1];
    let port: u16 = args[2].parse().context("Invalid port")?;
    let section = args.get(3).map(String::as_str).unwrap_or("");

    let mut conn = RawConnection::connect_tcp(
        host,
        port,
        Duration::from_secs(2),
        Duration::from_secs(5),
    )?;

    if let Ok(password) = env::var("REDIS_AUTH") {
        conn.authenticate(&password)?;
    }

    let text = if section.eq_ignore_ascii_case("cluster") {
        conn.cluster_info()?
    } else {
        conn.info(section)?
    };

    let mut map = StatusMap::parse(&text);
    let derived = derive_fields(&mut map);

    println!("=== {} keys ({:?}) ===", map.len(), derived);
    for (key, value) in &map {
        match value {
            StatusValue::Scalar(s) => println!("{:<40} {}", key, s),
            StatusValue::Record(record) => {
                println!("{}", key);
                for (field, v) in record {
                    println!("    {:<36} {}", field, v);
                }
            }
        }
    }

    println!();
    println!("=== Flattened ===");
    for (key, value) in map.flatten() {
        println!("{:<40} {}", key, value);
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
