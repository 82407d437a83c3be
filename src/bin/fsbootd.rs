// CLASSIFICATION: COMMUNITY
// Filename: fsbootd.rs v0.2
// Author: Lukas Bower
// Date Modified: 2027-08-19

//! fsbootd: Unix-socket daemon serving the boot-config control surface.
//!
//! Line protocol, one request per line, one reply per line:
//!
//! ```text
//! read <path>            -> ok <value>        | err <message>
//! write <path> <value>   -> ok                | err <message>
//! ls <path>              -> ok <name> ...     | err <message>
//! ```
//!
//! Connections are handled one at a time; the surface itself serializes all
//! context access, and the boot-time caller is assumed to have finished long
//! before this daemon starts.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::{UnixListener, UnixStream};

use env_logger::Env;
use log::{info, warn};

use fsboot::config;
use fsboot::context::FsbContext;
use fsboot::flash::FileFlash;
use fsboot::surface::ControlSurface;

fn handle_stream(surface: &ControlSurface<FileFlash>, stream: UnixStream) -> std::io::Result<()> {
    let mut writer = stream.try_clone()?;
    let reader = BufReader::new(stream);
    for line in reader.lines() {
        let line = line?;
        let reply = dispatch(surface, line.trim());
        writer.write_all(reply.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

fn dispatch(surface: &ControlSurface<FileFlash>, line: &str) -> String {
    let mut parts = line.splitn(3, ' ');
    let verb = parts.next().unwrap_or("");
    let path = parts.next();
    let value = parts.next();
    let outcome = match (verb, path, value) {
        ("read", Some(path), None) => surface.read(path).map(|value| format!("ok {value}")),
        ("write", Some(path), Some(value)) => surface.write(path, value).map(|()| "ok".to_string()),
        ("ls", path, None) => surface
            .list(path.unwrap_or(""))
            .map(|names| format!("ok {}", names.join(" "))),
        _ => return format!("err unknown request {line:?}"),
    };
    outcome.unwrap_or_else(|e| format!("err {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsboot::flash::FileFlash;
    use fsboot::store::DualPartitionStore;
    use fsboot::wire::RECORD_LEN;

    fn surface() -> (tempfile::TempDir, ControlSurface<FileFlash>) {
        let dir = tempfile::tempdir().unwrap();
        let size = (8 * RECORD_LEN) as u64;
        let primary =
            FileFlash::open("bootconfig-a", &dir.path().join("bootconfig-a.img"), size).unwrap();
        let secondary =
            FileFlash::open("bootconfig-b", &dir.path().join("bootconfig-b.img"), size).unwrap();
        let ctx = FsbContext::load(DualPartitionStore::new(primary, secondary));
        (dir, ControlSurface::new(ctx))
    }

    #[test]
    fn protocol_round_trips() {
        let (_dir, surface) = surface();
        assert_eq!(dispatch(&surface, "read chosen"), "ok os-a");
        assert_eq!(dispatch(&surface, "write os-b/priority 9"), "ok");
        assert_eq!(dispatch(&surface, "read os-b/priority"), "ok 9");
        assert_eq!(dispatch(&surface, "write commit 1"), "ok");
        assert_eq!(
            dispatch(&surface, "ls"),
            "ok os-a os-b recovery chosen commit"
        );
    }

    #[test]
    fn malformed_requests_yield_errors() {
        let (_dir, surface) = surface();
        assert!(dispatch(&surface, "read").starts_with("err"));
        assert!(dispatch(&surface, "write commit 2").starts_with("err"));
        assert!(dispatch(&surface, "poke os-a/priority").starts_with("err"));
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::load_active();
    let store = fsboot::open_store(&config.partitions)?;
    let ctx = FsbContext::load(store);
    info!("active bootconfig chosen slot: {}", ctx.active().chosen);
    let surface = ControlSurface::new(ctx);

    let socket = &config.surface.socket;
    if socket.exists() {
        std::fs::remove_file(socket)?;
    }
    let listener = UnixListener::bind(socket)?;
    info!("fsbootd listening on {}", socket.display());

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(e) = handle_stream(&surface, stream) {
                    warn!("connection error: {e}");
                }
            }
            Err(e) => warn!("accept error: {e}"),
        }
    }
    Ok(())
}
