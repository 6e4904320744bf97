//! The structured, append-only event log.
//!
//! This is a fixed wire contract, not ordinary application logging: another
//! process reads this file's exact text, so the format is written directly
//! rather than routed through `tracing`. Grounded on `controller.py`/
//! `switch.py`'s `write_to_log` (blank-line separator, wall-clock
//! time-of-day line, then event lines), translated into an idiomatic
//! `std::fs` writer.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;

use crate::codec::RoutingEntry;

/// An append-only sink for one process's event log. Every write is
/// preceded by a blank-line separator and a wall-clock time-of-day line.
/// Interior-mutable so it can be shared behind an `Arc` the same way the
/// rest of a driver's state is.
pub struct EventLog {
    file: Mutex<File>,
}

impl EventLog {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Write a blank separator, a timestamp line, then each event line.
    fn write_event(&self, lines: &[String]) {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        let timestamp = Local::now().time().format("%H:%M:%S%.f").to_string();
        let _ = writeln!(file, "\n{timestamp}");
        for line in lines {
            let _ = writeln!(file, "{line}");
        }
    }

    pub fn register_request(&self, switch_id: i32) {
        self.write_event(&[format!("Register Request {switch_id}")]);
    }

    pub fn register_response(&self, switch_id: i32) {
        self.write_event(&[format!("Register Response {switch_id}")]);
    }

    pub fn register_request_sent(&self) {
        self.write_event(&["Register Request Sent".to_string()]);
    }

    pub fn register_response_received(&self) {
        self.write_event(&["Register Response Received".to_string()]);
    }

    pub fn link_dead(&self, a: i32, b: i32) {
        self.write_event(&[format!("Link Dead {a},{b}")]);
    }

    pub fn switch_dead(&self, switch_id: i32) {
        self.write_event(&[format!("Switch Dead {switch_id}")]);
    }

    pub fn switch_alive(&self, switch_id: i32) {
        self.write_event(&[format!("Switch Alive {switch_id}")]);
    }

    pub fn neighbor_dead(&self, neighbor_id: i32) {
        self.write_event(&[format!("Neighbor Dead {neighbor_id}")]);
    }

    pub fn neighbor_alive(&self, neighbor_id: i32) {
        self.write_event(&[format!("Neighbor Alive {neighbor_id}")]);
    }

    /// Controller-side routing update: `<src>,<dest>:<next_hop>,<distance>`.
    pub fn routing_update_full(&self, routes: &[RoutingEntry]) {
        let mut lines = Vec::with_capacity(routes.len() + 2);
        lines.push("Routing Update".to_string());
        for r in routes {
            lines.push(format!("{},{}:{},{}", r.src, r.dest, r.next_hop, r.distance));
        }
        lines.push("Routing Complete".to_string());
        self.write_event(&lines);
    }

    /// Switch-side routing update: `<src>,<dest>:<next_hop>` (no distance).
    pub fn routing_update_self(&self, routes: &[RoutingEntry]) {
        let mut lines = Vec::with_capacity(routes.len() + 2);
        lines.push("Routing Update".to_string());
        for r in routes {
            lines.push(format!("{},{}:{}", r.src, r.dest, r.next_hop));
        }
        lines.push("Routing Complete".to_string());
        self.write_event(&lines);
    }
}

/// Install a `tracing` subscriber for ordinary operational diagnostics
/// (socket binds, dropped malformed datagrams, thread lifecycle) — distinct
/// from [`EventLog`], which is the fixed protocol log another process reads.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn events_are_blank_line_separated() {
        let dir = std::env::temp_dir().join(format!("routectl-log-test-{}", std::process::id()));
        let log = EventLog::open(&dir).unwrap();
        log.register_request(3);
        log.switch_alive(3);
        drop(log);

        let mut contents = String::new();
        File::open(&dir).unwrap().read_to_string(&mut contents).unwrap();
        let _ = std::fs::remove_file(&dir);

        assert!(contents.contains("Register Request 3"));
        assert!(contents.contains("Switch Alive 3"));
        // Two events => two blank-line separators.
        assert_eq!(contents.matches("\n\n").count(), 2);
    }

    #[test]
    fn routing_update_rows_use_comma_colon_format() {
        let dir = std::env::temp_dir().join(format!("routectl-log-test2-{}", std::process::id()));
        let log = EventLog::open(&dir).unwrap();
        log.routing_update_full(&[RoutingEntry {
            src: 0,
            dest: 3,
            next_hop: -1,
            distance: 9999,
        }]);
        drop(log);

        let mut contents = String::new();
        File::open(&dir).unwrap().read_to_string(&mut contents).unwrap();
        let _ = std::fs::remove_file(&dir);

        assert!(contents.contains("0,3:-1,9999"));
        assert!(contents.contains("Routing Complete"));
    }
}
