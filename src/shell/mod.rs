//! Shell Module
//!
//! Line-oriented command interface over a [`Store`].
//!
//! ### Commands
//! - `SET <key> <value...>`  store a key-value pair
//! - `GET <key>`             retrieve a value
//! - `DELETE|DEL <key>`      remove a key
//! - `HAS|EXISTS <key>`      check whether a key exists
//! - `KEYS`                  list all keys
//! - `LEN|COUNT`             number of keys
//! - `COMMIT`                flush pending writes to disk
//! - `VERIFY`                check the log files without changing them
//! - `HELP|?`, `EXIT|QUIT|Q`

mod command;
mod response;

pub use command::Command;
pub use response::{Response, Status};

use crate::store::Store;

/// Help text printed by `HELP`
pub const HELP: &str = "\
Available Commands:

  SET <key> <value>     Store a key-value pair
  GET <key>             Retrieve value for a key
  DELETE <key>          Remove a key
  HAS <key>             Check if key exists
  KEYS                  List all keys
  LEN                   Show number of keys
  COMMIT                Flush all pending writes
  VERIFY                Check the log files for damage
  HELP                  Show this help message
  EXIT                  Exit the shell";

/// Run `command` against `store`
///
/// Store errors become error responses. `Exit` is handled by the caller.
pub fn execute(store: &Store, command: &Command) -> Response {
    match command {
        Command::Set { key, value } => match store.set(key, value) {
            Ok(()) => Response::ok(format!("OK (set '{}' = '{}')", key, value)),
            Err(e) => Response::error(e.to_string()),
        },
        Command::Get { key } => match store.get(key) {
            Some(value) => Response::ok(value),
            None => Response::not_found(format!("Key '{}' not found", key)),
        },
        Command::Delete { key } => {
            if !store.has(key) {
                return Response::not_found(format!("Key '{}' does not exist", key));
            }
            match store.delete(key) {
                Ok(()) => Response::ok(format!("OK (deleted '{}')", key)),
                Err(e) => Response::error(e.to_string()),
            }
        }
        Command::Has { key } => {
            if store.has(key) {
                Response::ok(format!("Key '{}' exists", key))
            } else {
                Response::not_found(format!("Key '{}' does not exist", key))
            }
        }
        Command::Keys => {
            let mut keys = store.keys();
            if keys.is_empty() {
                return Response::not_found("No keys stored");
            }
            keys.sort();
            let mut message = format!("Keys ({} total):", keys.len());
            for (i, key) in keys.iter().enumerate() {
                message.push_str(&format!("\n  {}. {}", i + 1, key));
            }
            Response::ok(message)
        }
        Command::Len => Response::ok(format!("Total keys: {}", store.len())),
        Command::Commit => match store.commit() {
            Ok(()) => Response::ok("OK (all writes flushed to disk)"),
            Err(e) => Response::error(e.to_string()),
        },
        Command::Verify => match store.wal().verify() {
            Ok(report) => match report.corruption {
                Some(corruption) => Response::error(format!(
                    "{} valid records, damaged tail in {} ({}, {} bytes, {} later segments)",
                    report.records_recovered,
                    report
                        .truncated_segment
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                    corruption,
                    report.bytes_truncated,
                    report.segments_discarded
                )),
                None => Response::ok(format!(
                    "OK ({} records in {} segments)",
                    report.records_recovered, report.segments_scanned
                )),
            },
            Err(e) => Response::error(e.to_string()),
        },
        Command::Help => Response::ok(HELP),
        Command::Exit => Response::ok("Goodbye!"),
    }
}
