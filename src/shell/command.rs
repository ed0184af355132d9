//! Command definitions
//!
//! Represents one line typed into the shell.

use crate::error::{DriftError, Result};

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a key-value pair
    Set { key: String, value: String },

    /// Get a value by key
    Get { key: String },

    /// Delete a key
    Delete { key: String },

    /// Check whether a key exists
    Has { key: String },

    /// List all keys
    Keys,

    /// Count keys
    Len,

    /// Flush pending writes
    Commit,

    /// Check the on-disk log without modifying it
    Verify,

    Help,

    Exit,
}

impl Command {
    /// Parse a line; blank lines yield `None`
    ///
    /// Command names are case-insensitive. `SET` takes every remaining word,
    /// joined by single spaces, as the value.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let mut parts = line.split_whitespace();
        let name = match parts.next() {
            Some(name) => name.to_ascii_uppercase(),
            None => return Ok(None),
        };
        let args: Vec<&str> = parts.collect();

        let command = match name.as_str() {
            "SET" => {
                if args.len() < 2 {
                    return Err(usage("SET <key> <value>"));
                }
                Command::Set {
                    key: args[0].to_string(),
                    value: args[1..].join(" "),
                }
            }
            "GET" => Command::Get {
                key: single_key(&args, "GET <key>")?,
            },
            "DELETE" | "DEL" => Command::Delete {
                key: single_key(&args, "DELETE <key>")?,
            },
            "HAS" | "EXISTS" => Command::Has {
                key: single_key(&args, "HAS <key>")?,
            },
            "KEYS" => Command::Keys,
            "LEN" | "COUNT" => Command::Len,
            "COMMIT" => Command::Commit,
            "VERIFY" => Command::Verify,
            "HELP" | "?" => Command::Help,
            "EXIT" | "QUIT" | "Q" => Command::Exit,
            other => {
                return Err(DriftError::Command(format!(
                    "Unknown command: {} (type 'help' for available commands)",
                    other
                )))
            }
        };

        Ok(Some(command))
    }
}

fn single_key(args: &[&str], usage_text: &str) -> Result<String> {
    args.first()
        .map(|key| key.to_string())
        .ok_or_else(|| usage(usage_text))
}

fn usage(text: &str) -> DriftError {
    DriftError::Command(format!("Usage: {}", text))
}
