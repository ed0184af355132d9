//! Tests for the command shell
//!
//! These tests verify:
//! - Command parsing, aliases and usage errors
//! - Executing commands against a store
//! - Response formatting

use std::fs::OpenOptions;
use std::io::Write;

use driftkv::shell::{execute, Command, Response, Status, HELP};
use driftkv::DriftError;
use tempfile::TempDir;

use super::open_store;

// =============================================================================
// Helper Functions
// =============================================================================

fn parse(line: &str) -> Command {
    Command::parse(line).unwrap().unwrap()
}

fn parse_error(line: &str) -> String {
    match Command::parse(line) {
        Err(DriftError::Command(message)) => message,
        other => panic!("Expected command error, got {:?}", other),
    }
}

// =============================================================================
// Parse Tests
// =============================================================================

#[test]
fn test_parse_set_joins_value_words() {
    assert_eq!(
        parse("SET greeting hello   big world"),
        Command::Set {
            key: "greeting".to_string(),
            value: "hello big world".to_string(),
        }
    );
}

#[test]
fn test_parse_case_insensitive() {
    assert_eq!(parse("get k"), Command::Get { key: "k".to_string() });
    assert_eq!(parse("Keys"), Command::Keys);
}

#[test]
fn test_parse_aliases() {
    assert_eq!(parse("DEL k"), Command::Delete { key: "k".to_string() });
    assert_eq!(parse("exists k"), Command::Has { key: "k".to_string() });
    assert_eq!(parse("COUNT"), Command::Len);
    assert_eq!(parse("?"), Command::Help);
    assert_eq!(parse("quit"), Command::Exit);
    assert_eq!(parse("q"), Command::Exit);
}

#[test]
fn test_parse_blank_line() {
    assert_eq!(Command::parse("").unwrap(), None);
    assert_eq!(Command::parse("   \t ").unwrap(), None);
}

#[test]
fn test_parse_usage_errors() {
    assert_eq!(parse_error("SET onlykey"), "Usage: SET <key> <value>");
    assert_eq!(parse_error("GET"), "Usage: GET <key>");
    assert_eq!(parse_error("delete"), "Usage: DELETE <key>");
    assert_eq!(parse_error("HAS"), "Usage: HAS <key>");
}

#[test]
fn test_parse_unknown_command() {
    let message = parse_error("FROB x");

    assert!(message.starts_with("Unknown command: FROB"));
}

// =============================================================================
// Execute Tests
// =============================================================================

#[test]
fn test_execute_set_get() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    let response = execute(&store, &parse("SET name drift kv"));
    assert_eq!(response, Response::ok("OK (set 'name' = 'drift kv')"));

    let response = execute(&store, &parse("GET name"));
    assert_eq!(response, Response::ok("drift kv"));
}

#[test]
fn test_execute_get_missing() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    let response = execute(&store, &parse("GET nope"));

    assert_eq!(response.status, Status::NotFound);
    assert_eq!(response.message, "Key 'nope' not found");
}

#[test]
fn test_execute_delete() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());
    store.set("k", "v").unwrap();

    let response = execute(&store, &parse("DELETE k"));
    assert_eq!(response, Response::ok("OK (deleted 'k')"));

    let response = execute(&store, &parse("DELETE k"));
    assert_eq!(response, Response::not_found("Key 'k' does not exist"));
}

#[test]
fn test_execute_has() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());
    store.set("k", "v").unwrap();

    assert!(execute(&store, &parse("HAS k")).is_ok());
    assert_eq!(execute(&store, &parse("HAS x")).status, Status::NotFound);
}

#[test]
fn test_execute_keys_sorted() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    assert_eq!(
        execute(&store, &parse("KEYS")),
        Response::not_found("No keys stored")
    );

    store.set("zeta", "1").unwrap();
    store.set("alpha", "2").unwrap();

    let response = execute(&store, &parse("KEYS"));
    assert_eq!(response.message, "Keys (2 total):\n  1. alpha\n  2. zeta");
}

#[test]
fn test_execute_len_and_commit() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());
    store.set("a", "1").unwrap();

    assert_eq!(execute(&store, &parse("LEN")).message, "Total keys: 1");
    assert_eq!(
        execute(&store, &parse("COMMIT")),
        Response::ok("OK (all writes flushed to disk)")
    );
    assert_eq!(store.wal().buffered_bytes(), 0);
}

#[test]
fn test_execute_verify() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());
    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();
    store.commit().unwrap();

    let response = execute(&store, &parse("VERIFY"));
    assert_eq!(response, Response::ok("OK (2 records in 1 segments)"));

    let mut file = OpenOptions::new()
        .append(true)
        .open(store.wal().active_segment_path())
        .unwrap();
    file.write_all(&[0xFF; 5]).unwrap();
    file.sync_all().unwrap();

    let response = execute(&store, &parse("VERIFY"));
    assert_eq!(response.status, Status::Error);
    assert!(response.message.starts_with("2 valid records"));
}

#[test]
fn test_execute_set_after_close() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());
    store.close().unwrap();

    let response = execute(&store, &parse("SET k v"));

    assert_eq!(response.status, Status::Error);
    assert!(!store.has("k"));
}

#[test]
fn test_execute_help_and_exit() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    assert_eq!(execute(&store, &Command::Help).message, HELP);
    assert_eq!(execute(&store, &Command::Exit), Response::ok("Goodbye!"));
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_response_display() {
    assert_eq!(Response::ok("fine").to_string(), "fine");
    assert_eq!(Response::not_found("missing").to_string(), "missing");
    assert_eq!(Response::error("broken").to_string(), "Error: broken");
}
