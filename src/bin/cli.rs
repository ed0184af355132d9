//! DriftKV Shell Binary
//!
//! Opens a log directory, recovers the store and reads commands from stdin.

use std::io::{self, BufRead, Write};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use driftkv::shell::{self, Command};
use driftkv::{Config, Store, Wal};
use tracing_subscriber::{fmt, EnvFilter};

/// DriftKV Shell
#[derive(Parser, Debug)]
#[command(name = "driftkv")]
#[command(about = "Persistent key-value store backed by a write-ahead log")]
#[command(version)]
struct Args {
    /// Log directory
    #[arg(short, long, default_value = "./driftkv_data")]
    data_dir: String,

    /// Background flush interval in milliseconds
    #[arg(short, long, default_value = "100")]
    flush_interval_ms: u64,

    /// Segment size budget in bytes before rotating
    #[arg(short, long, default_value = "10485760")]
    max_segment_bytes: u64,
}

fn main() {
    // Logs go to stderr so they don't interleave with command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,driftkv=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .flush_interval(Duration::from_millis(args.flush_interval_ms))
        .max_segment_bytes(args.max_segment_bytes)
        .build();

    let wal = match Wal::open_config(&config) {
        Ok(wal) => Arc::new(wal),
        Err(e) => {
            tracing::error!("Failed to open WAL: {}", e);
            process::exit(1);
        }
    };

    let store = Store::new(wal);
    if let Err(e) = store.recover() {
        tracing::error!("Failed to recover store: {}", e);
        process::exit(1);
    }

    println!("DriftKV v{}", driftkv::VERSION);
    println!("Type 'help' for available commands");
    if !store.is_empty() {
        println!("Recovered {} key(s) from disk", store.len());
    }

    if let Err(e) = run_repl(&store) {
        tracing::error!("Shell error: {}", e);
    }

    // Final commit before exit; close flushes again and releases the segment
    if let Err(e) = store.commit().and_then(|_| store.close()) {
        tracing::error!("Failed to flush on exit: {}", e);
        process::exit(1);
    }
}

fn run_repl(store: &Store) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "driftkv> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            return Ok(());
        }

        match Command::parse(&line) {
            Ok(None) => continue,
            Ok(Some(command)) => {
                let response = shell::execute(store, &command);
                writeln!(stdout, "{}", response)?;
                if command == Command::Exit {
                    return Ok(());
                }
            }
            Err(e) => writeln!(stdout, "{}", e)?,
        }
    }
}
