//! projctl - projection store inspection tool
//!
//! Prints entities and the processing cursor of a projector RocksDB store
//! as JSON.

use projector::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
