//! Certificate ledger demo
//!
//! Usage:
//!   cargo run -p ledger-cert --example cert_ledger -- <data-dir> <function> [args...]
//!
//! With only a data directory, seeds the ledger, issues one certificate and
//! lists everything. Set `RUST_LOG=debug` to see transaction logs.

use ledger_cert::{CertContract, CertResponse};
use ledger_store::{LedgerStore, PersistMode, StorageConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(data_dir) = args.first() else {
        eprintln!("usage: cert_ledger <data-dir> [function args...]");
        std::process::exit(2);
    };

    // A demo ledger is small; flush every commit to disk
    let config = StorageConfig::new(PathBuf::from(data_dir))
        .with_block_cache_size(16 * 1024 * 1024)
        .with_persist_mode(PersistMode::SyncAll);

    let store = match LedgerStore::open(config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to open ledger: {}", e);
            std::process::exit(1);
        }
    };

    let calls: Vec<(String, Vec<String>)> = match args.get(1) {
        Some(function) => vec![(function.clone(), args[2..].to_vec())],
        None => vec![
            ("initLedger".to_string(), vec![]),
            (
                "createCert".to_string(),
                ["CERT3", "STUD3", "Neha", "CCNS", "BlockVidhya"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            ("queryAllCerts".to_string(), vec![]),
        ],
    };

    for (function, call_args) in calls {
        match CertContract::invoke_function(&store, &function, &call_args) {
            Ok(response) => print_response(&function, &response),
            Err(e) => {
                eprintln!("{} failed: {}", function, e);
                std::process::exit(1);
            }
        }
    }
}

fn print_response(function: &str, response: &CertResponse) {
    match response.payload() {
        Ok(payload) if payload.is_empty() => println!("{}: ok", function),
        Ok(payload) => println!("{}: {}", function, String::from_utf8_lossy(&payload)),
        Err(e) => eprintln!("{}: unprintable response: {}", function, e),
    }
}
