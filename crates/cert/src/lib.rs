//! Certificate registry contract
//!
//! A thin consumer of the ledger store. Each invocation runs one
//! [`CertOperation`] inside one transaction context and commits it:
//! - `queryCert` reads a single certificate
//! - `initLedger` seeds the three sample certificates `CERT0..CERT2`
//! - `createCert` stores a certificate stamped with the transaction id
//! - `queryAllCerts` scans `CERT0..CERT999` in key order

pub mod contract;
pub mod error;
pub mod operation;
pub mod record;
pub mod response;

pub use contract::CertContract;
pub use error::{CertError, Result};
pub use operation::CertOperation;
pub use record::{Cert, CertEntry};
pub use response::CertResponse;
