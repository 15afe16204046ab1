//! Certificate contract operations
//!
//! Operations arrive from the dispatch layer as a function name plus string
//! arguments; [`CertOperation::parse`] turns them into typed values.

use crate::error::{CertError, Result};
use ledger_common::{Operation, OperationType};
use serde::{Deserialize, Serialize};

/// Operations understood by the certificate contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertOperation {
    /// Read one certificate by ledger key
    ///
    /// The stored value must decode as a [`Cert`](crate::Cert); anything
    /// else under the key fails with `Malformed` rather than being returned
    /// as raw bytes.
    QueryCert { key: String },

    /// Seed the sample certificates `CERT0..CERT2`
    InitLedger,

    /// Store a certificate under `key`
    CreateCert {
        key: String,
        id: String,
        name: String,
        cert_name: String,
        organisation: String,
        details: Option<String>,
    },

    /// List every certificate in `CERT0..CERT999`
    ///
    /// Fails with `Malformed` if any value in the range is not a certificate.
    QueryAllCerts,
}

impl CertOperation {
    pub const QUERY_CERT: &'static str = "queryCert";
    pub const INIT_LEDGER: &'static str = "initLedger";
    pub const CREATE_CERT: &'static str = "createCert";
    pub const QUERY_ALL_CERTS: &'static str = "queryAllCerts";

    /// Build an operation from a function name and its arguments
    pub fn parse<S: AsRef<str>>(function: &str, args: &[S]) -> Result<Self> {
        let arg = |i: usize| args[i].as_ref().to_string();

        match function {
            Self::QUERY_CERT => {
                expect_args(Self::QUERY_CERT, "1", args.len() == 1, args.len())?;
                Ok(CertOperation::QueryCert { key: arg(0) })
            }
            Self::INIT_LEDGER => {
                expect_args(Self::INIT_LEDGER, "0", args.is_empty(), args.len())?;
                Ok(CertOperation::InitLedger)
            }
            Self::CREATE_CERT => {
                expect_args(
                    Self::CREATE_CERT,
                    "5 or 6",
                    matches!(args.len(), 5 | 6),
                    args.len(),
                )?;
                Ok(CertOperation::CreateCert {
                    key: arg(0),
                    id: arg(1),
                    name: arg(2),
                    cert_name: arg(3),
                    organisation: arg(4),
                    details: args.get(5).map(|d| d.as_ref().to_string()),
                })
            }
            Self::QUERY_ALL_CERTS => {
                expect_args(Self::QUERY_ALL_CERTS, "0", args.is_empty(), args.len())?;
                Ok(CertOperation::QueryAllCerts)
            }
            other => Err(CertError::UnknownFunction(other.to_string())),
        }
    }
}

fn expect_args(function: &'static str, expected: &'static str, ok: bool, got: usize) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(CertError::ArgumentCount {
            function,
            expected,
            got,
        })
    }
}

impl Operation for CertOperation {
    fn operation_type(&self) -> OperationType {
        match self {
            CertOperation::QueryCert { .. } | CertOperation::QueryAllCerts => OperationType::Read,
            CertOperation::InitLedger | CertOperation::CreateCert { .. } => OperationType::Write,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            CertOperation::QueryCert { .. } => Self::QUERY_CERT,
            CertOperation::InitLedger => Self::INIT_LEDGER,
            CertOperation::CreateCert { .. } => Self::CREATE_CERT,
            CertOperation::QueryAllCerts => Self::QUERY_ALL_CERTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_ARGS: [&str; 0] = [];

    #[test]
    fn test_parse_query_cert() {
        let op = CertOperation::parse("queryCert", &["CERT1"]).unwrap();
        assert_eq!(
            op,
            CertOperation::QueryCert {
                key: "CERT1".to_string()
            }
        );
        assert_eq!(op.operation_type(), OperationType::Read);
        assert_eq!(op.name(), "queryCert");
    }

    #[test]
    fn test_parse_create_cert_with_and_without_details() {
        let op = CertOperation::parse("createCert", &["CERT5", "STUD5", "Neha", "CCNS", "BV"]).unwrap();
        match op {
            CertOperation::CreateCert {
                ref key,
                ref organisation,
                ref details,
                ..
            } => {
                assert_eq!(key, "CERT5");
                assert_eq!(organisation, "BV");
                assert_eq!(details, &None);
            }
            _ => panic!("Expected CreateCert"),
        }
        assert_eq!(op.operation_type(), OperationType::Write);

        let args = vec![
            "CERT5".to_string(),
            "STUD5".to_string(),
            "Neha".to_string(),
            "CCNS".to_string(),
            "BV".to_string(),
            "grade A".to_string(),
        ];
        let op = CertOperation::parse("createCert", &args).unwrap();
        assert!(matches!(
            op,
            CertOperation::CreateCert { details: Some(ref d), .. } if d == "grade A"
        ));
    }

    #[test]
    fn test_parse_rejects_wrong_argument_counts() {
        assert!(matches!(
            CertOperation::parse("queryCert", &NO_ARGS),
            Err(CertError::ArgumentCount {
                function: "queryCert",
                got: 0,
                ..
            })
        ));
        assert!(matches!(
            CertOperation::parse("createCert", &["CERT5", "STUD5", "Neha", "CCNS"]),
            Err(CertError::ArgumentCount { got: 4, .. })
        ));
        assert!(matches!(
            CertOperation::parse("initLedger", &["extra"]),
            Err(CertError::ArgumentCount { .. })
        ));
        assert!(matches!(
            CertOperation::parse("queryAllCerts", &["CERT0", "CERT9"]),
            Err(CertError::ArgumentCount { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_function() {
        let err = CertOperation::parse("deleteCert", &["CERT0"]).unwrap_err();
        assert!(matches!(err, CertError::UnknownFunction(ref f) if f == "deleteCert"));
        assert_eq!(
            err.to_string(),
            "Invalid smart contract function name: deleteCert"
        );
    }

    #[test]
    fn test_operation_json() {
        let op = CertOperation::parse("initLedger", &NO_ARGS).unwrap();
        assert_eq!(op.as_json_value(), serde_json::json!("InitLedger"));
    }
}
