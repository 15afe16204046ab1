//! Contract execution against the ledger store

use crate::error::{CertError, Result};
use crate::operation::CertOperation;
use crate::record::{Cert, CertEntry};
use crate::response::CertResponse;
use ledger_common::Operation;
use ledger_store::{LedgerStore, TransactionContext};

/// Prefix of every certificate key
pub const CERT_KEY_PREFIX: &str = "CERT";

/// Bounds scanned by `queryAllCerts`
pub const QUERY_ALL_START: &str = "CERT0";
pub const QUERY_ALL_END: &str = "CERT999";

const SEED_ORGANISATION: &str = "BlockVidhya";

/// `(id, name, certificate)` for each seeded record
const SEED_CERTS: [(&str, &str, &str); 3] = [
    ("STUD0", "Arnav", "ABCD"),
    ("STUD1", "Rachit", "SSMS"),
    ("STUD2", "Puneet", "XJZZ"),
];

/// Stateless certificate contract
pub struct CertContract;

impl CertContract {
    /// Run `op` in a fresh context and commit it
    ///
    /// Nothing is applied if the operation fails; the context is discarded.
    pub fn invoke(store: &LedgerStore, op: CertOperation) -> Result<CertResponse> {
        let mut ctx = store.begin();
        tracing::debug!(
            "Invoking {} ({:?}) in transaction {}",
            op.name(),
            op.operation_type(),
            ctx.id()
        );

        let response = match Self::execute(&mut ctx, &op) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    "{} failed in transaction {}: {} (operation {})",
                    op.name(),
                    ctx.id(),
                    e,
                    op.as_json_value()
                );
                ctx.discard();
                return Err(e);
            }
        };

        let receipt = ctx.commit()?;
        if !receipt.durable {
            tracing::warn!("{} in {} is applied but not yet durable", op.name(), receipt.id);
        }
        tracing::debug!(
            "{} committed as {} at {:?} ({} writes)",
            op.name(),
            receipt.id,
            receipt.version,
            receipt.writes
        );
        Ok(response)
    }

    /// Parse a raw function call and invoke it
    pub fn invoke_function<S: AsRef<str>>(
        store: &LedgerStore,
        function: &str,
        args: &[S],
    ) -> Result<CertResponse> {
        let op = CertOperation::parse(function, args)?;
        Self::invoke(store, op)
    }

    /// Apply `op` to an open context without committing
    pub fn execute(ctx: &mut TransactionContext<'_>, op: &CertOperation) -> Result<CertResponse> {
        match op {
            CertOperation::QueryCert { key } => Self::query_cert(ctx, key),
            CertOperation::InitLedger => Self::init_ledger(ctx),
            CertOperation::CreateCert {
                key,
                id,
                name,
                cert_name,
                organisation,
                details,
            } => {
                let cert = Cert {
                    id: id.clone(),
                    name: name.clone(),
                    cert_name: cert_name.clone(),
                    details: details.clone().unwrap_or_default(),
                    organisation: organisation.clone(),
                    tx_hash: ctx.id().to_string(),
                };
                Self::create_cert(ctx, key, cert)
            }
            CertOperation::QueryAllCerts => Self::query_all_certs(ctx),
        }
    }

    fn query_cert(ctx: &TransactionContext<'_>, key: &str) -> Result<CertResponse> {
        let cert = match ctx.get(key)? {
            Some(entry) => Some(decode_cert(key, &entry.value)?),
            None => None,
        };
        Ok(CertResponse::Cert(cert))
    }

    fn init_ledger(ctx: &mut TransactionContext<'_>) -> Result<CertResponse> {
        let mut keys = Vec::with_capacity(SEED_CERTS.len());

        for (i, (id, name, cert_name)) in SEED_CERTS.iter().enumerate() {
            // Every seeded record gets its own hash within the one transaction
            let cert = Cert {
                id: id.to_string(),
                name: name.to_string(),
                cert_name: cert_name.to_string(),
                details: String::new(),
                organisation: SEED_ORGANISATION.to_string(),
                tx_hash: ctx.id().derive(i as u64).to_string(),
            };
            let key = format!("{}{}", CERT_KEY_PREFIX, i);

            ctx.put(&key, cert.to_json()?)?;
            tracing::debug!("Added {} as {}", cert.id, key);
            keys.push(key);
        }

        Ok(CertResponse::Initialized { keys })
    }

    fn create_cert(ctx: &mut TransactionContext<'_>, key: &str, cert: Cert) -> Result<CertResponse> {
        ctx.put(key, cert.to_json()?)?;
        Ok(CertResponse::Created {
            key: key.to_string(),
            tx_hash: cert.tx_hash,
        })
    }

    fn query_all_certs(ctx: &TransactionContext<'_>) -> Result<CertResponse> {
        let mut entries = Vec::new();

        for entry in ctx.range(QUERY_ALL_START, QUERY_ALL_END)? {
            let entry = entry?;
            let key = entry.key.to_string();
            let record = decode_cert(&key, &entry.value)?;
            entries.push(CertEntry { key, record });
        }

        tracing::debug!("queryAllCerts returned {} records", entries.len());
        Ok(CertResponse::AllCerts(entries))
    }
}

fn decode_cert(key: &str, bytes: &[u8]) -> Result<Cert> {
    Cert::from_json(bytes).map_err(|source| CertError::Malformed {
        key: key.to_string(),
        source,
    })
}
