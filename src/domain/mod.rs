//! Core domain types: invoices, fingerprints, and mirror records.

mod fingerprint;
mod invoice;
mod record;

pub use fingerprint::Fingerprint;
pub use invoice::{Invoice, InvalidInvoice, REQUIRED_FIELDS};
pub use record::{InvoiceStatus, LedgerAttestation, MirrorRecord, TxRef};
