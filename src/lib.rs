//! invoice-notary library.
//!
//! Authenticates financial invoices by committing a content fingerprint to
//! an append-only EVM ledger, mirroring submission/payment status in
//! Postgres, and notifying the owner of state changes.
//!
//! ## Modules
//!
//! - [`domain`] - Invoices, fingerprints, mirror records
//! - [`crypto`] - Deterministic hashing
//! - [`ledger`] - Ledger client trait and on-chain implementation
//! - [`store`] - Mirror and credential stores (PostgreSQL)
//! - [`notify`] - Best-effort SMS notifications
//! - [`coordinator`] - Submission coordination across the two systems of record
//! - [`auth`] - Registration/login boundary
//! - [`api`] - REST routes
//! - [`server`] - Process bootstrap

pub mod api;
pub mod auth;
pub mod coordinator;
pub mod crypto;
pub mod domain;
pub mod ledger;
pub mod migrations;
pub mod notify;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use coordinator::{
    CoordinatorConfig, MarkPaidError, MarkPaidRequest, SubmissionCoordinator, SubmitError,
    SubmitReceipt, SubmitRequest, VerifyError, VerifyOutcome,
};
pub use domain::{
    Fingerprint, InvalidInvoice, Invoice, InvoiceStatus, LedgerAttestation, MirrorRecord, TxRef,
};
pub use ledger::{LedgerClient, LedgerError};
pub use notify::{NotificationDispatcher, NotifyError};
pub use store::{RecordStore, StoreError, UserRecord, UserStore};
