//! Common test doubles and fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use invoice_notary::coordinator::{CoordinatorConfig, SubmissionCoordinator};
use invoice_notary::crypto::sha256;
use invoice_notary::domain::{
    Fingerprint, InvoiceStatus, LedgerAttestation, MirrorRecord, TxRef,
};
use invoice_notary::ledger::{LedgerClient, LedgerError};
use invoice_notary::notify::{NotificationDispatcher, NotifyError};
use invoice_notary::store::{RecordStore, StoreError, UserRecord, UserStore};

/// Submitter identity the fake ledger attests for every acceptance.
pub const LEDGER_SUBMITTER: &str = "0x00000000000000000000000000000000000000aa";

/// A complete invoice with all six required fields.
pub fn invoice_text(number: &str) -> String {
    format!(
        "INVOICE\n\
         Invoice Number: {number}\n\
         Invoice Date: 2024-03-01\n\
         Bill To: Acme Corp\n\
         Items:\n\
         - Widget x2 $50\n\
         Total Amount: $100"
    )
}

/// The same invoice with one field removed.
pub fn invoice_text_missing_total(number: &str) -> String {
    invoice_text(number).replace("Total Amount: $100", "")
}

/// In-memory ledger with contract-style duplicate rejection.
#[derive(Default)]
pub struct InMemoryLedger {
    entries: Mutex<HashMap<Fingerprint, LedgerAttestation>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holds(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.lock().unwrap().contains_key(fingerprint)
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn submit(
        &self,
        fingerprint: &Fingerprint,
        _submitter: &str,
    ) -> Result<TxRef, LedgerError> {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(fingerprint) {
            return Err(LedgerError::Duplicate);
        }
        entries.insert(
            *fingerprint,
            LedgerAttestation {
                submitter: LEDGER_SUBMITTER.to_string(),
                accepted_at: Utc::now(),
                valid: true,
            },
        );
        // Deterministic pseudo transaction hash.
        Ok(TxRef(sha256(fingerprint.as_bytes())))
    }

    async fn verify(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<LedgerAttestation>, LedgerError> {
        Ok(self.entries.lock().unwrap().get(fingerprint).cloned())
    }
}

/// In-memory mirror store with conflict-free insert semantics and optional
/// injected failures for crash-window tests.
#[derive(Default)]
pub struct InMemoryRecordStore {
    rows: Mutex<HashMap<Fingerprint, MirrorRecord>>,
    failing_creates: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` create attempts fail with a transport error.
    pub fn fail_next_creates(&self, n: usize) {
        self.failing_creates.store(n, Ordering::SeqCst);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<MirrorRecord> {
        self.rows.lock().unwrap().get(fingerprint).cloned()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create_if_absent(
        &self,
        fingerprint: &Fingerprint,
        owner: &str,
        tx_ref: &TxRef,
    ) -> Result<bool, StoreError> {
        let remaining = self.failing_creates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_creates.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut));
        }

        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(fingerprint) {
            return Ok(false);
        }
        rows.insert(
            *fingerprint,
            MirrorRecord {
                id: Uuid::new_v4(),
                owner: owner.to_string(),
                fingerprint: *fingerprint,
                status: InvoiceStatus::Valid,
                tx_ref: *tx_ref,
                created_at: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn mark_paid(&self, fingerprint: &Fingerprint) -> Result<bool, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(fingerprint) {
            Some(record) => {
                record.status = InvoiceStatus::Paid;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find(&self, fingerprint: &Fingerprint) -> Result<Option<MirrorRecord>, StoreError> {
        Ok(self.rows.lock().unwrap().get(fingerprint).cloned())
    }
}

/// In-memory credential store.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<UserRecord>>,
    hashes: Mutex<HashMap<String, String>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create_if_absent(
        &self,
        username: &str,
        password_hash: &str,
        phone: &str,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.username == username || u.phone == phone)
        {
            return Ok(false);
        }
        users.push(UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            phone: phone.to_string(),
            created_at: Utc::now(),
        });
        self.hashes
            .lock()
            .unwrap()
            .insert(username.to_string(), password_hash.to_string());
        Ok(true)
    }

    async fn find_by_credentials(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let hashes = self.hashes.lock().unwrap();
        if hashes.get(username).map(String::as_str) != Some(password_hash) {
            return Ok(None);
        }
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }
}

/// Dispatcher that reports every delivery over a channel.
pub struct RecordingDispatcher {
    tx: mpsc::UnboundedSender<(String, String)>,
}

impl RecordingDispatcher {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn notify(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
        let _ = self.tx.send((destination.to_string(), message.to_string()));
        Ok(())
    }
}

/// Coordinator wired to fresh in-memory collaborators.
pub struct TestHarness {
    pub coordinator: Arc<SubmissionCoordinator>,
    pub ledger: Arc<InMemoryLedger>,
    pub records: Arc<InMemoryRecordStore>,
    pub notifications: mpsc::UnboundedReceiver<(String, String)>,
}

pub fn harness() -> TestHarness {
    let ledger = Arc::new(InMemoryLedger::new());
    let records = Arc::new(InMemoryRecordStore::new());
    let (dispatcher, notifications) = RecordingDispatcher::new();

    let coordinator = Arc::new(SubmissionCoordinator::new(
        Arc::clone(&ledger) as Arc<dyn LedgerClient>,
        Arc::clone(&records) as Arc<dyn RecordStore>,
        Arc::new(dispatcher),
        CoordinatorConfig::default(),
    ));

    TestHarness {
        coordinator,
        ledger,
        records,
        notifications,
    }
}
