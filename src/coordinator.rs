//! Submission coordination across the two systems of record.
//!
//! The ledger write and the mirror write cannot be updated atomically
//! together, so the coordinator owns the ordering and idempotency rules that
//! keep them consistent across partial failures:
//!
//! - ledger acceptance always precedes mirror creation; the mirror may lag
//!   the ledger but never lead it
//! - a mirror write that fails after ledger acceptance surfaces as
//!   [`SubmitError::PartialSuccess`] carrying the transaction reference, so
//!   the caller can retry the idempotent mirror write without ever
//!   re-submitting to the ledger
//! - duplicate detection belongs to the ledger; the coordinator only
//!   translates it
//!
//! Both ledger and store calls run under bounded deadlines. Notification
//! dispatch is spawned off the request path and its failures are absorbed.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::domain::{Fingerprint, InvalidInvoice, Invoice, TxRef};
use crate::ledger::{LedgerClient, LedgerError};
use crate::notify::NotificationDispatcher;
use crate::store::{RecordStore, StoreError};

const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadlines for the coordinator's two blocking collaborators.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub ledger_timeout: Duration,
    pub store_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ledger_timeout: DEFAULT_LEDGER_TIMEOUT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

impl CoordinatorConfig {
    /// Load deadlines from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let seconds = |var: &str, default: Duration| {
            std::env::var(var)
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };
        Self {
            ledger_timeout: seconds("LEDGER_TIMEOUT_SECS", DEFAULT_LEDGER_TIMEOUT),
            store_timeout: seconds("STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT),
        }
    }
}

/// Inbound submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub invoice: String,
    pub owner: String,
    pub notify_destination: String,
}

/// Successful submission: ledger committed and mirror written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub fingerprint: Fingerprint,
    pub tx_ref: TxRef,
    /// False when the mirror row already existed (a retry after a crash
    /// between ledger acceptance and the first mirror attempt).
    pub mirror_created: bool,
}

/// Inbound payment marking.
#[derive(Debug, Clone)]
pub struct MarkPaidRequest {
    pub invoice: String,
    pub owner: String,
    pub notify_destination: String,
}

/// Ledger's answer about supplied invoice content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The ledger holds the fingerprint and attests it valid.
    Valid {
        submitter: String,
        accepted_at: DateTime<Utc>,
    },
    /// The ledger holds the fingerprint but attests it invalid.
    Invalid,
    /// The ledger has never accepted this fingerprint.
    NotFound,
}

/// Submission failures, one distinguishable outcome per path.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Required invoice fields are missing; no ledger call was made.
    #[error(transparent)]
    InvalidStructure(#[from] InvalidInvoice),

    /// The ledger already holds this fingerprint. The mirror is left
    /// untouched.
    #[error("invoice already exists on the ledger")]
    AlreadyExists,

    /// The ledger did not accept the submission; nothing was written
    /// anywhere and the whole submission is safe to retry.
    #[error("ledger submission failed: {0}")]
    SubmissionFailed(#[source] LedgerError),

    /// The ledger committed but the mirror write failed. Retry only the
    /// mirror write (idempotent); never re-submit to the ledger.
    #[error("ledger committed {tx_ref} but the mirror write failed: {source}")]
    PartialSuccess {
        tx_ref: TxRef,
        #[source]
        source: StoreError,
    },
}

/// Verification failures. Absence on the ledger is a normal
/// [`VerifyOutcome::NotFound`], not an error.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invoice content is empty")]
    EmptyContent,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Payment-marking failures.
#[derive(Debug, Error)]
pub enum MarkPaidError {
    #[error("invoice content is empty")]
    EmptyContent,

    /// No mirror record exists for this fingerprint.
    #[error("no mirror record for this invoice")]
    RecordNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Mirror-repair failures.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error(transparent)]
    InvalidStructure(#[from] InvalidInvoice),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Orchestrates submit / verify / mark-paid against the ledger and the
/// mirror store.
pub struct SubmissionCoordinator {
    ledger: Arc<dyn LedgerClient>,
    records: Arc<dyn RecordStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    config: CoordinatorConfig,
}

impl SubmissionCoordinator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        records: Arc<dyn RecordStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            ledger,
            records,
            notifier,
            config,
        }
    }

    /// Submit invoice content for notarization.
    ///
    /// Validates structure, records the fingerprint on the ledger, then
    /// mirrors the accepted submission. See [`SubmitError`] for the failure
    /// taxonomy.
    pub async fn submit(&self, request: &SubmitRequest) -> Result<SubmitReceipt, SubmitError> {
        let invoice = Invoice::parse(&request.invoice)?;
        let fingerprint = invoice.fingerprint();

        let tx_ref = match timeout(
            self.config.ledger_timeout,
            self.ledger.submit(&fingerprint, &request.owner),
        )
        .await
        {
            Ok(Ok(tx_ref)) => tx_ref,
            Ok(Err(LedgerError::Duplicate)) => return Err(SubmitError::AlreadyExists),
            Ok(Err(e)) => return Err(SubmitError::SubmissionFailed(e)),
            Err(_) => {
                return Err(SubmitError::SubmissionFailed(LedgerError::Unavailable(
                    format!("submit timed out after {:?}", self.config.ledger_timeout),
                )))
            }
        };

        // The ledger has committed; from here on the only retryable unit is
        // the idempotent mirror write.
        let mirror_created = match timeout(
            self.config.store_timeout,
            self.records
                .create_if_absent(&fingerprint, &request.owner, &tx_ref),
        )
        .await
        {
            Ok(Ok(created)) => created,
            Ok(Err(source)) => return Err(SubmitError::PartialSuccess { tx_ref, source }),
            Err(_) => {
                return Err(SubmitError::PartialSuccess {
                    tx_ref,
                    source: StoreError::Timeout(self.config.store_timeout),
                })
            }
        };

        info!(%fingerprint, %tx_ref, owner = %request.owner, mirror_created, "invoice submitted");

        self.dispatch_notification(
            request.notify_destination.clone(),
            format!(
                "Hi {}, your invoice has been successfully submitted. Tx: {}",
                request.owner, tx_ref
            ),
        );

        Ok(SubmitReceipt {
            fingerprint,
            tx_ref,
            mirror_created,
        })
    }

    /// Ask the ledger whether it has accepted this content.
    ///
    /// Read-only oracle query, independent of mirror state: the ledger is
    /// the source of truth for authenticity.
    pub async fn verify(&self, invoice_content: &str) -> Result<VerifyOutcome, VerifyError> {
        if invoice_content.trim().is_empty() {
            return Err(VerifyError::EmptyContent);
        }
        let fingerprint = Fingerprint::compute(invoice_content);

        let attestation = match timeout(
            self.config.ledger_timeout,
            self.ledger.verify(&fingerprint),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(VerifyError::Ledger(LedgerError::Unavailable(format!(
                    "verify timed out after {:?}",
                    self.config.ledger_timeout
                ))))
            }
        };

        Ok(match attestation {
            Some(a) if a.valid => VerifyOutcome::Valid {
                submitter: a.submitter,
                accepted_at: a.accepted_at,
            },
            Some(_) => VerifyOutcome::Invalid,
            None => VerifyOutcome::NotFound,
        })
    }

    /// Transition a mirrored invoice to Paid.
    ///
    /// Idempotent on an already-Paid record. Fails with
    /// [`MarkPaidError::RecordNotFound`] when no mirror row exists, so a
    /// no-op update is visible to the caller instead of silently succeeding.
    pub async fn mark_paid(&self, request: &MarkPaidRequest) -> Result<(), MarkPaidError> {
        if request.invoice.trim().is_empty() {
            return Err(MarkPaidError::EmptyContent);
        }
        let fingerprint = Fingerprint::compute(&request.invoice);

        let updated = match timeout(
            self.config.store_timeout,
            self.records.mark_paid(&fingerprint),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(StoreError::Timeout(self.config.store_timeout).into()),
        };

        if !updated {
            return Err(MarkPaidError::RecordNotFound);
        }

        info!(%fingerprint, owner = %request.owner, "invoice marked as paid");

        self.dispatch_notification(
            request.notify_destination.clone(),
            format!(
                "Hi {}, your invoice has been marked as PAID. Thank you!",
                request.owner
            ),
        );

        Ok(())
    }

    /// Retry the mirror write for a fingerprint the ledger has already
    /// accepted.
    ///
    /// This is the recovery path for [`SubmitError::PartialSuccess`]: it
    /// performs only the idempotent mirror creation and never touches the
    /// ledger. Returns whether a row was created now.
    pub async fn repair_mirror(
        &self,
        invoice_content: &str,
        owner: &str,
        tx_ref: TxRef,
    ) -> Result<bool, RepairError> {
        let invoice = Invoice::parse(invoice_content)?;
        let fingerprint = invoice.fingerprint();

        let created = match timeout(
            self.config.store_timeout,
            self.records.create_if_absent(&fingerprint, owner, &tx_ref),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(StoreError::Timeout(self.config.store_timeout).into()),
        };

        if created {
            info!(%fingerprint, %tx_ref, owner, "mirror record repaired");
        }

        Ok(created)
    }

    /// Spawn delivery off the request path. Failures are logged, never
    /// escalated, never retried here.
    fn dispatch_notification(&self, destination: String, message: String) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&destination, &message).await {
                warn!(error = %e, destination, "notification dispatch failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LedgerAttestation;
    use crate::ledger::MockLedgerClient;
    use crate::notify::{MockNotificationDispatcher, NotifyError};
    use crate::store::MockRecordStore;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    const INVOICE: &str = "INVOICE\n\
                           Invoice Number: INV-7\n\
                           Invoice Date: 2024-03-01\n\
                           Bill To: Acme Corp\n\
                           Items: Widget x1\n\
                           Total Amount: $50";

    /// Dispatcher that reports deliveries over a channel so tests can await
    /// them deterministically.
    struct ChannelDispatcher {
        tx: mpsc::UnboundedSender<(String, String)>,
    }

    #[async_trait]
    impl NotificationDispatcher for ChannelDispatcher {
        async fn notify(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
            let _ = self.tx.send((destination.to_string(), message.to_string()));
            Ok(())
        }
    }

    /// Ledger that never answers within the coordinator's deadline.
    struct StalledLedger;

    #[async_trait]
    impl LedgerClient for StalledLedger {
        async fn submit(&self, _: &Fingerprint, _: &str) -> Result<TxRef, LedgerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(TxRef([0u8; 32]))
        }

        async fn verify(&self, _: &Fingerprint) -> Result<Option<LedgerAttestation>, LedgerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    fn short_deadlines() -> CoordinatorConfig {
        CoordinatorConfig {
            ledger_timeout: Duration::from_millis(100),
            store_timeout: Duration::from_millis(100),
        }
    }

    fn submit_request() -> SubmitRequest {
        SubmitRequest {
            invoice: INVOICE.to_string(),
            owner: "alice".to_string(),
            notify_destination: "+15551234567".to_string(),
        }
    }

    fn coordinator_with(
        ledger: MockLedgerClient,
        records: MockRecordStore,
    ) -> (SubmissionCoordinator, mpsc::UnboundedReceiver<(String, String)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = SubmissionCoordinator::new(
            Arc::new(ledger),
            Arc::new(records),
            Arc::new(ChannelDispatcher { tx }),
            CoordinatorConfig::default(),
        );
        (coordinator, rx)
    }

    #[tokio::test]
    async fn test_submit_happy_path_notifies_owner() {
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_submit()
            .times(1)
            .returning(|_, _| Ok(TxRef([0xaa; 32])));

        let mut records = MockRecordStore::new();
        records
            .expect_create_if_absent()
            .times(1)
            .returning(|_, _, _| Ok(true));

        let (coordinator, mut rx) = coordinator_with(ledger, records);
        let receipt = coordinator.submit(&submit_request()).await.unwrap();

        assert_eq!(receipt.tx_ref, TxRef([0xaa; 32]));
        assert!(receipt.mirror_created);
        assert_eq!(receipt.fingerprint, Fingerprint::compute(INVOICE));

        let (destination, message) = rx.recv().await.unwrap();
        assert_eq!(destination, "+15551234567");
        assert!(message.contains("alice"));
        assert!(message.contains("submitted"));
    }

    #[tokio::test]
    async fn test_submit_invalid_structure_never_reaches_ledger() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_submit().never();
        let mut records = MockRecordStore::new();
        records.expect_create_if_absent().never();

        let (coordinator, _rx) = coordinator_with(ledger, records);
        let mut request = submit_request();
        request.invoice = request.invoice.replace("Total Amount: $50", "");

        let err = coordinator.submit(&request).await.unwrap_err();
        match err {
            SubmitError::InvalidStructure(e) => assert_eq!(e.missing, vec!["Total Amount:"]),
            other => panic!("expected InvalidStructure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_duplicate_leaves_mirror_untouched() {
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_submit()
            .times(1)
            .returning(|_, _| Err(LedgerError::Duplicate));
        let mut records = MockRecordStore::new();
        records.expect_create_if_absent().never();

        let (coordinator, mut rx) = coordinator_with(ledger, records);
        let err = coordinator.submit(&submit_request()).await.unwrap_err();

        assert!(matches!(err, SubmitError::AlreadyExists));
        assert!(rx.try_recv().is_err(), "duplicates must not notify");
    }

    #[tokio::test]
    async fn test_submit_ledger_unavailable_is_retryable_failure() {
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_submit()
            .times(1)
            .returning(|_, _| Err(LedgerError::Unavailable("connection refused".into())));
        let mut records = MockRecordStore::new();
        records.expect_create_if_absent().never();

        let (coordinator, _rx) = coordinator_with(ledger, records);
        let err = coordinator.submit(&submit_request()).await.unwrap_err();

        assert!(matches!(
            err,
            SubmitError::SubmissionFailed(LedgerError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_mirror_failure_surfaces_partial_success() {
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_submit()
            .times(1)
            .returning(|_, _| Ok(TxRef([0xbb; 32])));

        let mut records = MockRecordStore::new();
        records
            .expect_create_if_absent()
            .times(1)
            .returning(|_, _, _| Err(StoreError::Unavailable(sqlx::Error::PoolTimedOut)));

        let (coordinator, mut rx) = coordinator_with(ledger, records);
        let err = coordinator.submit(&submit_request()).await.unwrap_err();

        match err {
            SubmitError::PartialSuccess { tx_ref, .. } => {
                assert_eq!(tx_ref, TxRef([0xbb; 32]));
            }
            other => panic!("expected PartialSuccess, got {other:?}"),
        }
        assert!(rx.try_recv().is_err(), "partial success must not notify");
    }

    #[tokio::test]
    async fn test_submit_ledger_timeout_maps_to_unavailable() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let coordinator = SubmissionCoordinator::new(
            Arc::new(StalledLedger),
            Arc::new(MockRecordStore::new()),
            Arc::new(ChannelDispatcher { tx }),
            short_deadlines(),
        );

        let err = coordinator.submit(&submit_request()).await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::SubmissionFailed(LedgerError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_notification_failure_does_not_change_outcome() {
        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_submit()
            .times(1)
            .returning(|_, _| Ok(TxRef([0xcc; 32])));
        let mut records = MockRecordStore::new();
        records
            .expect_create_if_absent()
            .times(1)
            .returning(|_, _, _| Ok(true));

        let mut notifier = MockNotificationDispatcher::new();
        notifier.expect_notify().returning(|_, _| {
            Err(NotifyError::Gateway {
                status: 500,
                body: "gateway down".into(),
            })
        });

        let coordinator = SubmissionCoordinator::new(
            Arc::new(ledger),
            Arc::new(records),
            Arc::new(notifier),
            CoordinatorConfig::default(),
        );

        let receipt = coordinator.submit(&submit_request()).await.unwrap();
        assert_eq!(receipt.tx_ref, TxRef([0xcc; 32]));
    }

    #[tokio::test]
    async fn test_verify_maps_attestations_to_outcomes() {
        let mut ledger = MockLedgerClient::new();
        let accepted_at = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        ledger.expect_verify().times(1).returning(move |_| {
            Ok(Some(LedgerAttestation {
                submitter: "0x1234".to_string(),
                accepted_at,
                valid: true,
            }))
        });

        let (coordinator, _rx) = coordinator_with(ledger, MockRecordStore::new());
        let outcome = coordinator.verify(INVOICE).await.unwrap();
        assert_eq!(
            outcome,
            VerifyOutcome::Valid {
                submitter: "0x1234".to_string(),
                accepted_at,
            }
        );
    }

    #[tokio::test]
    async fn test_verify_absent_is_not_found_not_error() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_verify().times(1).returning(|_| Ok(None));

        let (coordinator, _rx) = coordinator_with(ledger, MockRecordStore::new());
        let outcome = coordinator.verify("never submitted content").await.unwrap();
        assert_eq!(outcome, VerifyOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_verify_invalid_attestation() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_verify().times(1).returning(|_| {
            Ok(Some(LedgerAttestation {
                submitter: "0x1234".to_string(),
                accepted_at: Utc::now(),
                valid: false,
            }))
        });

        let (coordinator, _rx) = coordinator_with(ledger, MockRecordStore::new());
        let outcome = coordinator.verify(INVOICE).await.unwrap();
        assert_eq!(outcome, VerifyOutcome::Invalid);
    }

    #[tokio::test]
    async fn test_verify_empty_content_rejected_before_ledger() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_verify().never();

        let (coordinator, _rx) = coordinator_with(ledger, MockRecordStore::new());
        let err = coordinator.verify("   ").await.unwrap_err();
        assert!(matches!(err, VerifyError::EmptyContent));
    }

    #[tokio::test]
    async fn test_mark_paid_absent_record_is_not_found() {
        let mut records = MockRecordStore::new();
        records.expect_mark_paid().times(1).returning(|_| Ok(false));

        let (coordinator, mut rx) = coordinator_with(MockLedgerClient::new(), records);
        let request = MarkPaidRequest {
            invoice: INVOICE.to_string(),
            owner: "alice".to_string(),
            notify_destination: "+15551234567".to_string(),
        };

        let err = coordinator.mark_paid(&request).await.unwrap_err();
        assert!(matches!(err, MarkPaidError::RecordNotFound));
        assert!(rx.try_recv().is_err(), "not-found must not notify");
    }

    #[tokio::test]
    async fn test_mark_paid_success_notifies_owner() {
        let mut records = MockRecordStore::new();
        records.expect_mark_paid().times(1).returning(|_| Ok(true));

        let (coordinator, mut rx) = coordinator_with(MockLedgerClient::new(), records);
        let request = MarkPaidRequest {
            invoice: INVOICE.to_string(),
            owner: "alice".to_string(),
            notify_destination: "+15551234567".to_string(),
        };

        coordinator.mark_paid(&request).await.unwrap();

        let (_, message) = rx.recv().await.unwrap();
        assert!(message.contains("PAID"));
    }

    #[tokio::test]
    async fn test_repair_mirror_writes_without_ledger() {
        let mut ledger = MockLedgerClient::new();
        ledger.expect_submit().never();
        ledger.expect_verify().never();

        let mut records = MockRecordStore::new();
        records
            .expect_create_if_absent()
            .times(1)
            .returning(|_, _, _| Ok(true));

        let (coordinator, _rx) = coordinator_with(ledger, records);
        let created = coordinator
            .repair_mirror(INVOICE, "alice", TxRef([0xdd; 32]))
            .await
            .unwrap();
        assert!(created);
    }
}
