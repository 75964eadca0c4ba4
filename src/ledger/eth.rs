//! On-chain ledger client.
//!
//! Submits invoice fingerprints to the InvoiceRegistry contract and reads
//! attestations back. The registry rejects a second submission of the same
//! fingerprint by reverting with a known message.

use alloy::primitives::{Address, FixedBytes, U256};
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{Fingerprint, LedgerAttestation, TxRef};

use super::{LedgerClient, LedgerError};

/// Revert message the registry emits for a repeated fingerprint.
const DUPLICATE_REVERT: &str = "Invoice already exists";

// Generate contract bindings
sol! {
    #[sol(rpc)]
    interface IInvoiceRegistry {
        function submitInvoice(bytes32 fingerprint) external;

        function verifyInvoice(bytes32 fingerprint)
            external
            view
            returns (bool valid, address submitter, uint256 acceptedAt);
    }
}

/// Ledger client configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// JSON-RPC URL of the chain node.
    pub rpc_url: String,
    /// InvoiceRegistry contract address.
    pub registry_address: Address,
    /// Private key of the submitting operator.
    pub private_key: String,
    /// Chain ID.
    pub chain_id: u64,
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Option<Self> {
        let rpc_url = std::env::var("LEDGER_RPC_URL").ok()?;
        let registry_address = std::env::var("INVOICE_REGISTRY_ADDRESS")
            .ok()
            .and_then(|s| s.parse().ok())?;
        let private_key = std::env::var("LEDGER_PRIVATE_KEY").ok()?;
        let chain_id = std::env::var("LEDGER_CHAIN_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1337);

        Some(Self {
            rpc_url,
            registry_address,
            private_key,
            chain_id,
        })
    }
}

/// Ledger client backed by the InvoiceRegistry contract.
pub struct EthLedgerClient {
    config: LedgerConfig,
}

impl EthLedgerClient {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn to_bytes32(fingerprint: &Fingerprint) -> FixedBytes<32> {
        FixedBytes::from_slice(fingerprint.as_bytes())
    }

    fn signer(&self) -> Result<PrivateKeySigner, LedgerError> {
        self.config
            .private_key
            .parse()
            .map_err(|e| LedgerError::Rejected(format!("Invalid operator key: {}", e)))
    }
}

/// Classify an RPC/contract failure into the ledger error taxonomy.
///
/// The registry's duplicate rejection arrives as a revert string; transport
/// problems are retryable; everything else is a rejection.
fn classify_failure(message: String) -> LedgerError {
    if message.contains(DUPLICATE_REVERT) {
        return LedgerError::Duplicate;
    }
    let lowered = message.to_ascii_lowercase();
    if lowered.contains("timed out")
        || lowered.contains("timeout")
        || lowered.contains("connection")
        || lowered.contains("error sending request")
    {
        return LedgerError::Unavailable(message);
    }
    LedgerError::Rejected(message)
}

fn timestamp_from_chain(accepted_at: U256) -> DateTime<Utc> {
    let secs = i64::try_from(accepted_at).unwrap_or(i64::MAX);
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

#[async_trait]
impl LedgerClient for EthLedgerClient {
    async fn submit(
        &self,
        fingerprint: &Fingerprint,
        submitter: &str,
    ) -> Result<TxRef, LedgerError> {
        debug!(%fingerprint, submitter, "submitting fingerprint to the registry");

        let signer = self.signer()?;
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(alloy::network::EthereumWallet::from(signer))
            .on_http(
                self.config
                    .rpc_url
                    .parse()
                    .map_err(|e| LedgerError::Rejected(format!("Invalid RPC URL: {}", e)))?,
            );

        let contract = IInvoiceRegistry::new(self.config.registry_address, &provider);

        let call = contract.submitInvoice(Self::to_bytes32(fingerprint));
        let pending = call
            .send()
            .await
            .map_err(|e| classify_failure(e.to_string()))?;

        debug!("transaction sent: {:?}", pending.tx_hash());

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| LedgerError::Unavailable(format!("Failed to get receipt: {}", e)))?;

        let tx_ref = TxRef(receipt.transaction_hash.0);

        info!(
            %fingerprint,
            %tx_ref,
            block = receipt.block_number.unwrap_or(0),
            "fingerprint recorded on the ledger"
        );

        Ok(tx_ref)
    }

    async fn verify(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<LedgerAttestation>, LedgerError> {
        let provider = ProviderBuilder::new().on_http(
            self.config
                .rpc_url
                .parse()
                .map_err(|e| LedgerError::Rejected(format!("Invalid RPC URL: {}", e)))?,
        );
        let contract = IInvoiceRegistry::new(self.config.registry_address, &provider);

        let ret = contract
            .verifyInvoice(Self::to_bytes32(fingerprint))
            .call()
            .await
            .map_err(|e| classify_failure(e.to_string()))?;

        // An unrecorded fingerprint comes back as the zero address with a
        // zero timestamp.
        if ret.submitter == Address::ZERO && ret.acceptedAt == U256::ZERO {
            return Ok(None);
        }

        Ok(Some(LedgerAttestation {
            submitter: format!("{:?}", ret.submitter),
            accepted_at: timestamp_from_chain(ret.acceptedAt),
            valid: ret.valid,
        }))
    }
}
