//! Products of the two workflow phases.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of a successful verify call.
///
/// Built in one step from a single response; a response that cannot produce
/// one fails the phase instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub eligible: bool,
    /// Order or claim identifier assigned by the service.
    pub order_reference: Option<String>,
    /// Product description as sent by the service.
    pub product: Option<Value>,
    /// Customer description as sent by the service.
    pub customer: Option<Value>,
    pub issued_at: Option<String>,
    /// Revision-specific metadata block, kept verbatim.
    pub metadata: Option<Value>,
    /// On-chain data some service revisions return at verify time.
    pub on_chain_data: Option<Value>,
}

/// Wallet credentials and NFT identifiers returned by a successful mint.
///
/// This is a secret bundle. `Debug` masks the private key and recovery
/// phrase; `Serialize` does not, since it backs explicit export.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimArtifacts {
    pub wallet_address: String,
    pub wallet_private_key: String,
    pub wallet_recovery_phrase: String,
    pub nft_token_id: Option<String>,
    pub transaction_hash: Option<String>,
    pub contract_address: Option<String>,
    pub certificate_id: Option<String>,
}

impl ClaimArtifacts {
    /// Value of a single field, if present.
    pub fn field(&self, field: ArtifactField) -> Option<&str> {
        match field {
            ArtifactField::WalletAddress => Some(&self.wallet_address),
            ArtifactField::PrivateKey => Some(&self.wallet_private_key),
            ArtifactField::RecoveryPhrase => Some(&self.wallet_recovery_phrase),
            ArtifactField::NftTokenId => self.nft_token_id.as_deref(),
            ArtifactField::TransactionHash => self.transaction_hash.as_deref(),
            ArtifactField::ContractAddress => self.contract_address.as_deref(),
            ArtifactField::CertificateId => self.certificate_id.as_deref(),
        }
    }

    /// Plain-text rendering used for text export.
    pub fn to_text(&self) -> String {
        let mut out = String::from("NFT Certificate Wallet\n======================\n\n");
        for field in ArtifactField::ALL {
            if let Some(value) = self.field(field) {
                out.push_str(field.label());
                out.push_str(": ");
                out.push_str(value);
                out.push('\n');
            }
        }
        out.push_str("\nKeep this file private. Anyone holding the private key or recovery phrase controls the wallet.\n");
        out
    }
}

impl std::fmt::Debug for ClaimArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimArtifacts")
            .field("wallet_address", &self.wallet_address)
            .field("wallet_private_key", &"[REDACTED]")
            .field("wallet_recovery_phrase", &"[REDACTED]")
            .field("nft_token_id", &self.nft_token_id)
            .field("transaction_hash", &self.transaction_hash)
            .field("contract_address", &self.contract_address)
            .field("certificate_id", &self.certificate_id)
            .finish()
    }
}

/// Individually addressable artifact fields (copy targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactField {
    WalletAddress,
    PrivateKey,
    RecoveryPhrase,
    NftTokenId,
    TransactionHash,
    ContractAddress,
    CertificateId,
}

impl ArtifactField {
    pub const ALL: [ArtifactField; 7] = [
        ArtifactField::WalletAddress,
        ArtifactField::PrivateKey,
        ArtifactField::RecoveryPhrase,
        ArtifactField::NftTokenId,
        ArtifactField::TransactionHash,
        ArtifactField::ContractAddress,
        ArtifactField::CertificateId,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ArtifactField::WalletAddress => "Wallet Address",
            ArtifactField::PrivateKey => "Private Key",
            ArtifactField::RecoveryPhrase => "Recovery Phrase",
            ArtifactField::NftTokenId => "NFT Token ID",
            ArtifactField::TransactionHash => "Transaction Hash",
            ArtifactField::ContractAddress => "Contract Address",
            ArtifactField::CertificateId => "Certificate ID",
        }
    }

    /// Whether the value is wallet-controlling secret material.
    pub fn is_secret(self) -> bool {
        matches!(self, ArtifactField::PrivateKey | ArtifactField::RecoveryPhrase)
    }
}
