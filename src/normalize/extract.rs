//! Ordered extractor strategies for the response shapes service revisions use.
//!
//! Each list is tried in sequence; adding a revision means adding an entry,
//! not another branch at the call site.

use serde_json::Value;

use crate::session::{ClaimArtifacts, VerificationResult};

/// One success/eligibility signal found in a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    /// Payload key the signal came from.
    pub source: &'static str,
    pub positive: bool,
}

type SignalExtractor = fn(&Value) -> Option<Signal>;

/// Verify-phase signals, in priority order.
const VERIFY_SIGNALS: &[SignalExtractor] = &[success_flag, eligible_flag, valid_flag, order_identifier];

/// How a verify payload answers "is this claim eligible".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted { by: &'static str },
    Rejected { by: &'static str },
    /// No signal at all: the body is not a verify reply.
    Undetermined,
}

/// Decide eligibility. The first explicit `false` is authoritative; otherwise
/// the first positive signal accepts.
pub fn verify_verdict(payload: &Value) -> Verdict {
    let signals: Vec<Signal> = VERIFY_SIGNALS.iter().filter_map(|f| f(payload)).collect();

    if let Some(negative) = signals.iter().find(|s| !s.positive) {
        return Verdict::Rejected { by: negative.source };
    }
    match signals.first() {
        Some(positive) => Verdict::Accepted { by: positive.source },
        None => Verdict::Undetermined,
    }
}

/// The `success` flag, if the payload carries one as a boolean.
pub fn success_flag(payload: &Value) -> Option<Signal> {
    bool_signal(payload, "success")
}

fn eligible_flag(payload: &Value) -> Option<Signal> {
    bool_signal(payload, "eligible")
}

fn valid_flag(payload: &Value) -> Option<Signal> {
    bool_signal(payload, "valid")
}

fn order_identifier(payload: &Value) -> Option<Signal> {
    first_text(payload, ORDER_ID_PATHS).map(|_| Signal {
        source: "orderId",
        positive: true,
    })
}

fn bool_signal(payload: &Value, key: &'static str) -> Option<Signal> {
    payload.get(key).and_then(Value::as_bool).map(|positive| Signal {
        source: key,
        positive,
    })
}

const ORDER_ID_PATHS: &[&[&str]] = &[
    &["orderId"],
    &["claimId"],
    &["order", "id"],
    &["order", "orderId"],
    &["metadata", "orderId"],
    &["metadata", "claimId"],
];
const PRODUCT_PATHS: &[&[&str]] = &[
    &["product"],
    &["productDetails"],
    &["order", "product"],
    &["metadata", "product"],
];
const CUSTOMER_PATHS: &[&[&str]] = &[
    &["customer"],
    &["customerDetails"],
    &["order", "customer"],
    &["metadata", "customer"],
];
const ISSUED_AT_PATHS: &[&[&str]] = &[
    &["issuedAt"],
    &["createdAt"],
    &["order", "createdAt"],
    &["metadata", "issuedAt"],
    &["metadata", "purchaseDate"],
];

/// Build a verification result from an accepted verify payload.
pub fn extract_verification(payload: &Value) -> VerificationResult {
    VerificationResult {
        eligible: true,
        order_reference: first_text(payload, ORDER_ID_PATHS),
        product: first_value(payload, PRODUCT_PATHS),
        customer: first_value(payload, CUSTOMER_PATHS),
        issued_at: first_text(payload, ISSUED_AT_PATHS),
        metadata: present(payload.get("metadata")),
        on_chain_data: present(payload.get("onChainData")),
    }
}

/// Where a wallet bundle lives in a claim payload and what its keys are called.
struct ArtifactShape {
    name: &'static str,
    /// Prefix for reporting missing fields ("walletDetails." or "").
    prefix: &'static str,
    locate: fn(&Value) -> Option<&Value>,
    address: &'static [&'static str],
    private_key: &'static [&'static str],
    recovery_phrase: &'static [&'static str],
    token_id: &'static [&'static str],
    transaction_hash: &'static [&'static str],
    contract_address: &'static [&'static str],
    certificate_id: &'static [&'static str],
}

const ARTIFACT_SHAPES: &[ArtifactShape] = &[
    ArtifactShape {
        name: "walletDetails",
        prefix: "walletDetails.",
        locate: nested_wallet,
        address: &["address"],
        private_key: &["privateKey"],
        recovery_phrase: &["mnemonic", "recoveryPhrase"],
        token_id: &["tokenId", "nftTokenId"],
        transaction_hash: &["transactionHash", "txHash"],
        contract_address: &["contractAddress", "nftContractAddress"],
        certificate_id: &["coaId", "certificateId"],
    },
    ArtifactShape {
        name: "flat",
        prefix: "",
        locate: flat_wallet,
        address: &["walletAddress"],
        private_key: &["privateKey", "walletPrivateKey"],
        recovery_phrase: &["recoveryPhrase", "mnemonic", "walletRecoveryPhrase"],
        token_id: &["nftTokenId", "tokenId"],
        transaction_hash: &["transactionHash", "txHash"],
        contract_address: &["nftContractAddress", "contractAddress"],
        certificate_id: &["certificateId", "coaId"],
    },
];

fn nested_wallet(payload: &Value) -> Option<&Value> {
    payload.get("walletDetails").filter(|w| w.is_object())
}

fn flat_wallet(payload: &Value) -> Option<&Value> {
    const MARKERS: &[&str] = &["walletAddress", "privateKey", "walletPrivateKey", "recoveryPhrase"];
    MARKERS
        .iter()
        .any(|key| payload.get(*key).is_some())
        .then_some(payload)
}

/// Result of looking for a wallet bundle in a claim payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactExtraction {
    Complete(ClaimArtifacts),
    /// A wallet object was found but required fields are missing.
    Incomplete { shape: &'static str, missing: Vec<String> },
    /// No wallet object in any known shape.
    Absent,
}

/// Try each known shape in order; the first complete bundle wins. When none
/// is complete, the first shape that was present explains what is missing.
pub fn extract_artifacts(payload: &Value) -> ArtifactExtraction {
    let mut first_incomplete = None;

    for shape in ARTIFACT_SHAPES {
        let Some(wallet) = (shape.locate)(payload) else {
            continue;
        };
        match shape.extract(wallet) {
            Ok(artifacts) => return ArtifactExtraction::Complete(artifacts),
            Err(missing) if first_incomplete.is_none() => {
                first_incomplete = Some(ArtifactExtraction::Incomplete {
                    shape: shape.name,
                    missing,
                });
            }
            Err(_) => {}
        }
    }

    first_incomplete.unwrap_or(ArtifactExtraction::Absent)
}

/// Required fields of the preferred shape, used when no wallet object exists.
pub fn required_artifact_fields() -> Vec<String> {
    let shape = &ARTIFACT_SHAPES[0];
    [shape.address, shape.private_key, shape.recovery_phrase]
        .iter()
        .map(|keys| format!("{}{}", shape.prefix, keys[0]))
        .collect()
}

impl ArtifactShape {
    fn extract(&self, wallet: &Value) -> Result<ClaimArtifacts, Vec<String>> {
        let address = any_text(wallet, self.address);
        let private_key = any_text(wallet, self.private_key);
        let recovery_phrase = any_text(wallet, self.recovery_phrase);

        match (address, private_key, recovery_phrase) {
            (Some(wallet_address), Some(wallet_private_key), Some(wallet_recovery_phrase)) => {
                Ok(ClaimArtifacts {
                    wallet_address,
                    wallet_private_key,
                    wallet_recovery_phrase,
                    nft_token_id: any_text(wallet, self.token_id),
                    transaction_hash: any_text(wallet, self.transaction_hash),
                    contract_address: any_text(wallet, self.contract_address),
                    certificate_id: any_text(wallet, self.certificate_id),
                })
            }
            (address, private_key, recovery_phrase) => {
                let mut missing = Vec::new();
                for (value, keys) in [
                    (address, self.address),
                    (private_key, self.private_key),
                    (recovery_phrase, self.recovery_phrase),
                ] {
                    if value.is_none() {
                        missing.push(format!("{}{}", self.prefix, keys[0]));
                    }
                }
                Err(missing)
            }
        }
    }
}

/// Non-empty string, or a number rendered as text.
fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn any_text(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| object.get(*key).and_then(as_text))
}

fn at_path<'a>(payload: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(payload, |value, key| value.get(*key))
}

fn first_text(payload: &Value, paths: &[&[&str]]) -> Option<String> {
    paths
        .iter()
        .find_map(|path| at_path(payload, path).and_then(as_text))
}

fn first_value(payload: &Value, paths: &[&[&str]]) -> Option<Value> {
    paths
        .iter()
        .find_map(|path| present(at_path(payload, path)))
}

fn present(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verdict_conventions() {
        assert_eq!(
            verify_verdict(&json!({"success": true})),
            Verdict::Accepted { by: "success" }
        );
        assert_eq!(
            verify_verdict(&json!({"valid": true, "metadata": {}})),
            Verdict::Accepted { by: "valid" }
        );
        assert_eq!(
            verify_verdict(&json!({"eligible": true})),
            Verdict::Accepted { by: "eligible" }
        );
        assert_eq!(
            verify_verdict(&json!({"claimId": "C9"})),
            Verdict::Accepted { by: "orderId" }
        );
        assert_eq!(verify_verdict(&json!({"message": "OK"})), Verdict::Undetermined);
    }

    #[test]
    fn test_explicit_false_is_authoritative() {
        assert_eq!(
            verify_verdict(&json!({"success": false, "orderId": "O1"})),
            Verdict::Rejected { by: "success" }
        );
        assert_eq!(
            verify_verdict(&json!({"success": true, "valid": false})),
            Verdict::Rejected { by: "valid" }
        );
        assert_eq!(
            verify_verdict(&json!({"eligible": false, "valid": false})),
            Verdict::Rejected { by: "eligible" }
        );
    }

    #[test]
    fn test_non_boolean_flags_ignored() {
        assert_eq!(
            verify_verdict(&json!({"success": "false", "orderId": "O1"})),
            Verdict::Accepted { by: "orderId" }
        );
        assert_eq!(verify_verdict(&json!({"orderId": null})), Verdict::Undetermined);
    }

    #[test]
    fn test_verification_descriptors() {
        let result = extract_verification(&json!({
            "valid": true,
            "order": {"id": 1042, "createdAt": "2024-05-01T10:00:00Z"},
            "metadata": {"product": {"name": "Gold Ring"}, "customer": {"name": "Ada"}},
            "onChainData": {"network": "polygon"},
        }));
        assert!(result.eligible);
        assert_eq!(result.order_reference.as_deref(), Some("1042"));
        assert_eq!(result.product, Some(json!({"name": "Gold Ring"})));
        assert_eq!(result.customer, Some(json!({"name": "Ada"})));
        assert_eq!(result.issued_at.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert_eq!(result.on_chain_data, Some(json!({"network": "polygon"})));
    }

    #[test]
    fn test_nested_wallet() {
        let extraction = extract_artifacts(&json!({
            "success": true,
            "walletDetails": {
                "address": "0xA", "privateKey": "K", "mnemonic": "M",
                "tokenId": 12, "transactionHash": "0xT", "contractAddress": "0xC", "coaId": "COA-1"
            }
        }));
        let ArtifactExtraction::Complete(artifacts) = extraction else {
            panic!("expected complete artifacts");
        };
        assert_eq!(artifacts.wallet_address, "0xA");
        assert_eq!(artifacts.wallet_recovery_phrase, "M");
        assert_eq!(artifacts.nft_token_id.as_deref(), Some("12"));
        assert_eq!(artifacts.certificate_id.as_deref(), Some("COA-1"));
    }

    #[test]
    fn test_flat_wallet() {
        let extraction = extract_artifacts(&json!({
            "success": true,
            "walletAddress": "0xA", "privateKey": "K", "recoveryPhrase": "M",
            "nftTokenId": "5", "transactionHash": "0xT", "nftContractAddress": "0xC"
        }));
        let ArtifactExtraction::Complete(artifacts) = extraction else {
            panic!("expected complete artifacts");
        };
        assert_eq!(artifacts.contract_address.as_deref(), Some("0xC"));
        assert_eq!(artifacts.certificate_id, None);
    }

    #[test]
    fn test_missing_nested_address() {
        assert_eq!(
            extract_artifacts(&json!({
                "success": true,
                "walletDetails": {"privateKey": "K", "mnemonic": "M"}
            })),
            ArtifactExtraction::Incomplete {
                shape: "walletDetails",
                missing: vec!["walletDetails.address".to_string()],
            }
        );
    }

    #[test]
    fn test_no_wallet() {
        assert_eq!(
            extract_artifacts(&json!({"success": true})),
            ArtifactExtraction::Absent
        );
        assert_eq!(
            required_artifact_fields(),
            vec![
                "walletDetails.address",
                "walletDetails.privateKey",
                "walletDetails.mnemonic"
            ]
        );
    }
}
