//! In-memory issuance service.
//!
//! Claims are keyed by token. Verify also accepts an email-only request when
//! exactly one claim is registered for that email. A claim mints exactly once: the mint check and
//! the redeemed mark happen under the same lock, so two concurrent process
//! calls cannot both receive a wallet.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Contract address reported for every sandbox mint.
pub const SANDBOX_CONTRACT: &str = "0x5a4d0000000000000000000000000000000c1a1e";

const WORDS: &[&str] = &[
    "amber", "basket", "cinder", "dawn", "ember", "fable", "garnet", "harbor", "island", "jasper",
    "kettle", "lantern", "meadow", "nectar", "orbit", "pepper", "quartz", "ribbon", "saddle",
    "timber", "umbra", "velvet", "willow", "zephyr",
];

/// Which wallet layout the process endpoint answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalletShape {
    /// `{"success": true, "walletDetails": {...}}`
    #[default]
    Nested,
    /// Top-level `walletAddress`, `privateKey`, `recoveryPhrase`, ...
    Flat,
}

impl FromStr for WalletShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nested" => Ok(WalletShape::Nested),
            "flat" => Ok(WalletShape::Flat),
            other => Err(format!("unknown wallet shape '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
struct ClaimRecord {
    email: String,
    order_id: String,
    product: String,
    issued_at_ms: u64,
    wallet: Option<MintedWallet>,
}

#[derive(Debug, Clone)]
struct MintedWallet {
    address: String,
    private_key: String,
    mnemonic: String,
    token_id: u64,
    transaction_hash: String,
    certificate_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    claim_token: Option<String>,
}

type Reply = (StatusCode, Json<Value>);

#[derive(Default)]
struct Ledger {
    claims: HashMap<String, ClaimRecord>,
    minted: u64,
}

/// Sandbox claim-issuance service.
#[derive(Clone, Default)]
pub struct SandboxIssuer {
    ledger: Arc<Mutex<Ledger>>,
    shape: WalletShape,
}

impl SandboxIssuer {
    pub fn new(shape: WalletShape) -> Self {
        Self {
            ledger: Arc::default(),
            shape,
        }
    }

    pub fn shape(&self) -> WalletShape {
        self.shape
    }

    /// Register a claim for `email` and return its freshly issued token.
    pub async fn register(&self, email: &str, product: &str) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.register_with_token(email, &token, product).await;
        token
    }

    /// Register a claim under a caller-chosen token, replacing any existing one.
    pub async fn register_with_token(&self, email: &str, token: &str, product: &str) {
        let record = ClaimRecord {
            email: email.trim().to_ascii_lowercase(),
            order_id: format!("ORD-{}", &Uuid::new_v4().simple().to_string()[..8].to_uppercase()),
            product: product.to_string(),
            issued_at_ms: now_ms(),
            wallet: None,
        };
        tracing::debug!(email = %record.email, order_id = %record.order_id, "Sandbox claim registered");
        self.ledger
            .lock()
            .await
            .claims
            .insert(token.to_string(), record);
    }

    pub async fn is_redeemed(&self, token: &str) -> bool {
        self.ledger
            .lock()
            .await
            .claims
            .get(token)
            .is_some_and(|c| c.wallet.is_some())
    }

    /// Number of wallets minted so far.
    pub async fn minted(&self) -> u64 {
        self.ledger.lock().await.minted
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/api/claim/verify", post(verify_claim))
            .route("/api/claim/process", post(process_claim))
            .with_state(self)
    }
}

async fn verify_claim(
    State(issuer): State<SandboxIssuer>,
    Json(request): Json<ClaimRequest>,
) -> Reply {
    let ledger = issuer.ledger.lock().await;
    let (_, record) = match lookup(&ledger, &request, true) {
        Ok(found) => found,
        Err(reply) => return reply,
    };
    if record.wallet.is_some() {
        return error(StatusCode::CONFLICT, "Claim already redeemed");
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "valid": true,
            "orderId": record.order_id,
            "product": { "name": record.product },
            "customer": { "email": record.email },
            "issuedAt": record.issued_at_ms.to_string(),
        })),
    )
}

async fn process_claim(
    State(issuer): State<SandboxIssuer>,
    Json(request): Json<ClaimRequest>,
) -> Reply {
    let mut ledger = issuer.ledger.lock().await;
    let token = match lookup(&ledger, &request, false) {
        Ok((_, record)) if record.wallet.is_some() => {
            tracing::warn!(order_id = %record.order_id, "Sandbox rejected repeat mint");
            return error(StatusCode::CONFLICT, "Claim already redeemed");
        }
        Ok((token, _)) => token.to_string(),
        Err(reply) => return reply,
    };

    ledger.minted += 1;
    let wallet = mint(ledger.minted);
    let Some(record) = ledger.claims.get_mut(&token) else {
        return error(StatusCode::NOT_FOUND, "Invalid claim token");
    };
    record.wallet = Some(wallet.clone());
    tracing::info!(
        order_id = %record.order_id,
        wallet_address = %wallet.address,
        token_id = wallet.token_id,
        "Sandbox minted claim"
    );

    (StatusCode::OK, Json(wallet_body(issuer.shape, &wallet)))
}

/// Find the claim a request refers to. With `email_only`, a request without a
/// token resolves when exactly one claim is registered for the email.
fn lookup<'a>(
    ledger: &'a Ledger,
    request: &ClaimRequest,
    email_only: bool,
) -> Result<(&'a str, &'a ClaimRecord), Reply> {
    let email = request.email.trim().to_ascii_lowercase();
    if email.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "Email is required"));
    }
    let Some(token) = request.claim_token.as_deref().filter(|t| !t.trim().is_empty()) else {
        if !email_only {
            return Err(error(StatusCode::BAD_REQUEST, "Claim token is required"));
        }
        let mut matches = ledger.claims.iter().filter(|(_, c)| c.email == email);
        return match (matches.next(), matches.next()) {
            (Some((token, record)), None) => Ok((token.as_str(), record)),
            (None, _) => Err(error(StatusCode::NOT_FOUND, "No claim found for this email")),
            (Some(_), Some(_)) => Err(error(StatusCode::BAD_REQUEST, "Claim token is required")),
        };
    };
    let Some((token, record)) = ledger.claims.get_key_value(token.trim()) else {
        return Err(error(StatusCode::NOT_FOUND, "Invalid claim token"));
    };
    if record.email != email {
        return Err(error(StatusCode::FORBIDDEN, "Email does not match this claim"));
    }
    Ok((token.as_str(), record))
}

fn error(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "success": false, "error": message })))
}

fn wallet_body(shape: WalletShape, wallet: &MintedWallet) -> Value {
    match shape {
        WalletShape::Nested => json!({
            "success": true,
            "walletDetails": {
                "address": wallet.address,
                "privateKey": wallet.private_key,
                "mnemonic": wallet.mnemonic,
                "tokenId": wallet.token_id,
                "transactionHash": wallet.transaction_hash,
                "contractAddress": SANDBOX_CONTRACT,
                "coaId": wallet.certificate_id,
            }
        }),
        WalletShape::Flat => json!({
            "success": true,
            "walletAddress": wallet.address,
            "privateKey": wallet.private_key,
            "recoveryPhrase": wallet.mnemonic,
            "nftTokenId": wallet.token_id.to_string(),
            "transactionHash": wallet.transaction_hash,
            "nftContractAddress": SANDBOX_CONTRACT,
            "certificateId": wallet.certificate_id,
        }),
    }
}

fn mint(token_id: u64) -> MintedWallet {
    let mnemonic = (0..12)
        .map(|_| WORDS[fastrand::usize(..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ");
    MintedWallet {
        address: hex_string(20),
        private_key: hex_string(32),
        mnemonic,
        token_id,
        transaction_hash: hex_string(32),
        certificate_id: format!("COA-{}", Uuid::new_v4()),
    }
}

fn hex_string(bytes: usize) -> String {
    let mut out = String::with_capacity(2 + bytes * 2);
    out.push_str("0x");
    for _ in 0..bytes {
        out.push_str(&format!("{:02x}", fastrand::u8(..)));
    }
    out
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
