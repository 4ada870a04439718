//! Local stand-in for the claim-issuance service.
//!
//! # Responsibilities
//! - Serve `/api/claim/verify` and `/api/claim/process` over an in-memory claim table
//! - Mint each claim at most once
//! - Answer in either the nested or the flat wallet shape
//!
//! Used by the `sandbox` CLI command for local development and by the
//! integration tests.

pub mod issuer;

use std::net::SocketAddr;

use tokio::net::TcpListener;

pub use issuer::{SandboxIssuer, WalletShape, SANDBOX_CONTRACT};

/// Serve `issuer` on an already-bound listener until Ctrl-C.
pub async fn serve(listener: TcpListener, issuer: SandboxIssuer) -> std::io::Result<()> {
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, shape = ?issuer.shape(), "Sandbox issuer listening");

    axum::serve(listener, issuer.router())
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("Sandbox issuer stopped");
    Ok(())
}

/// Bind `addr` and start the issuer in the background, returning the bound
/// address. Handy for tests and for embedding alongside a workflow.
pub async fn spawn(addr: SocketAddr, issuer: SandboxIssuer) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    let router = issuer.router();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Sandbox issuer failed");
        }
    });

    Ok(local_addr)
}
