//! `claim-portal` command-line front end.
//!
//! ```text
//! claim-portal [--config FILE] [--base-url URL] [--log-format human|json] [--audit-out FILE]
//!     verify  (--email E [--token T] | --link URL)
//!     redeem  (--email E [--token T] | --link URL) [--export FILE] [--export-format json|text]
//!     sandbox [--bind ADDR] [--shape nested|flat] [--claim EMAIL[:TOKEN]]...
//! ```
//!
//! Results go to stdout as JSON; logs go to stderr.

use std::fs::File;
use std::io::BufWriter;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tokio::net::TcpListener;
use url::Url;

use claim_portal::config::validation::validate_config;
use claim_portal::config::{load_config, ConfigError, PortalConfig};
use claim_portal::export::{ExportFormat, FileExporter};
use claim_portal::observability::{init_logging, LogFormat};
use claim_portal::sandbox::{self, SandboxIssuer, WalletShape};
use claim_portal::session::ClaimIdentity;
use claim_portal::{ClaimWorkflow, HttpTransport};

type BoxError = Box<dyn std::error::Error>;

#[derive(Parser)]
#[command(name = "claim-portal")]
#[command(version, about = "Verify and redeem product claims for a wallet and NFT", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Issuance service base URL (overrides config and CLAIM_PORTAL_API_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log output format
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Write the session audit log here as JSON lines
    #[arg(long, global = true)]
    audit_out: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check claim eligibility only
    Verify(IdentityArgs),
    /// Verify, then redeem the claim and print the wallet artifacts
    Redeem {
        #[command(flatten)]
        identity: IdentityArgs,

        /// Also write the artifacts to this new file
        #[arg(long)]
        export: Option<PathBuf>,

        #[arg(long, default_value = "json")]
        export_format: ExportFormat,
    },
    /// Run a local sandbox issuance service
    Sandbox {
        #[arg(long, default_value = "127.0.0.1:3001")]
        bind: SocketAddr,

        #[arg(long, default_value = "nested")]
        shape: WalletShape,

        /// Pre-register a claim; a token is generated when omitted
        #[arg(long = "claim", value_name = "EMAIL[:TOKEN]")]
        claims: Vec<String>,
    },
}

#[derive(Args)]
struct IdentityArgs {
    #[arg(long, conflicts_with = "link", required_unless_present = "link")]
    email: Option<String>,

    #[arg(long, conflicts_with = "link")]
    token: Option<String>,

    /// Deep link carrying `token` and `email` query parameters
    #[arg(long)]
    link: Option<String>,
}

impl IdentityArgs {
    fn identity(&self) -> Result<ClaimIdentity, BoxError> {
        match (&self.link, &self.email) {
            (Some(link), _) => Ok(ClaimIdentity::from_deep_link(link)?),
            (None, Some(email)) => Ok(ClaimIdentity::new(email.as_str(), self.token.clone())),
            (None, None) => Err("either --email or --link is required".into()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = build_config(&cli)?;
    let format = match cli.log_format {
        Some(format) => format,
        None => config.observability.log_format.parse()?,
    };
    init_logging(format, &config.observability.log_level)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.service.base_url,
        "claim-portal starting"
    );

    match &cli.command {
        Commands::Verify(args) => {
            let identity = args.identity()?;
            let workflow = ClaimWorkflow::from_config(&config)?;
            let outcome = verify(&workflow, identity).await;
            write_audit(&workflow, cli.audit_out.as_deref())?;
            outcome
        }
        Commands::Redeem {
            identity,
            export,
            export_format,
        } => {
            let identity = identity.identity()?;
            let workflow = ClaimWorkflow::from_config(&config)?;
            let outcome = redeem(&workflow, identity, export.as_deref(), *export_format).await;
            write_audit(&workflow, cli.audit_out.as_deref())?;
            outcome
        }
        Commands::Sandbox {
            bind,
            shape,
            claims,
        } => run_sandbox(*bind, *shape, claims).await,
    }
}

fn build_config(cli: &Cli) -> Result<PortalConfig, ConfigError> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(base_url) = &cli.base_url {
        config.service.base_url = base_url.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }
    Ok(config)
}

async fn verify(workflow: &ClaimWorkflow<HttpTransport>, identity: ClaimIdentity) -> Result<(), BoxError> {
    let result = workflow.verify(identity).await?;
    let output = json!({
        "sessionId": workflow.session_id().to_string(),
        "state": workflow.state().name(),
        "verification": result,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn redeem(
    workflow: &ClaimWorkflow<HttpTransport>,
    identity: ClaimIdentity,
    export: Option<&Path>,
    export_format: ExportFormat,
) -> Result<(), BoxError> {
    let verification = workflow.verify(identity).await?;
    tracing::info!(order_reference = ?verification.order_reference, "Claim verified");

    let artifacts = workflow.claim().await?;
    let output = json!({
        "sessionId": workflow.session_id().to_string(),
        "state": workflow.state().name(),
        "verification": verification,
        "artifacts": artifacts,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if let Some(path) = export {
        let location = workflow.export_artifacts(&FileExporter::new(path, export_format))?;
        eprintln!("Artifacts written to {}", location);
    }
    Ok(())
}

fn write_audit(workflow: &ClaimWorkflow<HttpTransport>, path: Option<&Path>) -> Result<(), BoxError> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = File::create(path)?;
    workflow.audit().write_json_lines(BufWriter::new(file))?;
    tracing::info!(path = %path.display(), entries = workflow.audit().len(), "Audit log written");
    Ok(())
}

async fn run_sandbox(bind: SocketAddr, shape: WalletShape, claims: &[String]) -> Result<(), BoxError> {
    let listener = TcpListener::bind(bind).await?;
    let local_addr = listener.local_addr()?;
    let issuer = SandboxIssuer::new(shape);

    let mut registered = Vec::new();
    if claims.is_empty() {
        let token = issuer.register("demo@example.com", "Sandbox Collectible").await;
        registered.push(("demo@example.com".to_string(), token));
    }
    for claim in claims {
        let (email, token) = match claim.split_once(':') {
            Some((email, token)) => {
                issuer.register_with_token(email, token, "Sandbox Collectible").await;
                (email.to_string(), token.to_string())
            }
            None => {
                let token = issuer.register(claim, "Sandbox Collectible").await;
                (claim.clone(), token)
            }
        };
        registered.push((email, token));
    }

    for (email, token) in &registered {
        let link = Url::parse_with_params(
            &format!("http://{}/claim", local_addr),
            &[("token", token.as_str()), ("email", email.as_str())],
        )?;
        println!(
            "{}",
            json!({ "email": email, "claimToken": token, "link": link.as_str() })
        );
    }

    sandbox::serve(listener, issuer).await?;
    Ok(())
}
