use booking_settlement::application::orchestrator::{Collaborators, SettlementOrchestrator};
use booking_settlement::application::reconciliation::Reconciler;
use booking_settlement::config::{Config, GATEWAY_API_KEY_ENV, WEBHOOK_SECRET_ENV};
use booking_settlement::domain::event::GatewayEvent;
use booking_settlement::domain::ports::{
    ContractStoreRef, DirectorySeederRef, IdentityDirectoryRef, PaymentGatewayRef,
    ProfileStoreRef, SettlementLedgerRef,
};
use booking_settlement::error::SettlementError;
use booking_settlement::infrastructure::in_memory::InMemoryStores;
use booking_settlement::infrastructure::sandbox::SandboxGateway;
use booking_settlement::infrastructure::stripe::StripeGateway;
use booking_settlement::interfaces::csv::request_reader::CheckoutRequestReader;
use booking_settlement::interfaces::csv::settlement_writer::SettlementWriter;
use booking_settlement::interfaces::directory::Directory;
use booking_settlement::interfaces::http::respond;
use booking_settlement::interfaces::webhook::{SignedPayload, WebhookVerifier};
use booking_settlement::telemetry::init_tracing;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use secrecy::SecretString;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// JSON configuration file. Defaults apply to anything it omits.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gateway secret key. Without it the sandbox gateway is used.
    #[arg(long, env = GATEWAY_API_KEY_ENV, hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Webhook signing secret. When set, `reconcile` expects signed payloads.
    #[arg(long, env = WEBHOOK_SECRET_ENV, hide_env_values = true, global = true)]
    webhook_secret: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Opens a checkout session for every request row and prints one response per line
    Checkout {
        /// Input requests CSV file
        input: PathBuf,

        /// Seed file with payers, payees, identities and contracts
        #[arg(long)]
        directory: Option<PathBuf>,

        /// Also write the resulting ledger as CSV
        #[arg(long)]
        ledger_csv: Option<PathBuf>,
    },
    /// Applies gateway events (one JSON object per line) to the ledger
    Reconcile {
        /// Input events file
        input: PathBuf,
    },
    /// Prints the settlement ledger as CSV
    Ledger,
}

struct Stores {
    profiles: ProfileStoreRef,
    identities: IdentityDirectoryRef,
    contracts: ContractStoreRef,
    ledger: SettlementLedgerRef,
    seeder: DirectorySeederRef,
}

impl Stores {
    fn in_memory() -> Self {
        let stores = InMemoryStores::new();
        Self {
            profiles: Arc::new(stores.profiles.clone()),
            identities: Arc::new(stores.identities.clone()),
            contracts: Arc::new(stores.contracts.clone()),
            ledger: Arc::new(stores.ledger.clone()),
            seeder: Arc::new(stores),
        }
    }

    #[cfg(feature = "storage-rocksdb")]
    fn open(db_path: Option<PathBuf>) -> Result<Self> {
        use booking_settlement::infrastructure::rocksdb::RocksDBStore;

        let Some(db_path) = db_path else {
            return Ok(Self::in_memory());
        };
        let store = RocksDBStore::open(db_path)?;
        Ok(Self {
            profiles: Arc::new(store.clone()),
            identities: Arc::new(store.clone()),
            contracts: Arc::new(store.clone()),
            ledger: Arc::new(store.clone()),
            seeder: Arc::new(store),
        })
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    fn open(db_path: Option<PathBuf>) -> Result<Self> {
        if db_path.is_some() {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
        }
        Ok(Self::in_memory())
    }
}

fn gateway(api_key: Option<String>, config: &Config) -> Result<PaymentGatewayRef> {
    match api_key.filter(|key| !key.trim().is_empty()) {
        Some(key) => Ok(Arc::new(StripeGateway::new(
            SecretString::from(key),
            &config.gateway,
        )?)),
        None => {
            tracing::info!("{GATEWAY_API_KEY_ENV} not set; using the sandbox gateway");
            Ok(Arc::new(SandboxGateway::new()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.logging);

    let stores = Stores::open(cli.db_path)?;
    let stdout = io::stdout();

    match cli.command {
        Command::Checkout {
            input,
            directory,
            ledger_csv,
        } => {
            if let Some(path) = directory {
                let today = chrono::Utc::now().date_naive();
                Directory::load(&path)?
                    .seed(stores.profiles.as_ref(), stores.seeder.as_ref(), today)
                    .await?;
            }

            let orchestrator = SettlementOrchestrator::new(
                Collaborators {
                    profiles: stores.profiles.clone(),
                    identities: stores.identities.clone(),
                    contracts: stores.contracts.clone(),
                    gateway: gateway(cli.api_key, &config)?,
                    ledger: stores.ledger.clone(),
                },
                &config,
            );

            let file = File::open(input).into_diagnostic()?;
            let mut out = stdout.lock();
            for request in CheckoutRequestReader::new(file).requests() {
                let result = match request {
                    Ok(request) => orchestrator.handle(request).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = &result {
                    eprintln!("Error processing request: {}", e);
                }
                writeln!(out, "{}", respond(result).to_json()?).into_diagnostic()?;
            }

            if let Some(path) = ledger_csv {
                let settlements = stores.ledger.all().await?;
                let file = File::create(path).into_diagnostic()?;
                SettlementWriter::new(file).write_settlements(&settlements)?;
            }
        }
        Command::Reconcile { input } => {
            let verifier = cli.webhook_secret.map(|secret| {
                WebhookVerifier::new(
                    SecretString::from(secret),
                    config.gateway.webhook_tolerance_secs,
                )
            });
            let reconciler = Reconciler::new(stores.ledger.clone(), stores.contracts.clone());

            let file = File::open(input).into_diagnostic()?;
            let mut out = stdout.lock();
            for line in BufReader::new(file).lines() {
                let line = line.into_diagnostic()?;
                if line.trim().is_empty() {
                    continue;
                }
                let outcome = match parse_event(&line, verifier.as_ref()) {
                    Ok(event) => reconciler.apply(event).await,
                    Err(e) => Err(e),
                };
                match outcome {
                    Ok(outcome) => {
                        writeln!(out, "{}", serde_json::to_string(&outcome).into_diagnostic()?)
                            .into_diagnostic()?
                    }
                    Err(e) => eprintln!("Error applying event: {}", e),
                }
            }
        }
        Command::Ledger => {
            let settlements = stores.ledger.all().await?;
            SettlementWriter::new(stdout.lock()).write_settlements(&settlements)?;
        }
    }

    Ok(())
}

fn parse_event(
    line: &str,
    verifier: Option<&WebhookVerifier>,
) -> Result<GatewayEvent, SettlementError> {
    match verifier {
        Some(verifier) => {
            let signed: SignedPayload = serde_json::from_str(line)
                .map_err(|e| SettlementError::InvalidWebhookPayload(e.to_string()))?;
            verifier.verify(signed.payload.as_bytes(), &signed.signature)
        }
        None => serde_json::from_str(line)
            .map_err(|e| SettlementError::InvalidWebhookPayload(e.to_string())),
    }
}
