//! Command-line client: sends one question and prints the query's progress.

mod cli;
mod render;

use std::process::ExitCode;
use std::sync::Arc;

use askdb_stream::observability::init_observability;
use askdb_stream::{
    ByteStream, ClientConfig, ClientError, Endpoint, HealthStatus, QueryClient, QueryState,
    QueryTransport, ReqwestTransport, TransportError,
};
use clap::Parser as _;
use tracing::{debug, error};

use crate::cli::{Cli, OutputFormat};
use crate::render::ProgressPrinter;

/// Wraps a transport so the probe always reports the database as unreachable.
struct FallbackOnly<T>(T);

#[async_trait::async_trait]
impl<T: QueryTransport> QueryTransport for FallbackOnly<T> {
    async fn probe(&self) -> Result<HealthStatus, TransportError> {
        Ok(HealthStatus {
            status: None,
            database: Some("disconnected: fallback requested".into()),
        })
    }

    async fn open_stream(
        &self,
        endpoint: Endpoint,
        question: &str,
    ) -> Result<ByteStream, TransportError> {
        self.0.open_stream(endpoint, question).await
    }
}

fn build_client(cli: &Cli) -> Result<QueryClient, ClientError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.base_url(base_url.clone());
    }
    let transport = ReqwestTransport::new(config)?;
    let transport: Arc<dyn QueryTransport> = if cli.fallback_only {
        Arc::new(FallbackOnly(transport))
    } else {
        Arc::new(transport)
    };
    Ok(QueryClient::new(transport))
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    init_observability("warn");
    let cli = Cli::parse();

    let client = match build_client(&cli) {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "failed to build client");
            eprintln!("askdb: {err}");
            return ExitCode::from(2);
        }
    };

    let mut updates = client.subscribe();
    let mut handle = client.submit(cli.question());
    let mut printer = ProgressPrinter::new(cli.max_rows);
    let mut stdout = std::io::stdout();

    loop {
        tokio::select! {
            joined = &mut handle => {
                if let Err(err) = joined {
                    error!(error = %err, "query task failed");
                }
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = updates.borrow_and_update().clone();
                if cli.output == OutputFormat::Human
                    && let Err(err) = printer.render(&snap, &mut stdout)
                {
                    debug!(error = %err, "stdout closed");
                    break;
                }
            }
        }
    }

    let snap = client.snapshot();
    match cli.output {
        OutputFormat::Human => {
            let _ = printer.render(&snap, &mut stdout);
            println!();
        }
        OutputFormat::Json => match serde_json::to_string_pretty(&snap) {
            Ok(json) => println!("{json}"),
            Err(err) => eprintln!("askdb: failed to serialize result: {err}"),
        },
    }

    match (snap.state, &snap.error) {
        (QueryState::Error, Some(err)) => {
            eprintln!("askdb: {} ({})", err.message, err.code);
            ExitCode::FAILURE
        }
        _ => ExitCode::SUCCESS,
    }
}
