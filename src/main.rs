use clap::Parser;
use miette::{IntoDiagnostic, Result};
use partnerpay::application::workflow::PaymentWorkflow;
use partnerpay::error::PaymentError;
use partnerpay::infrastructure::in_memory::{
    InMemoryDocumentStore, InMemoryFileStore, InMemoryPaymentStore,
};
use partnerpay::interfaces::csv::command_reader::{Command, CommandReader};
use partnerpay::interfaces::csv::record_writer::RecordWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input workflow commands CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

async fn apply(workflow: &PaymentWorkflow, command: Command) -> partnerpay::error::Result<()> {
    match command {
        Command::Open {
            payment,
            contract,
            period,
            talent,
            partner,
        } => {
            workflow.open(payment, contract, period, talent, partner).await?;
        }
        Command::Verify { payment, terms } => {
            workflow.verify(payment, terms).await?;
        }
        Command::Attach {
            payment,
            category,
            source,
            uploaded_by,
            file,
        } => {
            let bytes = std::fs::read(&file)
                .map_err(|e| PaymentError::ExternalService(format!("cannot read {file}: {e}")))?;
            let name = PathBuf::from(&file)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(file.clone());
            workflow
                .attach_evidence(payment, category, source, &uploaded_by, &name, &bytes)
                .await?;
        }
        Command::CalculateAndSubmit { payment, report } => {
            workflow.calculate_and_submit(payment, report).await?;
        }
        Command::Approve { payment, notes } => {
            workflow.approve(payment, notes).await?;
        }
        Command::Reject { payment, reason } => {
            workflow.reject(payment, &reason).await?;
        }
        Command::MarkAsPaid { payment, settlement } => {
            workflow.mark_as_paid(payment, settlement).await?;
        }
        Command::Cancel { payment, notes } => {
            workflow.cancel(payment, notes).await?;
        }
    }
    Ok(())
}

fn build_workflow(db_path: Option<PathBuf>) -> Result<PaymentWorkflow> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            use partnerpay::infrastructure::rocksdb::RocksDbStore;
            let store = RocksDbStore::open(path).into_diagnostic()?;
            Ok(PaymentWorkflow::new(
                Box::new(store.clone()),
                Box::new(store),
                Box::new(InMemoryFileStore::new()),
            ))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => Err(miette::miette!(
            "--db-path requires the 'storage-rocksdb' feature"
        )),
        None => Ok(PaymentWorkflow::new(
            Box::new(InMemoryPaymentStore::new()),
            Box::new(InMemoryDocumentStore::new()),
            Box::new(InMemoryFileStore::new()),
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let workflow = build_workflow(cli.db_path)?;

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = CommandReader::new(file);
    for result in reader.commands() {
        match result {
            Ok(command) => {
                if let Err(e) = apply(&workflow, command).await {
                    warn!("command failed: {e}");
                }
            }
            Err(e) => {
                warn!("skipping malformed command row: {e}");
            }
        }
    }

    let records = workflow.records().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = RecordWriter::new(stdout.lock());
    writer.write_records(records).into_diagnostic()?;

    Ok(())
}
