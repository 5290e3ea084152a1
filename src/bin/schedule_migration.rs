use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use chaos_admission::migrate::migrate_documents;

/// Rewrite pre-v2 chaos manifests, lifting `spec.scheduler` into Schedule objects
#[derive(Parser, Debug)]
#[command(name = "schedule-migration", version)]
struct Args {
    /// YAML file holding one or more documents
    #[arg(short, long)]
    input: PathBuf,

    /// Destination file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chaos_admission=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let input = std::fs::read_to_string(&args.input)?;
    let migrated = migrate_documents(&input)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, migrated)?;
            info!(input = %args.input.display(), output = %path.display(), "Migration written");
        }
        None => print!("{migrated}"),
    }
    Ok(())
}
