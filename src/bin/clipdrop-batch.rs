//! Clipdrop batch CLI tool
//!
//! Sends every image of a folder through the Clipdrop remove-background or
//! super-resolution API using the clipdrop-batch library.

#[cfg(feature = "cli")]
use clipdrop_batch::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
