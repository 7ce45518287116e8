//! Batch Background Removal CLI Tool
//!
//! Interactive launcher and batch processor for removing backgrounds from the
//! images in an input folder, using the bgremove-batch library.

#[cfg(feature = "cli")]
use bgremove_batch::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
