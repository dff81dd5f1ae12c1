//! Encode command implementation.

use std::path::PathBuf;

use anyhow::Result;
use passkey_core::encoding::encode;
use tracing::info;

use crate::utils::read_input;

/// Print the transport encoding of a binary file.
pub fn execute(file: PathBuf) -> Result<()> {
    let bytes = read_input(&file)?;
    info!(path = %file.display(), bytes = bytes.len(), "Read file");
    println!("{}", encode(&bytes));
    Ok(())
}
