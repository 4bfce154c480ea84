//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod build;
pub mod status;
pub mod submit;
pub mod verify;

use crate::error::{CliError, Result};
use lensda_common::layout::BuildLayout;
use lensda_common::manifest::Manifest;

/// Load the manifest of a finished build
pub(crate) fn load_manifest(layout: &BuildLayout) -> Result<Manifest> {
    let path = layout.manifest_path();
    if !path.is_file() {
        return Err(CliError::ManifestNotFound(path.display().to_string()));
    }
    Ok(Manifest::load(&path)?)
}
