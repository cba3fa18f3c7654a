// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for patch runs

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for patch operations
pub type Result<T> = std::result::Result<T, PatchError>;

/// Errors that can abort a patch run
#[derive(Error, Debug)]
pub enum PatchError {
    /// Input model file missing or unreadable (CLI exit code 2)
    #[error("Input model not found or unreadable: {0}")]
    ModelNotFound(PathBuf),

    /// Mapping table missing or unreadable (CLI exit code 2)
    #[error("Mapping table not found or unreadable: {0}")]
    MappingNotFound(PathBuf),

    /// Mapping table could not be parsed
    #[error("Mapping table: {0}")]
    Mapping(#[from] csv::Error),

    /// Model store failure (parse or persist)
    #[error(transparent)]
    Model(#[from] ifc_passport_model::ModelError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PatchError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            PatchError::ModelNotFound(_) | PatchError::MappingNotFound(_) => 2,
            _ => 1,
        }
    }
}
