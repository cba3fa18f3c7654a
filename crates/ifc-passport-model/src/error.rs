// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types shared by the model store and the patch engine

use crate::EntityId;
use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while reading or writing a graph model
#[derive(Error, Debug)]
pub enum ModelError {
    /// Invalid STEP/IFC file format
    #[error("Invalid IFC format: {0}")]
    InvalidFormat(String),

    /// Failed to parse an entity definition
    #[error("Failed to parse entity {0}: {1}")]
    EntityParse(EntityId, String),

    /// Entity not found in the model
    #[error("Entity {0} not found")]
    EntityNotFound(EntityId),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    /// Create a new format error
    pub fn format(msg: impl Into<String>) -> Self {
        ModelError::InvalidFormat(msg.into())
    }

    /// Create a new entity parse error
    pub fn entity_parse(id: EntityId, msg: impl Into<String>) -> Self {
        ModelError::EntityParse(id, msg.into())
    }
}
