// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping table - the tabular patch input
//!
//! One row per component-scoped property, read from a CSV with the header
//! `component,cp_property,value,unit,bsdd_property_uri,dictionary_uri,
//! evidence_file,standard,note`. Rows are read-only input; they are never
//! persisted into the graph.

use crate::error::{PatchError, Result};
use crate::target::Component;
use serde::Deserialize;
use std::path::Path;

/// Prefix for every property set this engine creates
pub const PSET_PREFIX: &str = "CPset_";

/// Dedicated property set for environmental indicator rows
pub const EPD_PSET_NAME: &str = "CPset_EPD_Indicators";

/// One row of the mapping CSV
#[derive(Clone, Debug, Deserialize)]
pub struct MappingRow {
    pub component: String,
    pub cp_property: String,
    pub value: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub bsdd_property_uri: String,
    #[serde(default)]
    pub dictionary_uri: String,
    #[serde(default)]
    pub evidence_file: String,
    #[serde(default)]
    pub standard: String,
    #[serde(default)]
    pub note: String,
}

impl MappingRow {
    /// Component key for this row
    pub fn component_key(&self) -> Component {
        Component::parse(&self.component)
    }

    /// Environmental-indicator row check
    ///
    /// A row is EPD-routed when its property name carries the `EPD_` prefix,
    /// or its standard/note field references EN 15804.
    pub fn is_epd(&self) -> bool {
        self.cp_property.trim().to_lowercase().starts_with("epd_")
            || self.standard.to_lowercase().contains("en 15804")
            || self.note.to_lowercase().contains("epd")
    }

    /// Property set name this row is written into
    pub fn pset_name(&self) -> String {
        if self.is_epd() {
            return EPD_PSET_NAME.to_string();
        }
        match self.component_key() {
            Component::Insulation => "CPset_Insulation_Performance".to_string(),
            Component::Pipe => "CPset_Pipe_Performance".to_string(),
            Component::Timber => "CPset_Timber_Performance".to_string(),
            Component::Other(key) => format!("{PSET_PREFIX}{key}"),
        }
    }
}

/// Read the mapping table from disk
pub fn read_mapping(path: &Path) -> Result<Vec<MappingRow>> {
    if !path.is_file() {
        return Err(PatchError::MappingNotFound(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        if e.is_io_error() {
            PatchError::MappingNotFound(path.to_path_buf())
        } else {
            PatchError::Mapping(e)
        }
    })?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}
