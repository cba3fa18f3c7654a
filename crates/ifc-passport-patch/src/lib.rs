// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Passport Patch - idempotent metadata patching for IFC models
//!
//! Augments an IFC graph with property values, document references and
//! classification concepts, driven by a component-scoped mapping table and a
//! directory of product-passport JSON-LD files. Every write goes through a
//! find-or-create upsert layer, so running the patch twice over the same
//! inputs leaves the graph unchanged the second time.
//!
//! ```no_run
//! use ifc_passport_patch::{run, PatchOptions};
//! use std::path::Path;
//!
//! let outcome = run(
//!     Path::new("model.ifc"),
//!     Path::new("mapping.csv"),
//!     Some(Path::new("passports/")),
//!     &PatchOptions::default(),
//! )?;
//! println!("wrote {}", outcome.output.display());
//! # Ok::<(), ifc_passport_patch::PatchError>(())
//! ```

pub mod coerce;
pub mod error;
pub mod harvest;
pub mod mapping;
pub mod orchestrator;
pub mod target;
pub mod upsert;

pub use coerce::{coerce_value, IfcValue};
pub use error::{PatchError, Result};
pub use harvest::{merge_documents, infer_doc_metadata, DocMetadata, PassportSet};
pub use mapping::{read_mapping, MappingRow, EPD_PSET_NAME, PSET_PREFIX};
pub use orchestrator::{
    apply, default_output, run, PatchMode, PatchOptions, PatchOutcome, PatchStats,
};
pub use target::{resolve_targets, Component, PatchTarget};
pub use upsert::Upserter;
