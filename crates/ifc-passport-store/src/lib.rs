// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Passport Store - mutable STEP/IFC graph store
//!
//! Opens a STEP-serialized IFC model, exposes type-indexed lookup and entity
//! creation, and writes the model back out. Entities that were never touched
//! are emitted from their original source bytes, so a patch run can only add
//! content, never reformat what was already there.

pub mod graph;
pub mod scanner;
pub mod tokenizer;

pub use graph::GraphModel;
pub use scanner::EntityScanner;
