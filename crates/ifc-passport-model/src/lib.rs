// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Passport Model - shared types for the passport patching engine
//!
//! This crate provides the vocabulary the rest of the workspace is built on:
//! entity identifiers, the subset of IFC entity types the patcher reads,
//! creates or links, decoded attribute values (with STEP re-encoding), and
//! GlobalId generation for newly created rooted entities.
//!
//! It performs no I/O; parsing and persistence live in `ifc-passport-store`.

pub mod error;
pub mod guid;
pub mod types;

pub use error::*;
pub use guid::*;
pub use types::*;
