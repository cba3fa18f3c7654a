// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GraphModel - the mutable model store
//!
//! Implements the open / entities-of-kind / create / write surface the patch
//! engine runs against. Every entity is decoded eagerly; untouched entities
//! keep their original source slice and are written back byte-for-byte, so
//! a patch run can only add graph content, never reformat pre-existing data.

use crate::scanner::{schema_version, EntityScanner};
use crate::tokenizer::parse_entity_at;
use ifc_passport_model::{
    AttributeValue, Entity, EntityId, IfcType, ModelError, Result,
};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;

/// One stored entity with its provenance
#[derive(Debug)]
struct Slot {
    entity: Entity,
    /// Original source text, present for entities read from the file
    raw: Option<String>,
    /// Set when the entity was mutated (raw text is then stale)
    dirty: bool,
}

/// Parsed, mutable IFC model
#[derive(Debug)]
pub struct GraphModel {
    /// File content before the first entity (ISO preamble, header, DATA;)
    prologue: String,
    /// File content after the last entity (ENDSEC; and ISO trailer)
    epilogue: String,
    /// Declaration order of all entities, created ones appended
    order: Vec<EntityId>,
    /// Entity storage
    slots: FxHashMap<u32, Slot>,
    /// Type -> entity IDs, in declaration order
    type_index: FxHashMap<IfcType, Vec<EntityId>>,
    /// Next ID handed out by `create`
    next_id: u32,
    /// Schema version from the header, for logging
    schema: Option<String>,
}

impl GraphModel {
    /// Open and parse a model from disk
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a model from STEP source text
    pub fn parse(content: &str) -> Result<Self> {
        if !content.contains("DATA;") {
            return Err(ModelError::format("missing DATA section"));
        }

        let mut order = Vec::new();
        let mut slots = FxHashMap::default();
        let mut type_index: FxHashMap<IfcType, Vec<EntityId>> = FxHashMap::default();
        let mut next_id = 1u32;
        let mut first_start = None;
        let mut last_end = 0usize;

        let mut scanner = EntityScanner::new(content);
        while let Some((id, _, start, end)) = scanner.next_entity() {
            let entity = parse_entity_at(content, start, end)
                .map_err(|e| ModelError::entity_parse(EntityId(id), e))?;

            first_start.get_or_insert(start);
            last_end = end;
            next_id = next_id.max(id + 1);

            order.push(EntityId(id));
            type_index
                .entry(entity.ifc_type.clone())
                .or_default()
                .push(EntityId(id));
            slots.insert(
                id,
                Slot {
                    entity,
                    raw: Some(content[start..end].to_string()),
                    dirty: false,
                },
            );
        }

        let prologue_end = first_start
            .unwrap_or_else(|| content.find("DATA;").map(|p| p + 6).unwrap_or(0));
        let prologue = content[..prologue_end].to_string();
        let epilogue = if last_end > 0 {
            content[last_end..].trim_start_matches(['\r', '\n']).to_string()
        } else {
            content[prologue_end..].to_string()
        };

        Ok(Self {
            prologue,
            epilogue,
            order,
            slots,
            type_index,
            next_id,
            schema: schema_version(content),
        })
    }

    /// Schema version from the file header, when present
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Total entity count
    pub fn entity_count(&self) -> usize {
        self.order.len()
    }

    /// All entity IDs of the given kind, in declaration order
    pub fn entities_of_kind(&self, ifc_type: &IfcType) -> Vec<EntityId> {
        self.type_index.get(ifc_type).cloned().unwrap_or_default()
    }

    /// Count entities of the given kind
    pub fn count_of_kind(&self, ifc_type: &IfcType) -> usize {
        self.type_index.get(ifc_type).map(|v| v.len()).unwrap_or(0)
    }

    /// Read access to an entity
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(&id.0).map(|s| &s.entity)
    }

    /// Mutable access to an entity; marks it dirty so it is re-encoded
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots.get_mut(&id.0).map(|s| {
            s.dirty = true;
            &mut s.entity
        })
    }

    /// Create a new entity of the given kind
    pub fn create(&mut self, ifc_type: IfcType, attributes: Vec<AttributeValue>) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        self.order.push(id);
        self.type_index
            .entry(ifc_type.clone())
            .or_default()
            .push(id);
        self.slots.insert(
            id.0,
            Slot {
                entity: Entity {
                    id,
                    ifc_type,
                    attributes,
                },
                raw: None,
                dirty: true,
            },
        );
        id
    }

    /// Serialize the model to STEP source text
    pub fn to_step(&self) -> String {
        let mut out = String::with_capacity(self.prologue.len() + self.order.len() * 64);
        out.push_str(&self.prologue);
        if !out.ends_with('\n') {
            out.push('\n');
        }
        for id in &self.order {
            if let Some(slot) = self.slots.get(&id.0) {
                match (&slot.raw, slot.dirty) {
                    (Some(raw), false) => out.push_str(raw),
                    _ => out.push_str(&slot.entity.encode_step()),
                }
                out.push('\n');
            }
        }
        out.push_str(&self.epilogue);
        out
    }

    /// Persist the model; a single write at the very end of a run
    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_step())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION((''),'2;1');
FILE_NAME('test.ifc','2024-01-01T00:00:00',('Author'),('Org'),'','','');
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCPROJECT('guid',$,'Project',$,$,$,$,$,$);
#2=IFCWALLSTANDARDCASE('guid2',$,'Insulation Wall',$,$,$,$,$);
#3=IFCWALL('guid3',$,'Plain Wall',$,$,$,$,$);
#4=IFCMATERIAL('Glasswool',$,$);
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_parse_counts_and_order() {
        let model = GraphModel::parse(TEST_IFC).unwrap();
        assert_eq!(model.entity_count(), 4);
        assert_eq!(model.schema(), Some("IFC4"));
        assert_eq!(
            model.entities_of_kind(&IfcType::IfcWall),
            vec![EntityId(3)]
        );
    }

    #[test]
    fn test_roundtrip_is_byte_identical_when_untouched() {
        let model = GraphModel::parse(TEST_IFC).unwrap();
        assert_eq!(model.to_step(), TEST_IFC);
    }

    #[test]
    fn test_create_appends_after_existing_entities() {
        let mut model = GraphModel::parse(TEST_IFC).unwrap();
        let id = model.create(
            IfcType::IfcDocumentInformation,
            vec![AttributeValue::string("DOC"); 2],
        );
        assert_eq!(id, EntityId(5));
        let out = model.to_step();
        assert!(out.contains("#5=IFCDOCUMENTINFORMATION('DOC','DOC');"));
        // Created entity lands between the last original entity and ENDSEC
        let pos_new = out.find("#5=").unwrap();
        let pos_end = out.find("ENDSEC;\nEND-ISO").unwrap();
        assert!(out.find("#4=").unwrap() < pos_new && pos_new < pos_end);
    }

    #[test]
    fn test_mutation_marks_dirty_and_reencodes() {
        let mut model = GraphModel::parse(TEST_IFC).unwrap();
        model
            .entity_mut(EntityId(4))
            .unwrap()
            .set(2, AttributeValue::string("Insulation"));
        let out = model.to_step();
        assert!(out.contains("#4=IFCMATERIAL('Glasswool',$,'Insulation');"));
        // Untouched entities keep their original bytes
        assert!(out.contains("#2=IFCWALLSTANDARDCASE('guid2',$,'Insulation Wall',$,$,$,$,$);"));
    }

    #[test]
    fn test_open_missing_file_is_io_error() {
        let err = GraphModel::open(Path::new("/nonexistent/model.ifc")).unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }
}
