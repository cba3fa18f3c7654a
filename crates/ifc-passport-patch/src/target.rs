// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Component targeting resolver
//!
//! Maps a logical component key from the mapping table to the graph elements
//! (or, for timber, materials) the patch applies to. Resolution follows a
//! fixed fallback chain; results keep graph declaration order so reruns are
//! stable.

use ifc_passport_model::{EntityId, IfcType};
use ifc_passport_store::GraphModel;

/// Logical component key from the mapping table
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    Insulation,
    Pipe,
    Timber,
    Other(String),
}

impl Component {
    /// Parse a component cell, case-insensitively
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "insulation" => Component::Insulation,
            "pipe" => Component::Pipe,
            "timber" => Component::Timber,
            other => Component::Other(other.to_string()),
        }
    }

    /// Canonical lowercase key
    pub fn key(&self) -> &str {
        match self {
            Component::Insulation => "insulation",
            Component::Pipe => "pipe",
            Component::Timber => "timber",
            Component::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A resolved patch target
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchTarget {
    Element(EntityId),
    Material(EntityId),
}

impl PatchTarget {
    /// Underlying entity ID
    pub fn id(&self) -> EntityId {
        match self {
            PatchTarget::Element(id) | PatchTarget::Material(id) => *id,
        }
    }
}

/// Name tags that mark a material as wood/timber
const WOOD_TAGS: &[&str] = &["wood", "glulam", "timber", "bsh"];

/// Material names that identify the timber product when no structural
/// element carries it
const TIMBER_MATERIAL_NAMES: &[&str] = &["glulam", "brettschichtholz", "schilliger"];

/// Resolve a component key to its ordered target list
pub fn resolve_targets(model: &GraphModel, component: &Component) -> Vec<PatchTarget> {
    match component {
        Component::Insulation => {
            let mut walls = model.entities_of_kind(&IfcType::IfcWallStandardCase);
            walls.extend(model.entities_of_kind(&IfcType::IfcWall));
            let named: Vec<EntityId> = walls
                .iter()
                .copied()
                .filter(|id| element_name_contains(model, *id, "insulation"))
                .collect();
            let chosen = if named.is_empty() { walls } else { named };
            chosen.into_iter().map(PatchTarget::Element).collect()
        }
        Component::Pipe => model
            .entities_of_kind(&IfcType::IfcPipeSegment)
            .into_iter()
            .map(PatchTarget::Element)
            .collect(),
        Component::Timber => resolve_timber(model),
        Component::Other(_) => Vec::new(),
    }
}

/// Timber fallback chain: structural members narrowed to wood materials,
/// then a material named like the timber product, then any wall
fn resolve_timber(model: &GraphModel) -> Vec<PatchTarget> {
    let mut elements = model.entities_of_kind(&IfcType::IfcColumn);
    elements.extend(model.entities_of_kind(&IfcType::IfcBeam));
    elements.extend(model.entities_of_kind(&IfcType::IfcMember));

    if !elements.is_empty() {
        let wood: Vec<EntityId> = elements
            .iter()
            .copied()
            .filter(|id| {
                element_materials(model, *id)
                    .iter()
                    .any(|m| is_wood_material(model, *m))
            })
            .collect();
        let chosen = if wood.is_empty() { elements } else { wood };
        return chosen.into_iter().map(PatchTarget::Element).collect();
    }

    let by_name: Vec<PatchTarget> = model
        .entities_of_kind(&IfcType::IfcMaterial)
        .into_iter()
        .filter(|id| {
            let name = material_text(model, *id, 0);
            TIMBER_MATERIAL_NAMES.iter().any(|tag| name.contains(tag))
        })
        .map(PatchTarget::Material)
        .collect();
    if !by_name.is_empty() {
        return by_name;
    }

    let mut walls = model.entities_of_kind(&IfcType::IfcWallStandardCase);
    walls.extend(model.entities_of_kind(&IfcType::IfcWall));
    walls.into_iter().map(PatchTarget::Element).collect()
}

/// Case-insensitive substring test on an element's Name attribute
fn element_name_contains(model: &GraphModel, id: EntityId, needle: &str) -> bool {
    model
        .entity(id)
        .and_then(|e| e.get_string(2))
        .map(|n| n.to_lowercase().contains(needle))
        .unwrap_or(false)
}

/// Lowercased string attribute of a material-family entity
fn material_text(model: &GraphModel, id: EntityId, index: usize) -> String {
    model
        .entity(id)
        .and_then(|e| e.get_string(index))
        .unwrap_or_default()
        .to_lowercase()
}

/// Wood tag test on a base material's name and category
pub fn is_wood_material(model: &GraphModel, material: EntityId) -> bool {
    let text = format!(
        "{} {}",
        material_text(model, material, 0),
        material_text(model, material, 2)
    );
    WOOD_TAGS.iter().any(|tag| text.contains(tag))
}

/// All base materials associated with an element
///
/// Scans IfcRelAssociatesMaterial records and dereferences each relating
/// material definition down to plain IfcMaterial entities.
pub fn element_materials(model: &GraphModel, element: EntityId) -> Vec<EntityId> {
    let mut materials = Vec::new();
    for rel_id in model.entities_of_kind(&IfcType::IfcRelAssociatesMaterial) {
        let Some(rel) = model.entity(rel_id) else {
            continue;
        };
        if !rel.get_refs(4).contains(&element) {
            continue;
        }
        if let Some(def) = rel.get_ref(5) {
            collect_base_materials(model, def, &mut materials);
        }
    }
    materials
}

/// Dereference a material definition transitively to its base materials
///
/// Profile-set and layer-set usages point at their set, sets point at their
/// members, members point at one IfcMaterial.
pub fn collect_base_materials(model: &GraphModel, def: EntityId, out: &mut Vec<EntityId>) {
    let Some(entity) = model.entity(def) else {
        return;
    };
    match entity.ifc_type {
        IfcType::IfcMaterial => out.push(def),
        IfcType::IfcMaterialLayerSetUsage | IfcType::IfcMaterialProfileSetUsage => {
            if let Some(set) = entity.get_ref(0) {
                collect_base_materials(model, set, out);
            }
        }
        IfcType::IfcMaterialLayerSet | IfcType::IfcMaterialList => {
            for member in entity.get_refs(0) {
                collect_base_materials(model, member, out);
            }
        }
        IfcType::IfcMaterialProfileSet | IfcType::IfcMaterialConstituentSet => {
            for member in entity.get_refs(2) {
                collect_base_materials(model, member, out);
            }
        }
        IfcType::IfcMaterialLayer => {
            if let Some(material) = entity.get_ref(0) {
                collect_base_materials(model, material, out);
            }
        }
        IfcType::IfcMaterialProfile | IfcType::IfcMaterialConstituent => {
            if let Some(material) = entity.get_ref(2) {
                collect_base_materials(model, material, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_SCHEMA(('IFC4'));
ENDSEC;
DATA;
#1=IFCWALLSTANDARDCASE('g1',$,'Insulation Wall',$,$,$,$,$);
#2=IFCWALL('g2',$,'Core Wall',$,$,$,$,$);
#3=IFCPIPESEGMENT('g3',$,'Sewage Pipe DN110',$,$,$,$,$);
#4=IFCMATERIAL('Schilliger Glulam GL24h',$,$);
#5=IFCMATERIAL('Glasswool',$,'Insulation');
#6=IFCMATERIALLAYER(#5,100.,$,$,$,$,$);
#7=IFCMATERIALLAYERSET((#6),'Wall Layers',$);
#8=IFCMATERIALLAYERSETUSAGE(#7,.AXIS2.,.POSITIVE.,0.,$);
#9=IFCRELASSOCIATESMATERIAL('g9',$,$,$,(#1),#8);
ENDSEC;
END-ISO-10303-21;
"#;

    fn model() -> GraphModel {
        GraphModel::parse(TEST_IFC).unwrap()
    }

    #[test]
    fn test_insulation_narrows_by_name() {
        let targets = resolve_targets(&model(), &Component::Insulation);
        assert_eq!(targets, vec![PatchTarget::Element(EntityId(1))]);
    }

    #[test]
    fn test_pipe_targets_pipe_segments() {
        let targets = resolve_targets(&model(), &Component::Pipe);
        assert_eq!(targets, vec![PatchTarget::Element(EntityId(3))]);
    }

    #[test]
    fn test_timber_falls_back_to_named_material() {
        // No member/beam/column in the fixture, but a glulam material exists
        let targets = resolve_targets(&model(), &Component::Timber);
        assert_eq!(targets, vec![PatchTarget::Material(EntityId(4))]);
    }

    #[test]
    fn test_layer_set_usage_dereferences_to_base_material() {
        let m = model();
        let mats = element_materials(&m, EntityId(1));
        assert_eq!(mats, vec![EntityId(5)]);
    }

    #[test]
    fn test_wood_tag_matches_name_and_category() {
        let m = model();
        assert!(is_wood_material(&m, EntityId(4)));
        assert!(!is_wood_material(&m, EntityId(5)));
    }

    #[test]
    fn test_unknown_component_resolves_to_nothing() {
        let targets = resolve_targets(&model(), &Component::parse("facade"));
        assert!(targets.is_empty());
    }
}
