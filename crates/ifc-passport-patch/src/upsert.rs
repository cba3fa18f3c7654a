// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity deduplicating upsert layer
//!
//! The idempotency core. Every entity kind the patcher creates has a match
//! key (property set: owning target + name; document information: canonical
//! URL; document reference: referenced information or same URL;
//! classification reference: URI + identification + name). Upserts search for
//! a match first, upgrade placeholder fields on reuse, and only create when
//! nothing matches. Relationships are guarded by an index keyed on
//! (kind, relating, related) seeded from the pre-existing graph, so repeated
//! runs converge to a fixed graph.

use crate::target::PatchTarget;
use ifc_passport_model::{new_global_id, AttributeValue, EntityId, IfcType};
use ifc_passport_store::GraphModel;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Relationship kinds tracked by the dedup index
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum RelKind {
    DefinesByProperties,
    AssociatesDocument,
    AssociatesClassification,
    ReferencesResource,
}

/// Placeholder values eligible for overwrite on reuse
fn is_generic_label(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "" | "*" | "datasource" | "external" | "1.0.0" | "1.0"
        ),
    }
}

/// Percent-decode a URL path segment; malformed escapes pass through
fn percent_decode(segment: &str) -> String {
    fn hex_digit(b: u8) -> Option<u8> {
        (b as char).to_digit(16).map(|d| d as u8)
    }
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push(hi * 16 + lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Identification fallback chain: explicit value, last URL path segment
/// (percent-decoded), host, display name
pub fn derive_identification(
    identification: Option<&str>,
    url: &str,
    fallback_name: &str,
) -> String {
    if let Some(ident) = identification {
        if !ident.trim().is_empty() {
            return ident.trim().to_string();
        }
    }
    let rest = url.split("://").nth(1).unwrap_or(url);
    let (host, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };
    let last = percent_decode(path.rsplit('/').next().unwrap_or(""));
    if !last.is_empty() {
        return last;
    }
    if !host.is_empty() {
        return host.to_string();
    }
    if !fallback_name.is_empty() {
        return fallback_name.to_string();
    }
    "DOC".to_string()
}

/// Find-or-create layer over one graph
pub struct Upserter<'a> {
    model: &'a mut GraphModel,
    rel_index: FxHashSet<(RelKind, u32, u32)>,
    /// Canonical document URLs already linked to each target
    doc_urls_by_target: FxHashMap<u32, FxHashSet<String>>,
    owner_history: Option<EntityId>,
}

impl<'a> Upserter<'a> {
    /// Build the relationship index from the graph's existing links
    pub fn new(model: &'a mut GraphModel) -> Self {
        let mut rel_index = FxHashSet::default();
        let mut doc_urls_by_target: FxHashMap<u32, FxHashSet<String>> = FxHashMap::default();

        let kinds = [
            (IfcType::IfcRelDefinesByProperties, RelKind::DefinesByProperties),
            (IfcType::IfcRelAssociatesDocument, RelKind::AssociatesDocument),
            (
                IfcType::IfcRelAssociatesClassification,
                RelKind::AssociatesClassification,
            ),
        ];
        for (ifc_type, kind) in kinds {
            for rel_id in model.entities_of_kind(&ifc_type) {
                let Some(rel) = model.entity(rel_id) else {
                    continue;
                };
                let Some(relating) = rel.get_ref(5) else {
                    continue;
                };
                let related = rel.get_refs(4);
                for target in &related {
                    rel_index.insert((kind, relating.0, target.0));
                }
                if kind == RelKind::AssociatesDocument {
                    let url = model
                        .entity(relating)
                        .and_then(|r| r.get_string(0))
                        .unwrap_or_default()
                        .trim()
                        .to_string();
                    if !url.is_empty() {
                        for target in &related {
                            doc_urls_by_target
                                .entry(target.0)
                                .or_default()
                                .insert(url.clone());
                        }
                    }
                }
            }
        }
        for rel_id in model.entities_of_kind(&IfcType::IfcExternalReferenceRelationship) {
            let Some(rel) = model.entity(rel_id) else {
                continue;
            };
            let Some(relating) = rel.get_ref(2) else {
                continue;
            };
            for resource in rel.get_refs(3) {
                rel_index.insert((RelKind::ReferencesResource, relating.0, resource.0));
            }
        }

        Upserter {
            model,
            rel_index,
            doc_urls_by_target,
            owner_history: None,
        }
    }

    /// Borrow the underlying graph
    pub fn model(&self) -> &GraphModel {
        self.model
    }

    /// Reuse the model's owner history, creating the ownership chain once
    /// when the model has none
    pub fn owner_history(&mut self) -> EntityId {
        if let Some(oh) = self.owner_history {
            return oh;
        }
        if let Some(&existing) = self
            .model
            .entities_of_kind(&IfcType::IfcOwnerHistory)
            .first()
        {
            self.owner_history = Some(existing);
            return existing;
        }
        let person = self.model.create(
            IfcType::IfcPerson,
            vec![AttributeValue::Null; 8],
        );
        let org = self.model.create(
            IfcType::IfcOrganization,
            vec![
                AttributeValue::Null,
                AttributeValue::string("IFC-Passport"),
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::Null,
            ],
        );
        let person_org = self.model.create(
            IfcType::IfcPersonAndOrganization,
            vec![
                AttributeValue::EntityRef(person),
                AttributeValue::EntityRef(org),
                AttributeValue::Null,
            ],
        );
        let app = self.model.create(
            IfcType::IfcApplication,
            vec![
                AttributeValue::EntityRef(org),
                AttributeValue::string(env!("CARGO_PKG_VERSION")),
                AttributeValue::string("IFC-Passport Patcher"),
                AttributeValue::string("ifc-passport-patch"),
            ],
        );
        let oh = self.model.create(
            IfcType::IfcOwnerHistory,
            vec![
                AttributeValue::EntityRef(person_org),
                AttributeValue::EntityRef(app),
                AttributeValue::Null,
                AttributeValue::Enum("NOCHANGE".to_string()),
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::Integer(0),
            ],
        );
        self.owner_history = Some(oh);
        oh
    }

    /// Find or create the named property container on a target
    ///
    /// Elements get an IfcPropertySet wired through
    /// IfcRelDefinesByProperties; materials get IfcMaterialProperties, which
    /// points at its material directly.
    pub fn find_or_create_pset(&mut self, target: PatchTarget, name: &str) -> EntityId {
        match target {
            PatchTarget::Element(element) => self.find_or_create_element_pset(element, name),
            PatchTarget::Material(material) => {
                self.find_or_create_material_pset(material, name)
            }
        }
    }

    fn find_or_create_element_pset(&mut self, element: EntityId, name: &str) -> EntityId {
        for rel_id in self
            .model
            .entities_of_kind(&IfcType::IfcRelDefinesByProperties)
        {
            let Some(rel) = self.model.entity(rel_id) else {
                continue;
            };
            if !rel.get_refs(4).contains(&element) {
                continue;
            }
            let Some(pset_id) = rel.get_ref(5) else {
                continue;
            };
            let Some(pset) = self.model.entity(pset_id) else {
                continue;
            };
            if pset.ifc_type == IfcType::IfcPropertySet && pset.get_string(2) == Some(name) {
                return pset_id;
            }
        }
        let owner = self.owner_history();
        let pset = self.model.create(
            IfcType::IfcPropertySet,
            vec![
                AttributeValue::string(new_global_id()),
                AttributeValue::EntityRef(owner),
                AttributeValue::string(name),
                AttributeValue::Null,
                AttributeValue::List(Vec::new()),
            ],
        );
        let rel = self.model.create(
            IfcType::IfcRelDefinesByProperties,
            vec![
                AttributeValue::string(new_global_id()),
                AttributeValue::EntityRef(owner),
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::List(vec![AttributeValue::EntityRef(element)]),
                AttributeValue::EntityRef(pset),
            ],
        );
        self.rel_index
            .insert((RelKind::DefinesByProperties, pset.0, element.0));
        debug!(pset = %pset, rel = %rel, %element, name, "created property set");
        pset
    }

    fn find_or_create_material_pset(&mut self, material: EntityId, name: &str) -> EntityId {
        for pset_id in self.model.entities_of_kind(&IfcType::IfcMaterialProperties) {
            let Some(pset) = self.model.entity(pset_id) else {
                continue;
            };
            if pset.get_ref(3) == Some(material) && pset.get_string(0) == Some(name) {
                return pset_id;
            }
        }
        let pset = self.model.create(
            IfcType::IfcMaterialProperties,
            vec![
                AttributeValue::string(name),
                AttributeValue::Null,
                AttributeValue::List(Vec::new()),
                AttributeValue::EntityRef(material),
            ],
        );
        debug!(pset = %pset, %material, name, "created material property set");
        pset
    }

    /// Upsert a single-value property inside a property container
    ///
    /// Matching is by property name within the container. An existing
    /// property gets its nominal value overwritten, and its description is
    /// replaced whenever one is passed. When the description is an HTTP(S)
    /// URI it is additionally exposed as a classification reference linked
    /// to the property.
    pub fn upsert_single_value(
        &mut self,
        pset: EntityId,
        name: &str,
        value: AttributeValue,
        description: Option<&str>,
    ) -> EntityId {
        let list_index = match self.model.entity(pset).map(|e| e.ifc_type.clone()) {
            Some(IfcType::IfcMaterialProperties) => 2,
            _ => 4,
        };
        let members: Vec<EntityId> = self
            .model
            .entity(pset)
            .map(|e| e.get_refs(list_index))
            .unwrap_or_default();
        let existing = members.into_iter().find(|id| {
            self.model
                .entity(*id)
                .map(|p| {
                    p.ifc_type == IfcType::IfcPropertySingleValue && p.get_string(0) == Some(name)
                })
                .unwrap_or(false)
        });

        let prop = match existing {
            Some(prop_id) => {
                if let Some(prop) = self.model.entity_mut(prop_id) {
                    prop.set(2, value);
                    if let Some(desc) = description {
                        prop.set(1, AttributeValue::string(desc));
                    }
                }
                prop_id
            }
            None => {
                let prop = self.model.create(
                    IfcType::IfcPropertySingleValue,
                    vec![
                        AttributeValue::string(name),
                        AttributeValue::opt_string(description),
                        value,
                        AttributeValue::Null,
                    ],
                );
                if let Some(container) = self.model.entity_mut(pset) {
                    container.push_to_list(list_index, AttributeValue::EntityRef(prop));
                }
                prop
            }
        };

        if let Some(uri) = description.filter(|d| d.starts_with("http")) {
            let concept_name = format!("bSDD property: {name}");
            let reference =
                self.get_or_create_classification_ref(uri, None, Some(&concept_name));
            self.link_reference_to_resource(prop, reference);
        }
        prop
    }

    /// Find or create the canonical document identity for a URL
    ///
    /// Unique per URL. On reuse, generic placeholder names and
    /// identifications are upgraded and a missing description is filled in.
    pub fn get_or_create_doc_info(
        &mut self,
        url: &str,
        name: &str,
        identification: Option<&str>,
        description: Option<&str>,
    ) -> EntityId {
        let url = url.trim();
        for info_id in self.model.entities_of_kind(&IfcType::IfcDocumentInformation) {
            let Some(info) = self.model.entity(info_id) else {
                continue;
            };
            if info.get_string(3).map(str::trim) != Some(url) {
                continue;
            }
            let upgrade_name = !name.is_empty() && is_generic_label(info.get_string(1));
            let upgrade_desc = description.is_some() && info.get_string(2).is_none();
            let upgrade_ident =
                identification.is_some() && is_generic_label(info.get_string(0));
            if let Some(info) = self.model.entity_mut(info_id) {
                if upgrade_name {
                    info.set(1, AttributeValue::string(name));
                }
                if upgrade_desc {
                    info.set(2, AttributeValue::opt_string(description));
                }
                if upgrade_ident {
                    info.set(0, AttributeValue::opt_string(identification));
                }
            }
            return info_id;
        }

        let ident = derive_identification(identification, url, name);
        let mut attributes = vec![AttributeValue::Null; 17];
        attributes[0] = AttributeValue::string(ident);
        attributes[1] = AttributeValue::string(name);
        attributes[2] = AttributeValue::opt_string(description);
        attributes[3] = AttributeValue::string(url);
        self.model.create(IfcType::IfcDocumentInformation, attributes)
    }

    /// Find or create the document reference pointing at an identity
    ///
    /// Matches by the referenced identity or by the same canonical URL;
    /// placeholder fields upgrade on reuse and a dangling reference is
    /// re-pointed at the identity.
    pub fn get_or_create_doc_ref(
        &mut self,
        info: EntityId,
        name: Option<&str>,
        identification: Option<&str>,
        description: Option<&str>,
    ) -> EntityId {
        let info_url = self
            .model
            .entity(info)
            .and_then(|e| e.get_string(3))
            .unwrap_or_default()
            .trim()
            .to_string();
        let info_name = self
            .model
            .entity(info)
            .and_then(|e| e.get_string(1))
            .unwrap_or_default()
            .to_string();

        for ref_id in self.model.entities_of_kind(&IfcType::IfcDocumentReference) {
            let Some(doc_ref) = self.model.entity(ref_id) else {
                continue;
            };
            let same_info = doc_ref.get_ref(4) == Some(info);
            let same_url = !info_url.is_empty()
                && doc_ref.get_string(0).map(str::trim) == Some(info_url.as_str());
            if !same_info && !same_url {
                continue;
            }
            let upgrade_name =
                name.is_some_and(|n| !n.is_empty()) && is_generic_label(doc_ref.get_string(2));
            let upgrade_ident =
                identification.is_some() && is_generic_label(doc_ref.get_string(1));
            let upgrade_desc = description.is_some() && doc_ref.get_string(3).is_none();
            let repoint = doc_ref.get_ref(4).is_none();
            if let Some(doc_ref) = self.model.entity_mut(ref_id) {
                if upgrade_name {
                    doc_ref.set(2, AttributeValue::opt_string(name));
                }
                if upgrade_ident {
                    doc_ref.set(1, AttributeValue::opt_string(identification));
                }
                if upgrade_desc {
                    doc_ref.set(3, AttributeValue::opt_string(description));
                }
                if repoint {
                    doc_ref.set(4, AttributeValue::EntityRef(info));
                }
            }
            return ref_id;
        }

        let display_name = name.filter(|n| !n.is_empty()).unwrap_or(&info_name);
        let ident = derive_identification(identification, &info_url, display_name);
        self.model.create(
            IfcType::IfcDocumentReference,
            vec![
                AttributeValue::string(info_url.clone()),
                AttributeValue::string(ident),
                AttributeValue::string(display_name),
                AttributeValue::opt_string(description),
                AttributeValue::EntityRef(info),
            ],
        )
    }

    /// Find or create a classification reference by (URI, identification,
    /// name)
    pub fn get_or_create_classification_ref(
        &mut self,
        uri: &str,
        identification: Option<&str>,
        name: Option<&str>,
    ) -> EntityId {
        for ref_id in self
            .model
            .entities_of_kind(&IfcType::IfcClassificationReference)
        {
            let Some(reference) = self.model.entity(ref_id) else {
                continue;
            };
            if reference.get_string(0).map(str::trim) == Some(uri.trim())
                && reference.get_string(1) == identification
                && reference.get_string(2) == name
            {
                return ref_id;
            }
        }
        self.model.create(
            IfcType::IfcClassificationReference,
            vec![
                AttributeValue::string(uri),
                AttributeValue::opt_string(identification),
                AttributeValue::opt_string(name),
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::Null,
            ],
        )
    }

    /// Attach a document reference to an element
    ///
    /// Skipped when the same reference, or any reference carrying the same
    /// canonical URL, is already linked to the element.
    pub fn attach_doc(&mut self, element: EntityId, doc_ref: EntityId) {
        let url = self
            .model
            .entity(doc_ref)
            .and_then(|r| r.get_string(0))
            .unwrap_or_default()
            .trim()
            .to_string();
        if self
            .rel_index
            .contains(&(RelKind::AssociatesDocument, doc_ref.0, element.0))
        {
            return;
        }
        if !url.is_empty()
            && self
                .doc_urls_by_target
                .get(&element.0)
                .is_some_and(|urls| urls.contains(&url))
        {
            return;
        }
        let owner = self.owner_history();
        self.model.create(
            IfcType::IfcRelAssociatesDocument,
            vec![
                AttributeValue::string(new_global_id()),
                AttributeValue::EntityRef(owner),
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::List(vec![AttributeValue::EntityRef(element)]),
                AttributeValue::EntityRef(doc_ref),
            ],
        );
        self.rel_index
            .insert((RelKind::AssociatesDocument, doc_ref.0, element.0));
        if !url.is_empty() {
            self.doc_urls_by_target
                .entry(element.0)
                .or_default()
                .insert(url);
        }
    }

    /// Associate a classification reference to an element
    pub fn associate_classification(&mut self, element: EntityId, reference: EntityId) {
        if self
            .rel_index
            .contains(&(RelKind::AssociatesClassification, reference.0, element.0))
        {
            return;
        }
        let owner = self.owner_history();
        self.model.create(
            IfcType::IfcRelAssociatesClassification,
            vec![
                AttributeValue::string(new_global_id()),
                AttributeValue::EntityRef(owner),
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::List(vec![AttributeValue::EntityRef(element)]),
                AttributeValue::EntityRef(reference),
            ],
        );
        self.rel_index
            .insert((RelKind::AssociatesClassification, reference.0, element.0));
    }

    /// Link an external reference to a resource-level object (a material or
    /// a property)
    pub fn link_reference_to_resource(&mut self, resource: EntityId, reference: EntityId) {
        if self
            .rel_index
            .contains(&(RelKind::ReferencesResource, reference.0, resource.0))
        {
            return;
        }
        self.model.create(
            IfcType::IfcExternalReferenceRelationship,
            vec![
                AttributeValue::Null,
                AttributeValue::Null,
                AttributeValue::EntityRef(reference),
                AttributeValue::List(vec![AttributeValue::EntityRef(resource)]),
            ],
        );
        self.rel_index
            .insert((RelKind::ReferencesResource, reference.0, resource.0));
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
#2=IFCMATERIAL('Glasswool',$,'Insulation');
ENDSEC;
END-ISO-10303-21;
"#;

    fn model() -> GraphModel {
        GraphModel::parse(TEST_IFC).unwrap()
    }

    #[test]
    fn test_pset_created_once_per_element_and_name() {
        let mut m = model();
        let mut up = Upserter::new(&mut m);
        let element = PatchTarget::Element(EntityId(1));
        let a = up.find_or_create_pset(element, "CPset_Insulation_Performance");
        let b = up.find_or_create_pset(element, "CPset_Insulation_Performance");
        assert_eq!(a, b);
        assert_eq!(m.count_of_kind(&IfcType::IfcPropertySet), 1);
        assert_eq!(m.count_of_kind(&IfcType::IfcRelDefinesByProperties), 1);
    }

    #[test]
    fn test_pset_index_survives_a_rescan() {
        // Simulates a second run: a fresh upserter over the mutated graph
        let mut m = model();
        let element = PatchTarget::Element(EntityId(1));
        let first = Upserter::new(&mut m).find_or_create_pset(element, "CPset_X");
        let second = Upserter::new(&mut m).find_or_create_pset(element, "CPset_X");
        assert_eq!(first, second);
        assert_eq!(m.count_of_kind(&IfcType::IfcPropertySet), 1);
    }

    #[test]
    fn test_material_pset_points_at_material() {
        let mut m = model();
        let mut up = Upserter::new(&mut m);
        let pset = up.find_or_create_pset(
            PatchTarget::Material(EntityId(2)),
            "CPset_Timber_Performance",
        );
        let entity = m.entity(pset).unwrap();
        assert_eq!(entity.ifc_type, IfcType::IfcMaterialProperties);
        assert_eq!(entity.get_ref(3), Some(EntityId(2)));
    }

    #[test]
    fn test_upsert_single_value_overwrites_in_place() {
        let mut m = model();
        let mut up = Upserter::new(&mut m);
        let pset = up.find_or_create_pset(PatchTarget::Element(EntityId(1)), "CPset_X");
        let a = up.upsert_single_value(pset, "CP_Density", AttributeValue::Float(30.0), None);
        let b = up.upsert_single_value(pset, "CP_Density", AttributeValue::Float(35.0), None);
        assert_eq!(a, b);
        assert_eq!(m.count_of_kind(&IfcType::IfcPropertySingleValue), 1);
        assert_eq!(m.entity(a).unwrap().get_float(2), Some(35.0));
    }

    #[test]
    fn test_uri_description_links_property_to_concept() {
        let mut m = model();
        let mut up = Upserter::new(&mut m);
        let pset = up.find_or_create_pset(PatchTarget::Element(EntityId(1)), "CPset_X");
        let uri = "https://bsdd.example/prop/density";
        up.upsert_single_value(pset, "CP_Density", AttributeValue::Float(30.0), Some(uri));
        up.upsert_single_value(pset, "CP_Density", AttributeValue::Float(30.0), Some(uri));
        assert_eq!(m.count_of_kind(&IfcType::IfcClassificationReference), 1);
        assert_eq!(
            m.count_of_kind(&IfcType::IfcExternalReferenceRelationship),
            1
        );
    }

    #[test]
    fn test_doc_info_unique_per_url_with_placeholder_upgrade() {
        let mut m = model();
        let mut up = Upserter::new(&mut m);
        let a = up.get_or_create_doc_info("http://x/doc.pdf", "datasource", None, None);
        let b = up.get_or_create_doc_info(
            "http://x/doc.pdf",
            "Product Datasheet",
            Some("DS-01"),
            Some("datasheet"),
        );
        assert_eq!(a, b);
        let info = m.entity(a).unwrap();
        assert_eq!(info.get_string(1), Some("Product Datasheet"));
        // The URL-derived identification is specific, so it is retained
        assert_eq!(info.get_string(0), Some("doc.pdf"));
        assert_eq!(info.get_string(2), Some("datasheet"));
    }

    #[test]
    fn test_doc_info_generic_identification_upgrades() {
        let mut m = model();
        let mut attrs = vec![AttributeValue::Null; 17];
        attrs[0] = AttributeValue::string("*");
        attrs[1] = AttributeValue::string("Doc");
        attrs[3] = AttributeValue::string("http://x/doc.pdf");
        let seeded = m.create(IfcType::IfcDocumentInformation, attrs);

        let mut up = Upserter::new(&mut m);
        let found = up.get_or_create_doc_info("http://x/doc.pdf", "Doc", Some("DS-01"), None);
        assert_eq!(found, seeded);
        assert_eq!(m.entity(seeded).unwrap().get_string(0), Some("DS-01"));
    }

    #[test]
    fn test_doc_info_specific_name_is_not_overwritten() {
        let mut m = model();
        let mut up = Upserter::new(&mut m);
        let a = up.get_or_create_doc_info("http://x/doc.pdf", "EPD for Glasswool", None, None);
        up.get_or_create_doc_info("http://x/doc.pdf", "External Document", None, None);
        assert_eq!(m.entity(a).unwrap().get_string(1), Some("EPD for Glasswool"));
    }

    #[test]
    fn test_attach_doc_dedups_by_reference_and_url() {
        let mut m = model();
        let mut up = Upserter::new(&mut m);
        let info = up.get_or_create_doc_info("http://x/doc.pdf", "Doc", None, None);
        let r1 = up.get_or_create_doc_ref(info, None, None, None);
        up.attach_doc(EntityId(1), r1);
        up.attach_doc(EntityId(1), r1);
        assert_eq!(m.count_of_kind(&IfcType::IfcRelAssociatesDocument), 1);

        // Same URL through a second run is also suppressed
        let mut up = Upserter::new(&mut m);
        let info = up.get_or_create_doc_info("http://x/doc.pdf", "Doc", None, None);
        let r2 = up.get_or_create_doc_ref(info, None, None, None);
        up.attach_doc(EntityId(1), r2);
        assert_eq!(m.count_of_kind(&IfcType::IfcRelAssociatesDocument), 1);
    }

    #[test]
    fn test_classification_association_is_deduped() {
        let mut m = model();
        let mut up = Upserter::new(&mut m);
        let reference = up.get_or_create_classification_ref(
            "https://bsdd.example/class/insulation",
            None,
            Some("Mineral wool"),
        );
        up.associate_classification(EntityId(1), reference);
        up.associate_classification(EntityId(1), reference);
        up.link_reference_to_resource(EntityId(2), reference);
        up.link_reference_to_resource(EntityId(2), reference);
        assert_eq!(m.count_of_kind(&IfcType::IfcRelAssociatesClassification), 1);
        assert_eq!(
            m.count_of_kind(&IfcType::IfcExternalReferenceRelationship),
            1
        );
    }

    #[test]
    fn test_owner_history_created_once() {
        let mut m = model();
        let mut up = Upserter::new(&mut m);
        let a = up.owner_history();
        let b = up.owner_history();
        assert_eq!(a, b);
        assert_eq!(m.count_of_kind(&IfcType::IfcOwnerHistory), 1);
    }

    #[test]
    fn test_derive_identification_chain() {
        assert_eq!(
            derive_identification(Some(" DS-01 "), "http://x/doc.pdf", "n"),
            "DS-01"
        );
        assert_eq!(
            derive_identification(None, "http://x/files/Acoustic%20Batt.pdf", "n"),
            "Acoustic Batt.pdf"
        );
        assert_eq!(derive_identification(None, "http://host.example", "n"), "host.example");
        assert_eq!(derive_identification(None, "", "Fallback"), "Fallback");
        assert_eq!(derive_identification(None, "", ""), "DOC");
    }

    #[test]
    fn test_derive_identification_multibyte_and_malformed_escapes() {
        // A % not followed by two hex digits passes through untouched, even
        // next to multibyte characters
        assert_eq!(
            derive_identification(None, "http://x/files/a%€x.pdf", "n"),
            "a%€x.pdf"
        );
        assert_eq!(
            derive_identification(None, "http://x/files/caf%C3%A9.pdf", "n"),
            "café.pdf"
        );
        assert_eq!(
            derive_identification(None, "http://x/files/doc%2.pdf", "n"),
            "doc%2.pdf"
        );
    }
}
