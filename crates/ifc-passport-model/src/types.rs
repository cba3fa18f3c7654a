// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for IFC data representation
//!
//! Only the entity kinds the passport patcher reads, creates or links are
//! enumerated; everything else is carried through as [`IfcType::Unknown`] and
//! written back untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type-safe entity identifier
///
/// Wraps the raw IFC entity ID (e.g., #123 becomes EntityId(123))
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize, Default)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        EntityId(id)
    }
}

impl From<EntityId> for u32 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// IFC entity type enumeration
///
/// Covers the types the patch engine targets, dereferences or creates.
/// Unknown types are captured with their original string representation so
/// the rest of the graph survives a round trip untouched.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IfcType {
    // Spatial structure (read-only context)
    IfcProject,
    IfcSite,
    IfcBuilding,
    IfcBuildingStorey,

    // Building elements (patch targets)
    IfcWall,
    IfcWallStandardCase,
    IfcSlab,
    IfcRoof,
    IfcBeam,
    IfcColumn,
    IfcMember,
    IfcPlate,
    IfcCovering,
    IfcPipeSegment,
    IfcFlowSegment,
    IfcBuildingElementProxy,

    // Materials (dereferenced for targeting and classification linking)
    IfcMaterial,
    IfcMaterialLayer,
    IfcMaterialLayerSet,
    IfcMaterialLayerSetUsage,
    IfcMaterialProfile,
    IfcMaterialProfileSet,
    IfcMaterialProfileSetUsage,
    IfcMaterialConstituent,
    IfcMaterialConstituentSet,
    IfcMaterialList,
    IfcMaterialProperties,

    // Properties (created/upserted)
    IfcPropertySet,
    IfcPropertySingleValue,

    // Documents and classification (created/upserted)
    IfcDocumentInformation,
    IfcDocumentReference,
    IfcClassification,
    IfcClassificationReference,

    // Relationships (created/deduplicated)
    IfcRelDefinesByProperties,
    IfcRelAssociatesMaterial,
    IfcRelAssociatesDocument,
    IfcRelAssociatesClassification,
    IfcExternalReferenceRelationship,

    // Ownership (reused, created once when absent)
    IfcOwnerHistory,
    IfcPerson,
    IfcOrganization,
    IfcPersonAndOrganization,
    IfcApplication,

    /// Unknown type - stores the original type name string
    Unknown(String),
}

impl FromStr for IfcType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl IfcType {
    /// Parse a type name string into an IfcType
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "IFCPROJECT" => IfcType::IfcProject,
            "IFCSITE" => IfcType::IfcSite,
            "IFCBUILDING" => IfcType::IfcBuilding,
            "IFCBUILDINGSTOREY" => IfcType::IfcBuildingStorey,

            "IFCWALL" => IfcType::IfcWall,
            "IFCWALLSTANDARDCASE" => IfcType::IfcWallStandardCase,
            "IFCSLAB" => IfcType::IfcSlab,
            "IFCROOF" => IfcType::IfcRoof,
            "IFCBEAM" => IfcType::IfcBeam,
            "IFCCOLUMN" => IfcType::IfcColumn,
            "IFCMEMBER" => IfcType::IfcMember,
            "IFCPLATE" => IfcType::IfcPlate,
            "IFCCOVERING" => IfcType::IfcCovering,
            "IFCPIPESEGMENT" => IfcType::IfcPipeSegment,
            "IFCFLOWSEGMENT" => IfcType::IfcFlowSegment,
            "IFCBUILDINGELEMENTPROXY" => IfcType::IfcBuildingElementProxy,

            "IFCMATERIAL" => IfcType::IfcMaterial,
            "IFCMATERIALLAYER" => IfcType::IfcMaterialLayer,
            "IFCMATERIALLAYERSET" => IfcType::IfcMaterialLayerSet,
            "IFCMATERIALLAYERSETUSAGE" => IfcType::IfcMaterialLayerSetUsage,
            "IFCMATERIALPROFILE" => IfcType::IfcMaterialProfile,
            "IFCMATERIALPROFILESET" => IfcType::IfcMaterialProfileSet,
            "IFCMATERIALPROFILESETUSAGE" => IfcType::IfcMaterialProfileSetUsage,
            "IFCMATERIALCONSTITUENT" => IfcType::IfcMaterialConstituent,
            "IFCMATERIALCONSTITUENTSET" => IfcType::IfcMaterialConstituentSet,
            "IFCMATERIALLIST" => IfcType::IfcMaterialList,
            "IFCMATERIALPROPERTIES" => IfcType::IfcMaterialProperties,

            "IFCPROPERTYSET" => IfcType::IfcPropertySet,
            "IFCPROPERTYSINGLEVALUE" => IfcType::IfcPropertySingleValue,

            "IFCDOCUMENTINFORMATION" => IfcType::IfcDocumentInformation,
            "IFCDOCUMENTREFERENCE" => IfcType::IfcDocumentReference,
            "IFCCLASSIFICATION" => IfcType::IfcClassification,
            "IFCCLASSIFICATIONREFERENCE" => IfcType::IfcClassificationReference,

            "IFCRELDEFINESBYPROPERTIES" => IfcType::IfcRelDefinesByProperties,
            "IFCRELASSOCIATESMATERIAL" => IfcType::IfcRelAssociatesMaterial,
            "IFCRELASSOCIATESDOCUMENT" => IfcType::IfcRelAssociatesDocument,
            "IFCRELASSOCIATESCLASSIFICATION" => IfcType::IfcRelAssociatesClassification,
            "IFCEXTERNALREFERENCERELATIONSHIP" => IfcType::IfcExternalReferenceRelationship,

            "IFCOWNERHISTORY" => IfcType::IfcOwnerHistory,
            "IFCPERSON" => IfcType::IfcPerson,
            "IFCORGANIZATION" => IfcType::IfcOrganization,
            "IFCPERSONANDORGANIZATION" => IfcType::IfcPersonAndOrganization,
            "IFCAPPLICATION" => IfcType::IfcApplication,

            _ => IfcType::Unknown(s.to_uppercase()),
        }
    }

    /// Get the STEP keyword for this type
    ///
    /// Total over all variants so created entities can always be written.
    pub fn name(&self) -> &str {
        match self {
            IfcType::IfcProject => "IFCPROJECT",
            IfcType::IfcSite => "IFCSITE",
            IfcType::IfcBuilding => "IFCBUILDING",
            IfcType::IfcBuildingStorey => "IFCBUILDINGSTOREY",

            IfcType::IfcWall => "IFCWALL",
            IfcType::IfcWallStandardCase => "IFCWALLSTANDARDCASE",
            IfcType::IfcSlab => "IFCSLAB",
            IfcType::IfcRoof => "IFCROOF",
            IfcType::IfcBeam => "IFCBEAM",
            IfcType::IfcColumn => "IFCCOLUMN",
            IfcType::IfcMember => "IFCMEMBER",
            IfcType::IfcPlate => "IFCPLATE",
            IfcType::IfcCovering => "IFCCOVERING",
            IfcType::IfcPipeSegment => "IFCPIPESEGMENT",
            IfcType::IfcFlowSegment => "IFCFLOWSEGMENT",
            IfcType::IfcBuildingElementProxy => "IFCBUILDINGELEMENTPROXY",

            IfcType::IfcMaterial => "IFCMATERIAL",
            IfcType::IfcMaterialLayer => "IFCMATERIALLAYER",
            IfcType::IfcMaterialLayerSet => "IFCMATERIALLAYERSET",
            IfcType::IfcMaterialLayerSetUsage => "IFCMATERIALLAYERSETUSAGE",
            IfcType::IfcMaterialProfile => "IFCMATERIALPROFILE",
            IfcType::IfcMaterialProfileSet => "IFCMATERIALPROFILESET",
            IfcType::IfcMaterialProfileSetUsage => "IFCMATERIALPROFILESETUSAGE",
            IfcType::IfcMaterialConstituent => "IFCMATERIALCONSTITUENT",
            IfcType::IfcMaterialConstituentSet => "IFCMATERIALCONSTITUENTSET",
            IfcType::IfcMaterialList => "IFCMATERIALLIST",
            IfcType::IfcMaterialProperties => "IFCMATERIALPROPERTIES",

            IfcType::IfcPropertySet => "IFCPROPERTYSET",
            IfcType::IfcPropertySingleValue => "IFCPROPERTYSINGLEVALUE",

            IfcType::IfcDocumentInformation => "IFCDOCUMENTINFORMATION",
            IfcType::IfcDocumentReference => "IFCDOCUMENTREFERENCE",
            IfcType::IfcClassification => "IFCCLASSIFICATION",
            IfcType::IfcClassificationReference => "IFCCLASSIFICATIONREFERENCE",

            IfcType::IfcRelDefinesByProperties => "IFCRELDEFINESBYPROPERTIES",
            IfcType::IfcRelAssociatesMaterial => "IFCRELASSOCIATESMATERIAL",
            IfcType::IfcRelAssociatesDocument => "IFCRELASSOCIATESDOCUMENT",
            IfcType::IfcRelAssociatesClassification => "IFCRELASSOCIATESCLASSIFICATION",
            IfcType::IfcExternalReferenceRelationship => "IFCEXTERNALREFERENCERELATIONSHIP",

            IfcType::IfcOwnerHistory => "IFCOWNERHISTORY",
            IfcType::IfcPerson => "IFCPERSON",
            IfcType::IfcOrganization => "IFCORGANIZATION",
            IfcType::IfcPersonAndOrganization => "IFCPERSONANDORGANIZATION",
            IfcType::IfcApplication => "IFCAPPLICATION",

            IfcType::Unknown(s) => s,
        }
    }

    /// Check if this type is a wall kind (targeting fallback)
    pub fn is_wall(&self) -> bool {
        matches!(self, IfcType::IfcWall | IfcType::IfcWallStandardCase)
    }
}

impl Default for IfcType {
    fn default() -> Self {
        IfcType::Unknown(String::new())
    }
}

impl fmt::Display for IfcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Decoded attribute value
///
/// Represents any value that can appear in an IFC entity's attribute list.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum AttributeValue {
    /// Null value ($)
    #[default]
    Null,
    /// Derived value (*)
    Derived,
    /// Entity reference (#123)
    EntityRef(EntityId),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Enumeration value (.VALUE.)
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Typed value like IFCLABEL('text')
    TypedValue(String, Vec<AttributeValue>),
}

impl AttributeValue {
    /// Convenience constructor for string attributes
    pub fn string(s: impl Into<String>) -> Self {
        AttributeValue::String(s.into())
    }

    /// Optional string attribute: `None` becomes `$`
    pub fn opt_string(s: Option<&str>) -> Self {
        match s {
            Some(s) => AttributeValue::String(s.to_string()),
            None => AttributeValue::Null,
        }
    }

    /// Try to get as entity reference
    pub fn as_entity_ref(&self) -> Option<EntityId> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Try to get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::TypedValue(_, args) if !args.is_empty() => args[0].as_string(),
            _ => None,
        }
    }

    /// Try to get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::TypedValue(_, args) if !args.is_empty() => args[0].as_float(),
            _ => None,
        }
    }

    /// Try to get as list
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null)
    }

    /// Render this value back to STEP source text
    pub fn encode_step(&self, out: &mut String) {
        match self {
            AttributeValue::Null => out.push('$'),
            AttributeValue::Derived => out.push('*'),
            AttributeValue::EntityRef(id) => {
                out.push('#');
                out.push_str(&id.0.to_string());
            }
            AttributeValue::Integer(i) => out.push_str(&i.to_string()),
            AttributeValue::Float(f) => encode_real(*f, out),
            AttributeValue::String(s) => {
                out.push('\'');
                out.push_str(&s.replace('\'', "''"));
                out.push('\'');
            }
            AttributeValue::Enum(e) => {
                out.push('.');
                out.push_str(e);
                out.push('.');
            }
            AttributeValue::List(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.encode_step(out);
                }
                out.push(')');
            }
            AttributeValue::TypedValue(name, args) => {
                out.push_str(name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    arg.encode_step(out);
                }
                out.push(')');
            }
        }
    }
}

/// Encode a real number in STEP form (always carries a decimal point)
fn encode_real(f: f64, out: &mut String) {
    let s = format!("{f}");
    if s.contains('.') || s.contains('e') || s.contains('E') {
        out.push_str(&s.replace('e', "E"));
    } else {
        out.push_str(&s);
        out.push('.');
    }
}

/// Decoded IFC entity
///
/// An entity with its ID, type, and attribute values. Unlike a read-only
/// parser the patch engine mutates entities it created or is allowed to
/// upgrade, so attributes are plainly owned.
#[derive(Clone, Debug)]
pub struct Entity {
    /// Entity ID
    pub id: EntityId,
    /// Entity type
    pub ifc_type: IfcType,
    /// Attribute values in order
    pub attributes: Vec<AttributeValue>,
}

impl Entity {
    /// Get attribute at index
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        self.attributes.get(index)
    }

    /// Get entity reference at index
    pub fn get_ref(&self, index: usize) -> Option<EntityId> {
        self.get(index).and_then(|v| v.as_entity_ref())
    }

    /// Get string at index
    pub fn get_string(&self, index: usize) -> Option<&str> {
        self.get(index).and_then(|v| v.as_string())
    }

    /// Get float at index
    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|v| v.as_float())
    }

    /// Get list at index
    pub fn get_list(&self, index: usize) -> Option<&[AttributeValue]> {
        self.get(index).and_then(|v| v.as_list())
    }

    /// Get list of entity references at index
    pub fn get_refs(&self, index: usize) -> Vec<EntityId> {
        self.get_list(index)
            .map(|list| list.iter().filter_map(|v| v.as_entity_ref()).collect())
            .unwrap_or_default()
    }

    /// Set attribute at index, growing the vector with nulls if needed
    pub fn set(&mut self, index: usize, value: AttributeValue) {
        if self.attributes.len() <= index {
            self.attributes.resize(index + 1, AttributeValue::Null);
        }
        self.attributes[index] = value;
    }

    /// Append a value to the list attribute at index
    ///
    /// A `$` at that position is promoted to a one-element list.
    pub fn push_to_list(&mut self, index: usize, value: AttributeValue) {
        if self.attributes.len() <= index {
            self.attributes.resize(index + 1, AttributeValue::Null);
        }
        match &mut self.attributes[index] {
            AttributeValue::List(items) => items.push(value),
            slot => *slot = AttributeValue::List(vec![value]),
        }
    }

    /// Encode the full entity definition as a STEP line (without newline)
    pub fn encode_step(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push('#');
        out.push_str(&self.id.0.to_string());
        out.push('=');
        out.push_str(self.ifc_type.name());
        out.push('(');
        for (i, attr) in self.attributes.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            attr.encode_step(&mut out);
        }
        out.push_str(");");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_roundtrip() {
        for name in ["IFCWALL", "IFCPIPESEGMENT", "IFCDOCUMENTREFERENCE"] {
            assert_eq!(IfcType::parse(name).name(), name);
        }
        assert_eq!(IfcType::parse("IfcSomethingElse").name(), "IFCSOMETHINGELSE");
    }

    #[test]
    fn test_encode_string_escapes_quotes() {
        let mut out = String::new();
        AttributeValue::string("it's").encode_step(&mut out);
        assert_eq!(out, "'it''s'");
    }

    #[test]
    fn test_encode_real_keeps_decimal_point() {
        let mut out = String::new();
        AttributeValue::Float(15.0).encode_step(&mut out);
        assert_eq!(out, "15.");
        out.clear();
        AttributeValue::Float(0.035).encode_step(&mut out);
        assert_eq!(out, "0.035");
    }

    #[test]
    fn test_encode_entity() {
        let entity = Entity {
            id: EntityId(7),
            ifc_type: IfcType::IfcPropertySingleValue,
            attributes: vec![
                AttributeValue::string("CP_Density"),
                AttributeValue::Null,
                AttributeValue::TypedValue(
                    "IFCMASSDENSITYMEASURE".to_string(),
                    vec![AttributeValue::Float(35.0)],
                ),
                AttributeValue::Null,
            ],
        };
        assert_eq!(
            entity.encode_step(),
            "#7=IFCPROPERTYSINGLEVALUE('CP_Density',$,IFCMASSDENSITYMEASURE(35.),$);"
        );
    }

    #[test]
    fn test_push_to_list_promotes_null() {
        let mut entity = Entity {
            id: EntityId(1),
            ifc_type: IfcType::IfcPropertySet,
            attributes: vec![AttributeValue::Null; 5],
        };
        entity.push_to_list(4, AttributeValue::EntityRef(EntityId(9)));
        assert_eq!(entity.get_refs(4), vec![EntityId(9)]);
    }
}
