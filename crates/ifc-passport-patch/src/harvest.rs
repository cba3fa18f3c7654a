// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Document and classification harvester
//!
//! Reads a directory of product-passport JSON-LD files and groups what they
//! carry per component: a classification concept, document URLs, and carrier
//! links (resolver URL, GS1 Digital Link). Unreadable or malformed files are
//! warned about and skipped. A static fallback catalog stands in when neither
//! evidence nor passports yield any document.

use crate::target::Component;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// A classification concept harvested from a passport's product class block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConceptRef {
    pub uri: String,
    pub label: Option<String>,
}

/// Everything harvested from a passport directory, grouped by component
#[derive(Clone, Debug, Default)]
pub struct PassportSet {
    /// Classification concept per component
    pub classes: FxHashMap<Component, ConceptRef>,
    /// HTTP document URLs from the `#documents` collections
    pub documents: FxHashMap<Component, Vec<String>>,
    /// Resolver and GS1 Digital Link URLs from the `#carrier` collections
    pub links: FxHashMap<Component, Vec<String>>,
}

impl PassportSet {
    /// Load all `.json`/`.jsonld` files under `dir`
    ///
    /// Files are visited in filename order so reruns harvest identically.
    pub fn load(dir: Option<&Path>) -> Self {
        let mut set = PassportSet::default();
        let Some(dir) = dir else {
            return set;
        };
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %dir.display(), %err, "passport directory unreadable, skipping");
                return set;
            }
        };
        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| {
                        let e = e.to_lowercase();
                        e == "json" || e == "jsonld"
                    })
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        for path in paths {
            let data: Value = match fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()))
            {
                Ok(data) => data,
                Err(err) => {
                    warn!(file = %path.display(), %err, "skipping unreadable passport file");
                    continue;
                }
            };
            set.harvest_file(&data);
            debug!(file = %path.display(), "harvested passport file");
        }
        set
    }

    fn harvest_file(&mut self, data: &Value) {
        let name = product_name(data);
        let id = passport_id(data);
        let Some(component) = classify_product(&name, &id) else {
            return;
        };

        if let Some(concept) = product_class(data) {
            self.classes.entry(component.clone()).or_insert(concept);
        }

        let docs = self.documents.entry(component.clone()).or_default();
        for url in collection_document_urls(data) {
            docs.push(url);
        }

        let links = self.links.entry(component).or_default();
        for url in carrier_links(data) {
            links.push(url);
        }
    }

    /// Documents plus carrier links for a component, in harvest order
    pub fn harvested_urls(&self, component: &Component) -> Vec<String> {
        let mut urls = self
            .documents
            .get(component)
            .cloned()
            .unwrap_or_default();
        if let Some(links) = self.links.get(component) {
            urls.extend(links.iter().cloned());
        }
        urls
    }
}

/// Classify a passport's product into a component
///
/// Ordered first-match-wins rules on the product name, then on the passport
/// identifier. The order is load-bearing: a name matching two rule sets
/// resolves to the earlier one.
pub fn classify_product(name: &str, id: &str) -> Option<Component> {
    let name = name.to_lowercase();
    let id = id.to_lowercase();
    if name.contains("knauf") || name.contains("insulation") {
        return Some(Component::Insulation);
    }
    if ["wavin", "pex", "pipe", "pvc"].iter().any(|k| name.contains(k)) {
        return Some(Component::Pipe);
    }
    if ["schilliger", "glulam", "brettschichtholz"]
        .iter()
        .any(|k| name.contains(k))
    {
        return Some(Component::Timber);
    }
    if id.contains("knauf") {
        return Some(Component::Insulation);
    }
    if id.contains("pvc") || id.contains("sewage") {
        return Some(Component::Pipe);
    }
    if ["schilliger", "glulam", "gl24"].iter().any(|k| id.contains(k)) {
        return Some(Component::Timber);
    }
    None
}

fn product_name(data: &Value) -> String {
    data.pointer("/product/name")
        .or_else(|| data.get("dpp:hasName"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn passport_id(data: &Value) -> String {
    data.get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn product_class(data: &Value) -> Option<ConceptRef> {
    let class = data
        .pointer("/product/class")
        .or_else(|| data.get("dpp:hasClassification"))?;
    let uri = class
        .get("uri")
        .or_else(|| class.get("dpp:hasConceptUri"))
        .and_then(Value::as_str)?
        .to_string();
    let label = class
        .get("label")
        .or_else(|| class.get("dpp:hasName"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Some(ConceptRef { uri, label })
}

fn collections(data: &Value) -> impl Iterator<Item = &Value> {
    data.get("dpp:dataElementCollections")
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .unwrap_or_default()
}

fn collection_document_urls(data: &Value) -> Vec<String> {
    let mut urls = Vec::new();
    for coll in collections(data) {
        if coll.get("id").and_then(Value::as_str) != Some("#documents") {
            continue;
        }
        let Some(elements) = coll.get("dpp:elements").and_then(Value::as_array) else {
            continue;
        };
        for el in elements {
            if el.get("type").and_then(Value::as_str) != Some("dpp:Document") {
                continue;
            }
            let url = el
                .get("schema:url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim();
            if url.starts_with("http") {
                urls.push(url.to_string());
            }
        }
    }
    urls
}

fn carrier_links(data: &Value) -> Vec<String> {
    let mut urls = Vec::new();
    for coll in collections(data) {
        if coll.get("id").and_then(Value::as_str) != Some("#carrier") {
            continue;
        }
        let Some(elements) = coll.get("dpp:elements").and_then(Value::as_array) else {
            continue;
        };
        for el in elements {
            if el.get("id").and_then(Value::as_str) != Some("#qrLink") {
                continue;
            }
            let val = el.get("dpp:value").cloned().unwrap_or(Value::Null);
            // Resolver first, then the GS1 Digital Link
            for key in ["resolverUri", "uri"] {
                let url = val
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .trim();
                if url.starts_with("http") {
                    urls.push(url.to_string());
                }
            }
        }
    }
    urls
}

/// Demo document catalog used when neither evidence nor passports yield URLs
pub fn fallback_documents(component: &Component) -> &'static [&'static str] {
    match component {
        Component::Insulation => &[
            "http://localhost:8000/files/insul/Acoustic%20Batt%20Datasheet%20.pdf",
            "http://localhost:8000/files/insul/Data.pdf",
        ],
        Component::Pipe => &[
            "http://localhost:8000/files/pipe/NEPD-3589-2252_PVC-Sewage-Pipe.pdf",
        ],
        Component::Timber => &[
            "http://localhost:8000/files/bsh/01-Leistungserklaerung_BSH-SHI-01-01062022.pdf",
            "http://localhost:8000/files/bsh/EPD%20Schilliger_glued_laminated_timber_Glulam_as_per_EN_140802013.pdf",
        ],
        Component::Other(_) => &[],
    }
}

/// Merge evidence, harvested, and fallback document URLs
///
/// Evidence keeps only well-formed HTTP(S) URIs. The fallback list joins only
/// when evidence plus harvested is empty. The result is deduplicated while
/// preserving first-seen order.
pub fn merge_documents(
    evidence: &[String],
    harvested: &[String],
    fallback: &[&str],
) -> Vec<String> {
    let mut merged: Vec<String> = evidence
        .iter()
        .map(|p| p.trim())
        .filter(|p| p.starts_with("http://") || p.starts_with("https://"))
        .map(str::to_string)
        .collect();
    merged.extend(harvested.iter().cloned());
    if merged.is_empty() {
        merged.extend(fallback.iter().map(|s| s.to_string()));
    }

    let mut seen = rustc_hash::FxHashSet::default();
    merged.retain(|u| seen.insert(u.clone()));
    merged
}

/// Display metadata inferred from a document URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocMetadata {
    pub name: String,
    pub identification: Option<String>,
    pub description: Option<String>,
}

/// Infer document display metadata from its URL
///
/// Ordered substring rules; the first matching rule decides.
pub fn infer_doc_metadata(url: &str) -> DocMetadata {
    let u = url.trim();
    if let Some(rest) = u.split("/dpps/").nth(1) {
        return DocMetadata {
            name: "Digital Product Passport (resolver)".to_string(),
            identification: Some(rest.to_string()),
            description: Some("Resolver URL for DPP JSON-LD/HTML".to_string()),
        };
    }
    if u.contains("/id/01/") {
        let ident = u.split("/id/").nth(1).map(str::to_string);
        return DocMetadata {
            name: "GS1 Digital Link (QR target)".to_string(),
            identification: ident,
            description: Some("GS1 Digital Link to DPP".to_string()),
        };
    }
    if u.contains("NEPD") || u.to_lowercase().contains("epd") {
        let ident = u
            .replace('_', "-")
            .split('/')
            .find(|part| part.starts_with("NEPD"))
            .map(str::to_string);
        return DocMetadata {
            name: "Environmental Product Declaration (EPD)".to_string(),
            identification: ident,
            description: None,
        };
    }
    if u.contains("Leistungserklaerung") || u.contains("DoP") {
        return DocMetadata {
            name: "Declaration of Performance (DoP)".to_string(),
            identification: None,
            description: None,
        };
    }
    if u.contains("Datasheet") || u.contains("Data.pdf") {
        return DocMetadata {
            name: "Product Datasheet".to_string(),
            identification: None,
            description: None,
        };
    }
    DocMetadata {
        name: "External Document".to_string(),
        identification: None,
        description: None,
    }
}

/// First harvested or fallback URL for a component that looks like an EPD
pub fn pick_epd_doc_url(component: &Component, passports: &PassportSet) -> Option<String> {
    let looks_like_epd = |u: &str| {
        let ul = u.to_lowercase();
        ul.contains("nepd") || ul.contains("epd")
    };
    passports
        .documents
        .get(component)
        .into_iter()
        .flatten()
        .map(String::as_str)
        .chain(fallback_documents(component).iter().copied())
        .find(|u| u.starts_with("http") && looks_like_epd(u))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_classify_by_name_first_then_id() {
        assert_eq!(
            classify_product("Knauf Acoustic Batt", ""),
            Some(Component::Insulation)
        );
        assert_eq!(
            classify_product("Wavin PEX", ""),
            Some(Component::Pipe)
        );
        // Name wins over id when both match
        assert_eq!(
            classify_product("Schilliger Glulam GL24h", "dpp:knauf-001"),
            Some(Component::Timber)
        );
        assert_eq!(
            classify_product("", "urn:dpp:pvc-sewage-pipe"),
            Some(Component::Pipe)
        );
        assert_eq!(classify_product("Concrete C30", ""), None);
    }

    #[test]
    fn test_merge_precedence_excludes_fallback() {
        let merged = merge_documents(
            &["http://a.example/doc.pdf".to_string()],
            &[],
            &["http://fallback.example/f.pdf"],
        );
        assert_eq!(merged, vec!["http://a.example/doc.pdf"]);
    }

    #[test]
    fn test_merge_empty_uses_fallback_in_order() {
        let merged = merge_documents(&[], &[], &["http://f/1.pdf", "http://f/2.pdf"]);
        assert_eq!(merged, vec!["http://f/1.pdf", "http://f/2.pdf"]);
    }

    #[test]
    fn test_merge_filters_non_http_evidence_and_dedups() {
        let merged = merge_documents(
            &[
                "evidence/local-file.pdf".to_string(),
                "https://a.example/doc.pdf".to_string(),
            ],
            &[
                "https://a.example/doc.pdf".to_string(),
                "https://b.example/epd.pdf".to_string(),
            ],
            &["http://fallback.example/f.pdf"],
        );
        assert_eq!(
            merged,
            vec!["https://a.example/doc.pdf", "https://b.example/epd.pdf"]
        );
    }

    #[test]
    fn test_infer_metadata_rule_order() {
        let m = infer_doc_metadata("http://localhost:8000/dpps/knauf-acoustic-batt");
        assert_eq!(m.name, "Digital Product Passport (resolver)");
        assert_eq!(m.identification.as_deref(), Some("knauf-acoustic-batt"));

        let m = infer_doc_metadata("https://id.example/id/01/07612345000001");
        assert_eq!(m.name, "GS1 Digital Link (QR target)");
        assert_eq!(m.identification.as_deref(), Some("01/07612345000001"));

        let m = infer_doc_metadata("http://x/NEPD-3589-2252_PVC-Sewage-Pipe.pdf");
        assert_eq!(m.name, "Environmental Product Declaration (EPD)");
        assert_eq!(
            m.identification.as_deref(),
            Some("NEPD-3589-2252-PVC-Sewage-Pipe.pdf")
        );

        let m = infer_doc_metadata("http://x/01-Leistungserklaerung_BSH.pdf");
        assert_eq!(m.name, "Declaration of Performance (DoP)");

        let m = infer_doc_metadata("http://x/Acoustic%20Batt%20Datasheet%20.pdf");
        assert_eq!(m.name, "Product Datasheet");

        let m = infer_doc_metadata("http://x/whatever.bin");
        assert_eq!(m.name, "External Document");
    }

    #[test]
    fn test_load_skips_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut good = std::fs::File::create(dir.path().join("a_pipe.json")).unwrap();
        good.write_all(
            br##"{
                "id": "urn:dpp:pvc-sewage-pipe",
                "product": {"name": "Wavin PVC Sewage Pipe",
                            "class": {"uri": "https://bsdd.example/class/pipe", "label": "Sewage pipe"}},
                "dpp:dataElementCollections": [
                    {"id": "#documents", "dpp:elements": [
                        {"type": "dpp:Document", "schema:url": "http://docs.example/NEPD-1.pdf"}
                    ]},
                    {"id": "#carrier", "dpp:elements": [
                        {"id": "#qrLink", "dpp:value": {
                            "resolverUri": "http://localhost:8000/dpps/pvc-sewage-pipe",
                            "uri": "https://id.example/id/01/07612345000001"
                        }}
                    ]}
                ]
            }"##,
        )
        .unwrap();
        std::fs::write(dir.path().join("b_broken.json"), b"{not json").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), b"nope").unwrap();

        let set = PassportSet::load(Some(dir.path()));
        assert_eq!(
            set.classes.get(&Component::Pipe).unwrap().uri,
            "https://bsdd.example/class/pipe"
        );
        assert_eq!(
            set.documents.get(&Component::Pipe).unwrap(),
            &vec!["http://docs.example/NEPD-1.pdf".to_string()]
        );
        assert_eq!(
            set.harvested_urls(&Component::Pipe),
            vec![
                "http://docs.example/NEPD-1.pdf",
                "http://localhost:8000/dpps/pvc-sewage-pipe",
                "https://id.example/id/01/07612345000001",
            ]
        );
    }

    #[test]
    fn test_pick_epd_prefers_harvested_over_fallback() {
        let mut set = PassportSet::default();
        set.documents.insert(
            Component::Pipe,
            vec![
                "http://docs.example/datasheet.pdf".to_string(),
                "http://docs.example/NEPD-1.pdf".to_string(),
            ],
        );
        assert_eq!(
            pick_epd_doc_url(&Component::Pipe, &set).as_deref(),
            Some("http://docs.example/NEPD-1.pdf")
        );

        let empty = PassportSet::default();
        assert_eq!(
            pick_epd_doc_url(&Component::Timber, &empty).as_deref(),
            Some("http://localhost:8000/files/bsh/EPD%20Schilliger_glued_laminated_timber_Glulam_as_per_EN_140802013.pdf")
        );
    }
}
