// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Patch orchestrator
//!
//! Drives the four patch stages over one loaded graph: harvest, property
//! rows, classification linking, document attachment. Stage order is a hard
//! invariant: the EPD cross-link inside stage 2 needs the property sets that
//! stage creates, and stages 3 and 4 reuse the targeting and harvest state
//! computed up front. The model is written exactly once, at the end; any
//! failure before that leaves the input file untouched.

use crate::coerce::coerce_value;
use crate::error::{PatchError, Result};
use crate::harvest::{
    fallback_documents, infer_doc_metadata, merge_documents, pick_epd_doc_url, PassportSet,
};
use crate::mapping::{read_mapping, MappingRow};
use crate::target::{collect_base_materials, resolve_targets, Component, PatchTarget};
use crate::upsert::Upserter;
use ifc_passport_model::ModelError;
use ifc_passport_store::GraphModel;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What a patch run writes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PatchMode {
    /// Property values plus document/classification references
    #[default]
    ValuesAndRefs,
    /// Structural references only; property sets are created but no values
    /// are written
    RefsOnly,
}

/// Run configuration
#[derive(Clone, Debug, Default)]
pub struct PatchOptions {
    pub mode: PatchMode,
    /// Output path; defaults to the input with `_patched` before the
    /// extension
    pub output: Option<PathBuf>,
}

/// Counters reported after a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchStats {
    pub rows_applied: usize,
    pub rows_skipped: usize,
    pub properties_written: usize,
    pub documents_attached: usize,
    pub classifications_linked: usize,
}

/// Result of a completed run
#[derive(Clone, Debug)]
pub struct PatchOutcome {
    pub output: PathBuf,
    pub entities_before: usize,
    pub entities_after: usize,
    pub stats: PatchStats,
}

/// Default output path: `model.ifc` becomes `model_patched.ifc`
pub fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("ifc");
    input.with_file_name(format!("{stem}_patched.{ext}"))
}

/// Load, patch, and persist one model
pub fn run(
    model_path: &Path,
    mapping_path: &Path,
    passport_dir: Option<&Path>,
    options: &PatchOptions,
) -> Result<PatchOutcome> {
    if !model_path.is_file() {
        return Err(PatchError::ModelNotFound(model_path.to_path_buf()));
    }
    let rows = read_mapping(mapping_path)?;
    let mut model = match GraphModel::open(model_path) {
        Ok(model) => model,
        Err(ModelError::Io(_)) => {
            return Err(PatchError::ModelNotFound(model_path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    let passports = PassportSet::load(passport_dir);
    let entities_before = model.entity_count();

    let stats = apply(&mut model, &rows, &passports, options.mode);

    let output = options
        .output
        .clone()
        .unwrap_or_else(|| default_output(model_path));
    model.write(&output)?;
    let entities_after = model.entity_count();
    info!(
        output = %output.display(),
        entities_before,
        entities_after,
        rows = stats.rows_applied,
        "patched model written"
    );
    Ok(PatchOutcome {
        output,
        entities_before,
        entities_after,
        stats,
    })
}

/// Apply every patch stage to an in-memory model
pub fn apply(
    model: &mut GraphModel,
    rows: &[MappingRow],
    passports: &PassportSet,
    mode: PatchMode,
) -> PatchStats {
    let mut stats = PatchStats::default();

    // Per-component state gathered from the mapping, in first-seen order
    let mut components: Vec<Component> = Vec::new();
    let mut dict_by_comp: FxHashMap<Component, String> = FxHashMap::default();
    let mut evidence_by_comp: FxHashMap<Component, Vec<String>> = FxHashMap::default();
    for row in rows {
        let component = row.component_key();
        if !components.contains(&component) {
            components.push(component.clone());
        }
        let dict = row.dictionary_uri.trim();
        if !dict.is_empty() {
            // First non-empty dictionary URI per component wins
            dict_by_comp
                .entry(component.clone())
                .or_insert_with(|| dict.to_string());
        }
        let evidence = row.evidence_file.trim();
        if !evidence.is_empty() {
            evidence_by_comp
                .entry(component)
                .or_default()
                .push(evidence.to_string());
        }
    }

    let targets_by_comp: FxHashMap<Component, Vec<PatchTarget>> = components
        .iter()
        .map(|c| (c.clone(), resolve_targets(model, c)))
        .collect();

    let mut upserter = Upserter::new(model);

    // Stage 2: property rows
    for row in rows {
        let component = row.component_key();
        let targets = &targets_by_comp[&component];
        if targets.is_empty() {
            warn!(component = %component, property = %row.cp_property, "no targets, row skipped");
            stats.rows_skipped += 1;
            continue;
        }
        let pset_name = row.pset_name();
        let epd_doc_url = if row.is_epd() {
            pick_epd_doc_url(&component, passports)
        } else {
            None
        };
        for target in targets {
            let pset = upserter.find_or_create_pset(*target, &pset_name);
            if mode == PatchMode::RefsOnly {
                continue;
            }
            let name = row.cp_property.trim();
            let value = coerce_value(&row.unit, &row.value).to_attribute();
            let description = Some(row.bsdd_property_uri.trim()).filter(|d| !d.is_empty());
            let prop = upserter.upsert_single_value(pset, name, value, description);
            stats.properties_written += 1;
            if let Some(url) = &epd_doc_url {
                let info = upserter.get_or_create_doc_info(
                    url,
                    "Environmental Product Declaration (EPD)",
                    None,
                    Some("EPD document"),
                );
                let doc_ref = upserter.get_or_create_doc_ref(info, None, None, None);
                upserter.link_reference_to_resource(prop, doc_ref);
            }
        }
        stats.rows_applied += 1;
    }

    // Stage 3: classification linking
    for component in &components {
        let Some(dict_uri) = dict_by_comp.get(component) else {
            continue;
        };
        let dict_name = dict_uri
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(dict_uri)
            .to_string();
        let concept = passports.classes.get(component);
        let ref_uri = concept.map(|c| c.uri.as_str()).unwrap_or(dict_uri);
        let ref_name = concept
            .and_then(|c| c.label.as_deref())
            .unwrap_or(&dict_name)
            .to_string();
        let reference =
            upserter.get_or_create_classification_ref(ref_uri, None, Some(&ref_name));
        let ref_uri = ref_uri.to_string();

        for target in &targets_by_comp[component] {
            match target {
                PatchTarget::Element(element) => {
                    upserter.associate_classification(*element, reference);
                    // Surface the concept as a document too, for viewers
                    // that list associations but not classifications
                    let info = upserter.get_or_create_doc_info(
                        &ref_uri,
                        "bSDD Classification",
                        None,
                        Some(&format!("Classification concept: {ref_name}")),
                    );
                    let doc_ref = upserter.get_or_create_doc_ref(
                        info,
                        Some("bSDD Classification"),
                        None,
                        Some(&format!("Classification concept: {ref_name}")),
                    );
                    upserter.attach_doc(*element, doc_ref);

                    let mut materials = Vec::new();
                    for rel_id in upserter
                        .model()
                        .entities_of_kind(&ifc_passport_model::IfcType::IfcRelAssociatesMaterial)
                    {
                        let Some(rel) = upserter.model().entity(rel_id) else {
                            continue;
                        };
                        if !rel.get_refs(4).contains(element) {
                            continue;
                        }
                        if let Some(def) = rel.get_ref(5) {
                            collect_base_materials(upserter.model(), def, &mut materials);
                        }
                    }
                    for material in materials {
                        upserter.link_reference_to_resource(material, reference);
                    }
                }
                PatchTarget::Material(material) => {
                    upserter.link_reference_to_resource(*material, reference);
                }
            }
            stats.classifications_linked += 1;
        }
    }

    // Stage 4: document attachment
    for component in &components {
        let targets = &targets_by_comp[component];
        if targets.is_empty() {
            continue;
        }
        let evidence = evidence_by_comp.get(component).cloned().unwrap_or_default();
        let harvested = passports.harvested_urls(component);
        // Components with no evidence and no harvested documents stay
        // untouched; the fallback catalog only backs up actual sources
        if evidence.is_empty() && harvested.is_empty() {
            continue;
        }
        let merged = merge_documents(&evidence, &harvested, fallback_documents(component));

        for url in merged {
            let meta = infer_doc_metadata(&url);
            let info = upserter.get_or_create_doc_info(
                &url,
                &meta.name,
                meta.identification.as_deref(),
                meta.description.as_deref(),
            );
            let doc_ref = upserter.get_or_create_doc_ref(
                info,
                Some(&meta.name),
                meta.identification.as_deref(),
                meta.description.as_deref(),
            );
            for target in targets {
                match target {
                    PatchTarget::Element(element) => upserter.attach_doc(*element, doc_ref),
                    PatchTarget::Material(material) => {
                        upserter.link_reference_to_resource(*material, doc_ref)
                    }
                }
                stats.documents_attached += 1;
            }
        }
    }

    stats
}
