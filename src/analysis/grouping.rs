//! Grouping of files that belong to one acquisition.
//!
//! Multi-echo, multi-part and phase/magnitude files are described together,
//! so they are collected into a single group before any prose is built.

use crate::layout::{Layout, Query};
use crate::models::{BidsFile, Entities};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::debug;

/// Entities whose values may differ within one acquisition.
pub const MULTICONTRAST_ENTITIES: [&str; 4] = ["echo", "part", "channel", "direction"];

/// Suffixes acquired together.
const SUFFIX_FAMILIES: [&[&str]; 2] = [
    &["bold", "phase"],
    &["phase1", "phase2", "phasediff", "magnitude1", "magnitude2"],
];

/// Files described by one paragraph.
pub type AcquisitionGroup = Vec<BidsFile>;

/// Partition `files` into acquisition groups.
///
/// `extra_entities` are also allowed to vary within a group (e.g. `run`).
/// Groups are emitted in the order of their first file in `files`.
pub fn collect_associated_files(
    layout: &dyn Layout,
    files: &[BidsFile],
    extra_entities: &[&str],
) -> Vec<AcquisitionGroup> {
    let varying: Vec<&str> = MULTICONTRAST_ENTITIES
        .iter()
        .chain(extra_entities.iter())
        .copied()
        .collect();

    let mut grouped: BTreeSet<PathBuf> = BTreeSet::new();
    let mut groups = Vec::new();

    for file in files {
        if grouped.contains(&file.path) {
            continue;
        }

        let sig = signature(file, &varying);
        let family = suffix_family(file.suffix());

        let mut query = Query::new().one_of("suffix", family.iter().cloned());
        for (entity, value) in &sig {
            query = query.is(entity, value.clone());
        }

        // The query leaves extra entities unconstrained; keep exact matches only.
        let mut group: AcquisitionGroup = layout
            .get(&query)
            .into_iter()
            .filter(|f| signature(f, &varying) == sig)
            .collect();
        if !group.iter().any(|f| f.path == file.path) {
            debug!("{} missing from its own query, grouping alone", file.path.display());
            group.push(file.clone());
        }
        // The leading file classifies the group: bold before phase, phasediff before magnitudes.
        group.sort_by_key(|f| {
            let rank = family.iter().position(|s| s == f.suffix());
            (rank, f.path.clone())
        });

        grouped.extend(group.iter().map(|f| f.path.clone()));
        groups.push(group);
    }

    groups
}

fn signature(file: &BidsFile, varying: &[&str]) -> Entities {
    file.entities
        .iter()
        .filter(|(k, _)| k.as_str() != "suffix" && !varying.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn suffix_family(suffix: &str) -> Vec<String> {
    SUFFIX_FAMILIES
        .iter()
        .find(|family| family.contains(&suffix))
        .map(|family| family.iter().map(|s| s.to_string()).collect())
        .unwrap_or_else(|| vec![suffix.to_string()])
}
