//! Functions for building strings for individual acquisition parameters.
//!
//! Everything here tolerates missing metadata by returning placeholder
//! text. The only errors are contract violations such as an unclassifiable
//! slice order or joining an empty list.

use crate::config::Converters;
use crate::error::{ReportError, Result};
use crate::layout::{Layout, Query, NIFTI_EXTENSIONS};
use crate::models::{ImageHeader, Metadata, VolumeCount, UNKNOWN};
use crate::utils::{cardinal, list_to_str, num_to_str, ordinal, remove_duplicates, title_case};
use std::fs;
use std::path::Path;
use tracing::warn;

pub const UNKNOWN_SEQUENCE: &str = "UNKNOwN SEQUENCE";
pub const UNKNOWN_SEQUENCE_VARIANT: &str = "UNKNOwN SEQUENCE VARIANT";
pub const UNKNOWN_PHASE_ENCODING: &str = "UNKNOWN PHASE ENCODING";

/// "One run", "Three runs".
pub fn nb_runs(count: usize) -> String {
    let word = title_case(&cardinal(count as u64));
    if count == 1 {
        format!("{} run", word)
    } else {
        format!("{} runs", word)
    }
}

/// Repetition time in milliseconds.
pub fn repetition_time(metadata: &Metadata) -> String {
    metadata
        .f64("RepetitionTime")
        .map(|tr| num_to_str(tr * 1000.0))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Slice count from `SliceTiming`, falling back to the image's third axis.
pub fn nb_slices(metadata: &Metadata, img: Option<&ImageHeader>) -> String {
    if let Some(times) = metadata.f64_list("SliceTiming") {
        return times.len().to_string();
    }
    img.and_then(|i| i.dim(2))
        .map(|n| n.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// `" in sequential ascending order"`, or empty without `SliceTiming`.
pub fn slice_order(metadata: &Metadata) -> Result<String> {
    match metadata.f64_list("SliceTiming") {
        Some(times) => Ok(format!(" in {} order", slice_order_name(&times)?)),
        None => Ok(String::new()),
    }
}

/// Classify slice acquisition order from per-slice timing.
///
/// Any skipping pattern is reported as interleaved.
pub fn slice_order_name(slice_times: &[f64]) -> Result<&'static str> {
    let times = remove_duplicates(slice_times);
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

    let ascending: Vec<usize> = (0..order.len()).collect();
    let descending: Vec<usize> = (0..order.len()).rev().collect();

    if order == ascending {
        return Ok("sequential ascending");
    }
    if order == descending {
        return Ok("sequential descending");
    }
    match (order.first(), order.get(1)) {
        (Some(first), Some(second)) if first < second => Ok("interleaved ascending"),
        (Some(first), Some(second)) if first > second => Ok("interleaved descending"),
        _ => Err(ReportError::SliceOrder(
            order
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        )),
    }
}

/// Distinct volume counts across files; `None` when none are known.
pub fn volume_counts(counts: &[Option<usize>]) -> Option<VolumeCount> {
    let known: Vec<usize> = counts.iter().flatten().copied().collect();
    let min = known.iter().min()?;
    let max = known.iter().max()?;
    if min == max {
        Some(VolumeCount::Single(*min))
    } else {
        Some(VolumeCount::Range {
            min: *min,
            max: *max,
        })
    }
}

pub fn nb_vols(counts: Option<VolumeCount>) -> String {
    counts
        .map(|c| c.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Run length as `minutes:seconds`, rounding up to the whole second.
pub fn func_duration(nb_vols: usize, tr: f64) -> String {
    let run_secs = (nb_vols as f64 * tr).ceil() as u64;
    format!("{}:{:02}", run_secs / 60, run_secs % 60)
}

/// Scan length, or a `min-max` range when volume counts differ.
pub fn duration(counts: Option<VolumeCount>, metadata: &Metadata) -> String {
    let tr = match metadata.f64("RepetitionTime") {
        Some(tr) => tr,
        None => return UNKNOWN.to_string(),
    };
    match counts {
        None => UNKNOWN.to_string(),
        Some(VolumeCount::Single(n)) => func_duration(n, tr),
        Some(VolumeCount::Range { min, max }) => {
            format!("{}-{}", func_duration(min, tr), func_duration(max, tr))
        }
    }
}

fn distinct_sorted(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut values: Vec<f64> = values.into_iter().collect();
    values.sort_by(f64::total_cmp);
    values.dedup();
    values
}

/// Echo time(s) in milliseconds across the group's files.
pub fn echo_time_ms(metadata: &[Metadata]) -> Result<String> {
    let echo_times = distinct_sorted(metadata.iter().filter_map(|m| m.f64("EchoTime")));
    match echo_times.as_slice() {
        [] => Ok(UNKNOWN.to_string()),
        [single] => Ok(num_to_str(single * 1000.0)),
        many => {
            let te: Vec<String> = many.iter().map(|t| num_to_str(t * 1000.0)).collect();
            list_to_str(&te)
        }
    }
}

/// "multi-echo", "single-echo", or empty when no echo time is recorded.
pub fn multi_echo(metadata: &[Metadata]) -> &'static str {
    let echo_times = distinct_sorted(metadata.iter().filter_map(|m| m.f64("EchoTime")));
    match echo_times.len() {
        0 => "",
        1 => "single-echo",
        _ => "multi-echo",
    }
}

/// `EchoTime1` and `EchoTime2` of a phase-difference fieldmap, in ms.
///
/// Conflicting values within the group are all reported, with a warning.
pub fn echo_times_fmap(metadata: &[Metadata]) -> Result<(String, String)> {
    Ok((
        fmap_echo(metadata, "EchoTime1")?,
        fmap_echo(metadata, "EchoTime2")?,
    ))
}

fn fmap_echo(metadata: &[Metadata], key: &str) -> Result<String> {
    let values = distinct_sorted(metadata.iter().filter_map(|m| m.f64(key)));
    if values.len() > 1 {
        warn!(
            "Field map group has {} different {} values: {:?}",
            values.len(),
            key,
            values
        );
    }
    if values.is_empty() {
        return Ok(UNKNOWN.to_string());
    }
    let ms: Vec<String> = values.iter().map(|t| num_to_str(t * 1000.0)).collect();
    list_to_str(&ms)
}

/// Sorted distinct b-values from a `.bval` sidecar.
pub fn bvals(bval_file: &Path) -> Result<String> {
    let content = match fs::read_to_string(bval_file) {
        Ok(c) => c,
        Err(e) => {
            warn!("Cannot read b-values from {}: {}", bval_file.display(), e);
            return Ok(UNKNOWN.to_string());
        }
    };

    let mut values: Vec<i64> = content
        .split_whitespace()
        .filter_map(|token| {
            token
                .parse::<i64>()
                .ok()
                .or_else(|| token.parse::<f64>().ok().map(|v| v.round() as i64))
        })
        .collect();
    values.sort_unstable();
    values.dedup();

    if values.is_empty() {
        warn!("No b-values found in {}", bval_file.display());
        return Ok(UNKNOWN.to_string());
    }
    let values: Vec<String> = values.iter().map(i64::to_string).collect();
    list_to_str(&values)
}

/// Describe the scans a fieldmap was intended for.
///
/// `"first and second runs of the N-Back BOLD scan"`; empty without
/// `IntendedFor`.
pub fn intendedfor_targets(metadata: &Metadata, layout: &dyn Layout) -> Result<String> {
    let scans = metadata.string_list("IntendedFor");
    if scans.is_empty() {
        return Ok(String::new());
    }

    let images = layout.get(&Query::new().one_of("extension", NIFTI_EXTENSIONS));
    // Buckets keep first-seen order.
    let mut buckets: Vec<(String, Vec<u64>)> = Vec::new();

    for scan in &scans {
        let name = Path::new(scan).file_name().and_then(|n| n.to_str());
        let target = name.and_then(|n| images.iter().find(|f| f.filename() == n));
        let target = match target {
            Some(t) => t,
            None => {
                warn!("IntendedFor target not found in dataset: {}", scan);
                continue;
            }
        };

        let target_type = target.suffix().to_uppercase();
        let label = if target_type == "BOLD" {
            let target_meta = layout.metadata(&target.path);
            let task = target_meta
                .str("TaskName")
                .or_else(|| target.entity("task"))
                .unwrap_or(UNKNOWN);
            format!("{} {} scan", task, target_type)
        } else {
            format!("{} scan", target_type)
        };

        let run = target
            .entity("run")
            .and_then(|r| r.parse::<u64>().ok())
            .unwrap_or(1);

        match buckets.iter_mut().find(|(l, _)| *l == label) {
            Some((_, runs)) => runs.push(run),
            None => buckets.push((label, vec![run])),
        }
    }

    if buckets.is_empty() {
        return Ok(String::new());
    }

    let mut parts = Vec::with_capacity(buckets.len());
    for (label, mut runs) in buckets {
        runs.sort_unstable();
        let words: Vec<String> = runs.iter().map(|&r| ordinal(r)).collect();
        let plural = if words.len() > 1 { "s" } else { "" };
        parts.push(format!("{} run{} of the {}", list_to_str(&words)?, plural, label));
    }
    list_to_str(&parts)
}

/// Sequence variant names, e.g. "MAG prepared and steady state".
pub fn variants(metadata: &Metadata, converters: &Converters) -> Result<String> {
    let codes = metadata
        .codes("SequenceVariant")
        .map(|c| c.into_codes())
        .unwrap_or_else(|| vec![String::new()]);
    let names: Vec<&str> = codes
        .iter()
        .map(|code| {
            converters
                .seqvar
                .get(code)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_SEQUENCE_VARIANT)
        })
        .collect();
    list_to_str(&names)
}

/// Sequence names followed by the raw codes, e.g. "spin echo and echo planar (SE/EP)".
pub fn sequence(metadata: &Metadata, converters: &Converters) -> Result<String> {
    let codes: Vec<String> = metadata
        .codes("ScanningSequence")
        .map(|c| c.into_codes())
        .unwrap_or_default()
        .into_iter()
        .filter(|c| !c.is_empty())
        .collect();

    let names: Vec<Option<&String>> = codes.iter().map(|c| converters.seq.get(c)).collect();
    if names.iter().all(Option::is_none) {
        return Ok(UNKNOWN_SEQUENCE.to_string());
    }

    let names: Vec<&str> = names
        .into_iter()
        .map(|n| n.map(String::as_str).unwrap_or(UNKNOWN_SEQUENCE))
        .collect();
    Ok(format!("{} ({})", list_to_str(&names)?, codes.join("/")))
}

/// Phase encoding direction in prose.
pub fn phase_encoding(metadata: &Metadata, converters: &Converters) -> String {
    metadata
        .str("PhaseEncodingDirection")
        .and_then(|code| converters.dir.get(code))
        .cloned()
        .unwrap_or_else(|| UNKNOWN_PHASE_ENCODING.to_string())
}

/// Flip angle in degrees.
pub fn flip_angle(metadata: &Metadata) -> String {
    metadata
        .f64("FlipAngle")
        .map(num_to_str)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// "MB factor=2", or empty.
pub fn multiband_factor(metadata: &Metadata) -> String {
    metadata
        .f64("MultibandAccelerationFactor")
        .map(|mb| format!("MB factor={}", num_to_str(mb)))
        .unwrap_or_default()
}

/// "in-plane acceleration factor=2", or empty.
pub fn inplane_accel(metadata: &Metadata) -> String {
    metadata
        .f64("ParallelReductionFactorInPlane")
        .map(|f| format!("in-plane acceleration factor={}", num_to_str(f)))
        .unwrap_or_default()
}

/// In-plane matrix, e.g. "64x64".
pub fn matrix_size(img: Option<&ImageHeader>) -> String {
    match img.and_then(|i| Some((i.dim(0)?, i.dim(1)?))) {
        Some((x, y)) => format!("{}x{}", x, y),
        None => "?x?".to_string(),
    }
}

/// Voxel size, e.g. "2x2x2".
pub fn voxel_size(img: Option<&ImageHeader>) -> String {
    match img {
        Some(i) if i.zooms.len() >= 3 => i.zooms[..3]
            .iter()
            .map(|&z| num_to_str(z))
            .collect::<Vec<_>>()
            .join("x"),
        _ => "?x?x?".to_string(),
    }
}

/// In-plane field of view, e.g. "128x128".
pub fn field_of_view(img: Option<&ImageHeader>) -> String {
    match img {
        Some(i) if i.shape.len() >= 2 && i.zooms.len() >= 2 => format!(
            "{}x{}",
            num_to_str(i.shape[0] as f64 * i.zooms[0]),
            num_to_str(i.shape[1] as f64 * i.zooms[1])
        ),
        _ => "?x?".to_string(),
    }
}

/// "T1w" -> "T1-weighted"; suffixes without a trailing "w" are unchanged.
pub fn scan_type(suffix: &str) -> String {
    match suffix.strip_suffix('w') {
        Some(stem) => format!("{}-weighted", stem),
        None => suffix.to_string(),
    }
}

/// Closing sentence describing DICOM to NIfTI conversion.
pub fn final_paragraph(metadata: &Metadata) -> String {
    let software = match (
        metadata.str("ConversionSoftware"),
        metadata.str("ConversionSoftwareVersion"),
    ) {
        (Some(soft), Some(vers)) => format!(" using {} ({})", soft, vers),
        (Some(soft), None) => format!(" using {}", soft),
        _ => String::new(),
    };
    format!("Dicoms were converted to NIfTI-1 format{}.", software)
}
