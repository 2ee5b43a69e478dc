//! Paragraph building for acquisition groups.
//!
//! Each group is classified by its first file and described by the matching
//! routine. Missing metadata and undecodable images never abort a report;
//! they show up as placeholders in the text.

use super::templates::{Renderer, TemplateId};
use crate::analysis::collect_associated_files;
use crate::config::Converters;
use crate::error::Result;
use crate::image::ImageLoader;
use crate::layout::Layout;
use crate::models::{BidsFile, DescriptionData, ImageHeader, Metadata, ScanKind, UNKNOWN};
use crate::parameters;
use crate::utils::remove_duplicates;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Describes groups of files using one dataset, image loader and vocabulary.
pub struct Parser<'a> {
    layout: &'a dyn Layout,
    loader: &'a dyn ImageLoader,
    converters: &'a Converters,
    renderer: &'a Renderer,
}

impl<'a> Parser<'a> {
    pub fn new(
        layout: &'a dyn Layout,
        loader: &'a dyn ImageLoader,
        converters: &'a Converters,
        renderer: &'a Renderer,
    ) -> Self {
        Self {
            layout,
            loader,
            converters,
            renderer,
        }
    }

    /// One description per acquisition group in `files`, in group order.
    ///
    /// Unsupported groups contribute an empty string.
    pub fn parse_files(&self, files: &[BidsFile]) -> Result<Vec<String>> {
        let groups = collect_associated_files(self.layout, files, &["run"]);
        debug!("{} files in {} acquisition groups", files.len(), groups.len());

        groups.iter().map(|group| self.describe(group)).collect()
    }

    /// Dispatch one group to its paragraph routine.
    pub fn describe(&self, group: &[BidsFile]) -> Result<String> {
        let first = match group.first() {
            Some(f) => f,
            None => return Ok(String::new()),
        };

        match ScanKind::classify(first) {
            ScanKind::Functional => self.func_info(group),
            ScanKind::Anatomical => self.anat_info(group),
            ScanKind::Diffusion => self.dwi_info(group),
            ScanKind::Fieldmap => self.fmap_info(group),
            ScanKind::Unsupported(what) => {
                warn!("'{}' not yet supported.", what);
                Ok(String::new())
            }
        }
    }

    /// Paragraph for functional scans.
    pub fn func_info(&self, files: &[BidsFile]) -> Result<String> {
        let first = &files[0];
        let metadata = self.layout.metadata(&first.path);
        let all_meta = self.group_metadata(files);
        let headers = self.load_all(files);
        let img = headers[0].as_ref();

        let counts: Vec<Option<usize>> = headers
            .iter()
            .map(|h| h.as_ref().map(ImageHeader::volumes))
            .collect();
        let counts = parameters::volume_counts(&counts);

        let task_name = metadata
            .str("TaskName")
            .or_else(|| first.entity("task"))
            .unwrap_or(UNKNOWN)
            .to_string();

        let mut data = self.common_mri_desc(img, &metadata)?;
        data.insert("echo_time", parameters::echo_time_ms(&all_meta)?);
        data.insert("slice_order", parameters::slice_order(&metadata)?);
        data.insert("nb_runs", parameters::nb_runs(nb_distinct_runs(files)));
        data.insert("task_name", task_name);
        data.insert("multi_echo", parameters::multi_echo(&all_meta));
        data.insert("nb_vols", parameters::nb_vols(counts));
        data.insert("duration", parameters::duration(counts, &metadata));
        data.insert("scan_type", parameters::scan_type(first.suffix()));

        Ok(self.renderer.render(TemplateId::Func, &data))
    }

    /// Paragraph for structural scans.
    pub fn anat_info(&self, files: &[BidsFile]) -> Result<String> {
        let first = &files[0];
        let metadata = self.layout.metadata(&first.path);
        let all_meta = self.group_metadata(files);
        let img = self.load_first(first);

        let mut data = self.common_mri_desc(img.as_ref(), &metadata)?;
        data.insert("echo_time", parameters::echo_time_ms(&all_meta)?);
        data.insert("slice_order", parameters::slice_order(&metadata)?);
        data.insert("nb_runs", parameters::nb_runs(nb_distinct_runs(files)));
        data.insert("multi_echo", parameters::multi_echo(&all_meta));
        data.insert("scan_type", parameters::scan_type(first.suffix()));

        Ok(self.renderer.render(TemplateId::Anat, &data))
    }

    /// Paragraph for diffusion scans.
    pub fn dwi_info(&self, files: &[BidsFile]) -> Result<String> {
        let first = &files[0];
        let metadata = self.layout.metadata(&first.path);
        let all_meta = self.group_metadata(files);
        let img = self.load_first(first);

        let dmri_dir = img
            .as_ref()
            .and_then(|i| i.dim(3))
            .map(|n| n.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string());

        let mut data = self.common_mri_desc(img.as_ref(), &metadata)?;
        data.insert("echo_time", parameters::echo_time_ms(&all_meta)?);
        data.insert("slice_order", parameters::slice_order(&metadata)?);
        data.insert("nb_runs", parameters::nb_runs(nb_distinct_runs(files)));
        data.insert("bvals", parameters::bvals(&bval_path(&first.path))?);
        data.insert("dmri_dir", dmri_dir);

        Ok(self.renderer.render(TemplateId::Dwi, &data))
    }

    /// Paragraph for phase-difference field maps.
    pub fn fmap_info(&self, files: &[BidsFile]) -> Result<String> {
        let first = &files[0];
        let metadata = self.layout.metadata(&first.path);
        let all_meta = self.group_metadata(files);
        let img = self.load_first(first);

        let (te_1, te_2) = parameters::echo_times_fmap(&all_meta)?;
        let intended_for = parameters::intendedfor_targets(&metadata, self.layout)?;

        let mut data = self.common_mri_desc(img.as_ref(), &metadata)?;
        data.insert("te_1", te_1);
        data.insert("te_2", te_2);
        data.insert("slice_order", parameters::slice_order(&metadata)?);
        data.insert("dir", parameters::phase_encoding(&metadata, self.converters));
        data.insert("intended_for", prefixed(" for the ", intended_for));

        Ok(self.renderer.render(TemplateId::Fmap, &data))
    }

    /// Fields shared by every MRI paragraph.
    fn common_mri_desc(
        &self,
        img: Option<&ImageHeader>,
        metadata: &Metadata,
    ) -> Result<DescriptionData> {
        let mut data = DescriptionData::from_metadata(metadata);
        device_info(metadata, &mut data);

        data.insert("tr", parameters::repetition_time(metadata));
        data.insert("fov", parameters::field_of_view(img));
        data.insert("matrix_size", parameters::matrix_size(img));
        data.insert("voxel_size", parameters::voxel_size(img));
        data.insert("variants", parameters::variants(metadata, self.converters)?);
        data.insert("seqs", parameters::sequence(metadata, self.converters)?);
        data.insert("nb_slices", parameters::nb_slices(metadata, img));
        data.insert("flip_angle", parameters::flip_angle(metadata));
        data.insert(
            "mb_factor",
            prefixed("; ", parameters::multiband_factor(metadata)),
        );
        data.insert(
            "inplane_accel",
            prefixed("; ", parameters::inplane_accel(metadata)),
        );
        Ok(data)
    }

    fn group_metadata(&self, files: &[BidsFile]) -> Vec<Metadata> {
        files
            .iter()
            .map(|f| self.layout.metadata(&f.path))
            .collect()
    }

    fn load_first(&self, file: &BidsFile) -> Option<ImageHeader> {
        let img = self.loader.try_load(&file.path);
        if img.is_none() {
            files_not_found_warning(&[file.relative_to(self.layout.root())]);
        }
        img
    }

    /// Decode every image of the group, warning once about the failures.
    fn load_all(&self, files: &[BidsFile]) -> Vec<Option<ImageHeader>> {
        let mut errored = Vec::new();
        let headers = files
            .iter()
            .map(|f| {
                let img = self.loader.try_load(&f.path);
                if img.is_none() {
                    errored.push(f.relative_to(self.layout.root()));
                }
                img
            })
            .collect();

        if !errored.is_empty() {
            files_not_found_warning(&remove_duplicates(&errored));
        }
        headers
    }
}

/// Scanner manufacturer and model, with placeholders.
pub fn device_info(metadata: &Metadata, data: &mut DescriptionData) {
    data.insert(
        "manufacturer",
        metadata.str("Manufacturer").unwrap_or("MANUFACTURER"),
    );
    data.insert(
        "model_name",
        metadata.str("ManufacturersModelName").unwrap_or("MODEL"),
    );
}

/// Distinct run labels; a file without a run counts as run 1.
fn nb_distinct_runs(files: &[BidsFile]) -> usize {
    files
        .iter()
        .map(|f| {
            f.entity("run")
                .map(|r| r.trim_start_matches('0').to_string())
                .unwrap_or_else(|| "1".to_string())
        })
        .collect::<BTreeSet<_>>()
        .len()
}

fn bval_path(image: &Path) -> PathBuf {
    let name = image.to_string_lossy();
    let stem = name
        .strip_suffix(".nii.gz")
        .or_else(|| name.strip_suffix(".nii"))
        .unwrap_or(&name);
    PathBuf::from(format!("{}.bval", stem))
}

fn prefixed(prefix: &str, value: String) -> String {
    if value.is_empty() {
        value
    } else {
        format!("{}{}", prefix, value)
    }
}

fn files_not_found_warning(files: &[PathBuf]) {
    let names: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
    warn!("File not found or empty: {:?}", names);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{DirLayout, Query, NIFTI_EXTENSIONS};
    use crate::testing::{Dataset, StubLoader};
    use serde_json::json;

    fn bold_meta() -> serde_json::Value {
        json!({
            "RepetitionTime": 2.0,
            "EchoTime": 0.03,
            "FlipAngle": 90,
            "SliceTiming": [0.0, 0.5, 1.0, 1.5],
            "ScanningSequence": "EP",
            "SequenceVariant": "SK",
            "TaskName": "resting state",
            "Manufacturer": "Siemens",
        })
    }

    fn images(layout: &DirLayout) -> Vec<BidsFile> {
        layout.get(&Query::new().one_of("extension", NIFTI_EXTENSIONS))
    }

    fn parse(ds: &Dataset, loader: &StubLoader) -> Vec<String> {
        let layout = ds.layout();
        let converters = Converters::bundled().unwrap();
        let renderer = Renderer::bundled();
        let parser = Parser::new(&layout, loader, &converters, &renderer);
        parser.parse_files(&images(&layout)).unwrap()
    }

    fn bold_header(volumes: usize) -> ImageHeader {
        ImageHeader::new(vec![64, 64, 4, volumes], vec![3.0, 3.0, 3.0, 2.0])
    }

    #[test]
    fn test_func_paragraph() {
        let ds = Dataset::new();
        ds.image("sub-01/func/sub-01_task-rest_run-1_bold.nii.gz", bold_meta());
        ds.image("sub-01/func/sub-01_task-rest_run-2_bold.nii.gz", bold_meta());
        let loader = StubLoader::new()
            .with("sub-01_task-rest_run-1_bold.nii.gz", bold_header(10))
            .with("sub-01_task-rest_run-2_bold.nii.gz", bold_header(10));

        let paragraphs = parse(&ds, &loader);
        assert_eq!(paragraphs.len(), 1);
        let text = &paragraphs[0];
        assert!(text.starts_with("Two runs of resting state segmented k-space echo planar (EP) single-echo bold fMRI data"));
        assert!(text.contains("4 slices in sequential ascending order"));
        assert!(text.contains("TR=2000ms"));
        assert!(text.contains("TE=30ms"));
        assert!(text.contains("FA=90<deg>"));
        assert!(text.contains("FOV=192x192mm"));
        assert!(text.contains("matrix size=64x64"));
        assert!(text.contains("voxel size=3x3x3mm)"));
        assert!(text.contains("Each run was 0:20 minutes in length, during which 10 functional volumes"));
        assert!(!text.contains("{{"));
    }

    #[test]
    fn test_func_undecodable_images_use_placeholders() {
        let ds = Dataset::new();
        ds.image("sub-01/func/sub-01_task-rest_run-1_bold.nii.gz", bold_meta());
        ds.image("sub-01/func/sub-01_task-rest_run-2_bold.nii.gz", bold_meta());
        let loader = StubLoader::new().with("sub-01_task-rest_run-2_bold.nii.gz", bold_header(12));

        let text = &parse(&ds, &loader)[0];
        // Undecodable files still count as runs but not as volumes.
        assert!(text.starts_with("Two runs"));
        assert!(text.contains("matrix size=?x?"));
        assert!(text.contains("during which 12 functional volumes"));
    }

    #[test]
    fn test_func_volume_range() {
        let ds = Dataset::new();
        ds.image("sub-01/func/sub-01_task-rest_run-1_bold.nii.gz", bold_meta());
        ds.image("sub-01/func/sub-01_task-rest_run-2_bold.nii.gz", bold_meta());
        let loader = StubLoader::new()
            .with("sub-01_task-rest_run-1_bold.nii.gz", bold_header(10))
            .with("sub-01_task-rest_run-2_bold.nii.gz", bold_header(30));

        let text = &parse(&ds, &loader)[0];
        assert!(text.contains("Each run was 0:20-1:00 minutes"));
        assert!(text.contains("10-30 functional volumes"));
    }

    #[test]
    fn test_anat_paragraph() {
        let ds = Dataset::new();
        ds.image(
            "sub-01/anat/sub-01_T1w.nii.gz",
            json!({"RepetitionTime": 2.3, "EchoTime": 0.00298, "FlipAngle": 9,
                   "ScanningSequence": "GR_IR", "SequenceVariant": "SK_SP_MP"}),
        );
        let loader = StubLoader::new().with(
            "sub-01_T1w.nii.gz",
            ImageHeader::new(vec![176, 256, 256], vec![1.0, 1.0, 1.0]),
        );

        let text = &parse(&ds, &loader)[0];
        assert!(text.starts_with(
            "One run of T1-weighted segmented k-space, spoiled, and MAG prepared gradient recalled and inversion recovery (GR/IR) single-echo structural MRI data"
        ));
        assert!(text.contains("256 slices"));
        assert!(text.contains("TR=2300ms"));
        assert!(text.contains("TE=2.98ms"));
    }

    #[test]
    fn test_dwi_paragraph() {
        let ds = Dataset::new();
        ds.image(
            "sub-01/dwi/sub-01_dwi.nii.gz",
            json!({"RepetitionTime": 8.0, "EchoTime": 0.09, "ScanningSequence": "EP"}),
        );
        ds.write("sub-01/dwi/sub-01_dwi.bval", "0 1000 1000 2000");
        let loader = StubLoader::new().with(
            "sub-01_dwi.nii.gz",
            ImageHeader::new(vec![96, 96, 60, 65], vec![2.0, 2.0, 2.0, 8.0]),
        );

        let text = &parse(&ds, &loader)[0];
        assert!(text.contains("b-values of 0, 1000, and 2000 acquired"));
        assert!(text.contains("65 diffusion directions"));
    }

    #[test]
    fn test_fmap_paragraph() {
        let ds = Dataset::new();
        ds.image("sub-01/func/sub-01_task-rest_run-2_bold.nii.gz", json!({}));
        ds.image(
            "sub-01/fmap/sub-01_phasediff.nii.gz",
            json!({
                "EchoTime1": 0.00492,
                "EchoTime2": 0.00738,
                "PhaseEncodingDirection": "j-",
                "IntendedFor": "func/sub-01_task-rest_run-2_bold.nii.gz",
                "MultibandAccelerationFactor": 3,
            }),
        );
        ds.image("sub-01/fmap/sub-01_magnitude1.nii.gz", json!({}));

        let layout = ds.layout();
        let converters = Converters::bundled().unwrap();
        let renderer = Renderer::bundled();
        let loader = StubLoader::new();
        let parser = Parser::new(&layout, &loader, &converters, &renderer);
        let fmap = layout.get(&Query::new().is("datatype", "fmap").one_of("extension", NIFTI_EXTENSIONS));

        let paragraphs = parser.parse_files(&fmap).unwrap();
        assert_eq!(paragraphs.len(), 1);
        let text = &paragraphs[0];
        assert!(text.contains("phase encoding: anterior to posterior"));
        assert!(text.contains("TE 1/2=4.92/7.38ms"));
        assert!(text.contains("; MB factor=3)"));
        assert!(text.ends_with("was acquired for the second run of the rest BOLD scan."));
    }

    #[test]
    fn test_unsupported_groups_are_empty() {
        let ds = Dataset::new();
        ds.image("sub-01/pet/sub-01_pet.nii.gz", json!({}));
        ds.image("sub-01/fmap/sub-01_epi.nii.gz", json!({}));

        let paragraphs = parse(&ds, &StubLoader::new());
        assert_eq!(paragraphs, vec![String::new(), String::new()]);
    }

    #[test]
    fn test_device_info_defaults() {
        let mut data = DescriptionData::new();
        device_info(&Metadata::new(), &mut data);
        assert_eq!(data.get("manufacturer"), Some("MANUFACTURER"));
        assert_eq!(data.get("model_name"), Some("MODEL"));
    }

    #[test]
    fn test_bval_path() {
        assert_eq!(
            bval_path(Path::new("/ds/sub-01/dwi/sub-01_dwi.nii.gz")),
            PathBuf::from("/ds/sub-01/dwi/sub-01_dwi.bval")
        );
        assert_eq!(
            bval_path(Path::new("/ds/sub-01_dwi.nii")),
            PathBuf::from("/ds/sub-01_dwi.bval")
        );
    }
}
