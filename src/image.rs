//! Image header decoding.
//!
//! Only the header is read; voxel data is never loaded.

use crate::models::ImageHeader;
use nifti::NiftiHeader;
use std::path::Path;
use tracing::debug;

/// Decodes image geometry. Missing or malformed files yield `None`.
pub trait ImageLoader {
    fn try_load(&self, path: &Path) -> Option<ImageHeader>;
}

/// Header-only NIfTI-1/NIfTI-2 reader (`.nii` and `.nii.gz`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiLoader;

impl ImageLoader for NiftiLoader {
    fn try_load(&self, path: &Path) -> Option<ImageHeader> {
        match NiftiHeader::from_file(path) {
            Ok(header) => Some(header_geometry(&header)),
            Err(e) => {
                debug!("Cannot decode {}: {}", path.display(), e);
                None
            }
        }
    }
}

fn header_geometry(header: &NiftiHeader) -> ImageHeader {
    let ndim = (header.dim[0] as usize).clamp(1, 7);
    let shape = header.dim[1..=ndim].iter().map(|&d| d as usize).collect();
    let zooms = header.pixdim[1..=ndim].iter().map(|&z| z as f64).collect();
    ImageHeader::new(shape, zooms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Minimal little-endian NIfTI-1 single file header.
    fn nifti1_header(dims: &[i16], pixdim: &[f32]) -> Vec<u8> {
        let mut buf = vec![0u8; 352];
        buf[0..4].copy_from_slice(&348i32.to_le_bytes());

        let mut dim = [1i16; 8];
        dim[0] = dims.len() as i16;
        dim[1..=dims.len()].copy_from_slice(dims);
        for (i, d) in dim.iter().enumerate() {
            buf[40 + 2 * i..42 + 2 * i].copy_from_slice(&d.to_le_bytes());
        }

        buf[70..72].copy_from_slice(&16i16.to_le_bytes()); // FLOAT32
        buf[72..74].copy_from_slice(&32i16.to_le_bytes());

        let mut pix = [1f32; 8];
        pix[1..=pixdim.len()].copy_from_slice(pixdim);
        for (i, p) in pix.iter().enumerate() {
            buf[76 + 4 * i..80 + 4 * i].copy_from_slice(&p.to_le_bytes());
        }

        buf[108..112].copy_from_slice(&352f32.to_le_bytes());
        buf[112..116].copy_from_slice(&1f32.to_le_bytes());
        buf[344..348].copy_from_slice(b"n+1\0");
        buf
    }

    #[test]
    fn test_load_nifti_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub-01_task-rest_bold.nii");
        fs::write(&path, nifti1_header(&[64, 64, 32, 10], &[2.0, 2.0, 2.5, 2.0])).unwrap();

        let header = NiftiLoader.try_load(&path).unwrap();
        assert_eq!(header.shape, vec![64, 64, 32, 10]);
        assert_eq!(header.zooms[..3], [2.0, 2.0, 2.5]);
        assert_eq!(header.volumes(), 10);
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(NiftiLoader.try_load(&dir.path().join("absent.nii.gz")).is_none());
    }

    #[test]
    fn test_empty_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub-01_T1w.nii.gz");
        fs::write(&path, b"").unwrap();
        assert!(NiftiLoader.try_load(&path).is_none());
    }
}
