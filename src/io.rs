// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::Path;

use ndarray::{ArrayD, IxDyn, ShapeBuilder};
use tracing::debug;

use crate::core::GridData;
use crate::error::{EikonalError, Result};
use crate::marcher::MarchingOutput;

/// Variable name looked up in `.mat` speed files.
pub const MAT_SPEED_VARIABLE: &str = "speed";

/// Supported file formats for grid I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5). Read only.
    Mat,
}

/// Infer file format from extension.
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some(ext) => Err(EikonalError::UnsupportedFileFormat(ext.to_string())),
        None => Err(EikonalError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Load a scalar field from a .npy file in row-major order.
///
/// `f32` arrays are promoted to `f64`.
pub fn load_npy_field(path: &Path, expected_shape: &[usize]) -> Result<Vec<f64>> {
    let arr: ArrayD<f64> = match ndarray_npy::read_npy(path) {
        Ok(a) => a,
        Err(_) => {
            let arr32: ArrayD<f32> = ndarray_npy::read_npy(path)
                .map_err(|e| EikonalError::UnsupportedDtype(e.to_string()))?;
            arr32.mapv(f64::from)
        }
    };

    if arr.shape() != expected_shape {
        return Err(EikonalError::ShapeMismatch {
            expected: expected_shape.to_vec(),
            got: arr.shape().to_vec(),
        });
    }

    // Fortran-ordered files must be relaid out before taking the buffer.
    Ok(arr.as_standard_layout().into_owned().into_raw_vec())
}

/// Load a scalar field stored as `variable_name` in a .mat file.
///
/// MAT arrays are column-major. The stored shape may equal `expected_shape`
/// or its reverse; either way the result is row-major in `expected_shape`.
pub fn load_mat_field(
    path: &Path,
    variable_name: &str,
    expected_shape: &[usize],
) -> Result<Vec<f64>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| EikonalError::Other(format!("MAT parse error: {}", e)))?;

    let array = mat.find_by_name(variable_name).ok_or_else(|| {
        EikonalError::MatVariableNotFound {
            expected: variable_name.to_string(),
            available: mat.arrays().iter().map(|a| a.name().to_string()).collect(),
        }
    })?;

    let data: Vec<f64> = match array.data() {
        matfile::NumericData::Double { real, .. } => real.clone(),
        matfile::NumericData::Single { real, .. } => real.iter().map(|&v| f64::from(v)).collect(),
        _ => {
            return Err(EikonalError::UnsupportedDtype(
                "MAT array is not double or single".to_string(),
            ))
        }
    };

    let mat_shape = array.size().to_vec();
    let reversed: Vec<usize> = expected_shape.iter().rev().copied().collect();
    let transpose = if mat_shape == expected_shape {
        false
    } else if mat_shape == reversed {
        true
    } else {
        return Err(EikonalError::ShapeMismatch {
            expected: expected_shape.to_vec(),
            got: mat_shape,
        });
    };

    let arr = ArrayD::from_shape_vec(IxDyn(&mat_shape).f(), data)
        .map_err(|e| EikonalError::Other(format!("shape error: {}", e)))?;
    let arr = if transpose { arr.reversed_axes() } else { arr };

    Ok(arr.as_standard_layout().into_owned().into_raw_vec())
}

/// Load a speed field, inferring the format from the extension.
///
/// `.mat` files must hold a variable named [`MAT_SPEED_VARIABLE`].
pub fn load_speed_field(path: &Path, expected_shape: &[usize]) -> Result<Vec<f64>> {
    let field = match infer_format(path)? {
        FileFormat::Npy => load_npy_field(path, expected_shape)?,
        FileFormat::Mat => load_mat_field(path, MAT_SPEED_VARIABLE, expected_shape)?,
    };
    debug!(path = %path.display(), nodes = field.len(), "loaded speed field");
    Ok(field)
}

fn write_npy(path: &Path, shape: Vec<usize>, data: Vec<f64>) -> Result<()> {
    let arr = ArrayD::from_shape_vec(IxDyn(&shape), data)
        .map_err(|e| EikonalError::Other(format!("shape error: {}", e)))?;
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| EikonalError::Other(format!("npy write error: {}", e)))?;
    debug!(path = %path.display(), shape = ?shape, "wrote npy array");
    Ok(())
}

fn require_npy(path: &Path) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => Ok(()),
        FileFormat::Mat => Err(EikonalError::UnsupportedFileFormat(
            "mat (writing is not supported)".to_string(),
        )),
    }
}

/// Save the arrival times of a run to a .npy file with the grid's shape.
pub fn save_arrival_times<const N: usize>(output: &MarchingOutput<N>, path: &Path) -> Result<()> {
    require_npy(path)?;
    write_npy(
        path,
        output.grid().shape().to_vec(),
        output.arrival_times().to_vec(),
    )
}

/// Save the gradient of a run to a .npy file of shape `[..grid shape, N]`.
pub fn save_gradient<const N: usize>(output: &MarchingOutput<N>, path: &Path) -> Result<()> {
    require_npy(path)?;
    let gradient = output.gradient().ok_or_else(|| {
        EikonalError::Other("gradient generation was not enabled".to_string())
    })?;

    let mut shape = output.grid().shape().to_vec();
    shape.push(N);
    let data = gradient.iter().flatten().copied().collect();
    write_npy(path, shape, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Node;
    use crate::marcher::FastMarching;
    use approx::assert_relative_eq;

    fn small_run(gradient: bool) -> MarchingOutput<2> {
        FastMarching::<2>::new()
            .with_output_size([4, 5])
            .with_speed_constant(1.0)
            .with_trial_points([Node::new([0, 0], 0.0)])
            .with_gradient(gradient)
            .run()
            .unwrap()
    }

    #[test]
    fn arrival_times_npy_roundtrip() {
        let out = small_run(false);
        let tmp = std::env::temp_dir().join("eikonal_fmm_arrival_roundtrip.npy");
        out.save(&tmp).unwrap();

        let loaded = load_npy_field(&tmp, &[4, 5]).unwrap();
        assert_eq!(loaded.len(), 20);
        for (a, b) in loaded.iter().zip(out.arrival_times()) {
            assert_relative_eq!(*a, *b);
        }
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn npy_shape_mismatch() {
        let out = small_run(false);
        let tmp = std::env::temp_dir().join("eikonal_fmm_shape_mismatch.npy");
        out.save(&tmp).unwrap();

        let result = load_npy_field(&tmp, &[5, 4]);
        assert!(matches!(result, Err(EikonalError::ShapeMismatch { .. })));
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn f32_speed_is_promoted() {
        let tmp = std::env::temp_dir().join("eikonal_fmm_f32_speed.npy");
        let arr = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0f32, 2.0, 0.5, 4.0, 0.0, 1.5])
            .unwrap();
        ndarray_npy::write_npy(&tmp, &arr).unwrap();

        let speed = load_speed_field(&tmp, &[2, 3]).unwrap();
        assert_eq!(speed, vec![1.0, 2.0, 0.5, 4.0, 0.0, 1.5]);
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn gradient_has_trailing_axis() {
        let out = small_run(true);
        let tmp = std::env::temp_dir().join("eikonal_fmm_gradient.npy");
        out.save_gradient(&tmp).unwrap();

        let arr: ArrayD<f64> = ndarray_npy::read_npy(&tmp).unwrap();
        assert_eq!(arr.shape(), &[4, 5, 2]);
        let expected = out.gradient_at([2, 3]).unwrap();
        assert_relative_eq!(arr[[2, 3, 0]], expected[0]);
        assert_relative_eq!(arr[[2, 3, 1]], expected[1]);
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn gradient_save_requires_gradient() {
        let out = small_run(false);
        let tmp = std::env::temp_dir().join("eikonal_fmm_no_gradient.npy");
        assert!(matches!(
            out.save_gradient(&tmp),
            Err(EikonalError::Other(_))
        ));
        assert!(!tmp.exists());
    }

    #[test]
    fn mat_output_is_rejected() {
        let out = small_run(false);
        let tmp = std::env::temp_dir().join("eikonal_fmm_output.mat");
        assert!(matches!(
            out.save(&tmp),
            Err(EikonalError::UnsupportedFileFormat(_))
        ));
    }

    #[test]
    fn missing_mat_file_is_io_error() {
        let path = std::env::temp_dir().join("eikonal_fmm_does_not_exist.mat");
        assert!(matches!(
            load_speed_field(&path, &[2, 2]),
            Err(EikonalError::IoError(_))
        ));
    }

    /// 3x4 double array `speed` with entries `10 * i + j + 1`.
    const SPEED_3X4_MAT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/speed_3x4.mat");

    fn speed_3x4(i: usize, j: usize) -> f64 {
        (10 * i + j + 1) as f64
    }

    #[test]
    fn mat_field_matching_shape_is_row_major() {
        let field = load_speed_field(Path::new(SPEED_3X4_MAT), &[3, 4]).unwrap();
        let expected: Vec<f64> = (0..3)
            .flat_map(|i| (0..4).map(move |j| speed_3x4(i, j)))
            .collect();
        assert_eq!(field, expected);
    }

    #[test]
    fn mat_field_reversed_shape_is_transposed() {
        let field = load_mat_field(Path::new(SPEED_3X4_MAT), MAT_SPEED_VARIABLE, &[4, 3]).unwrap();
        assert_eq!(field.len(), 12);
        for j in 0..4 {
            for i in 0..3 {
                assert_eq!(field[j * 3 + i], speed_3x4(i, j));
            }
        }
    }

    #[test]
    fn mat_missing_variable_lists_available() {
        match load_mat_field(Path::new(SPEED_3X4_MAT), "velocity", &[3, 4]) {
            Err(EikonalError::MatVariableNotFound {
                expected,
                available,
            }) => {
                assert_eq!(expected, "velocity");
                assert_eq!(available, vec!["speed".to_string()]);
            }
            other => panic!("expected MatVariableNotFound, got {:?}", other),
        }
    }

    #[test]
    fn mat_shape_mismatch() {
        assert!(matches!(
            load_mat_field(Path::new(SPEED_3X4_MAT), MAT_SPEED_VARIABLE, &[2, 6]),
            Err(EikonalError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn mat_speed_drives_the_solver() {
        let speed = load_speed_field(Path::new(SPEED_3X4_MAT), &[3, 4]).unwrap();
        let out = FastMarching::<2>::new()
            .with_output_size([3, 4])
            .with_speed_field(speed)
            .with_trial_points([Node::new([0, 0], 0.0)])
            .run()
            .unwrap();
        // Speed at [0, 1] is 2.
        assert_relative_eq!(out.arrival_time([0, 1]), 0.5);
        assert_eq!(out.nodes_frozen(), 12);
    }

    #[test]
    fn unsupported_format() {
        assert_eq!(infer_format(Path::new("speed.npy")).unwrap(), FileFormat::Npy);
        assert_eq!(infer_format(Path::new("speed.mat")).unwrap(), FileFormat::Mat);
        assert!(matches!(
            infer_format(Path::new("test.xyz")),
            Err(EikonalError::UnsupportedFileFormat(_))
        ));
        assert!(matches!(
            infer_format(Path::new("noext")),
            Err(EikonalError::UnsupportedFileFormat(_))
        ));
    }
}
