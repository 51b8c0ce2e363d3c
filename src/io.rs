// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Reading cost fields and writing potential fields.
//!
//! Arrays on disk are indexed `[y, x]` (shape `[ny, nx]`), which matches the
//! row-major node layout of [`Grid`]. Unreached nodes are written as `inf`.

use std::io::Write;
use std::path::Path;

use ndarray::{Array2, ArrayD, IxDyn, ShapeBuilder};

use crate::core::Grid;
use crate::cost::GridCost;
use crate::error::{EikonalError, Result};

/// MAT variable name holding a cost field.
pub const COST_VARIABLE: &str = "cost";
/// MAT variable name holding a speed field.
pub const SPEED_VARIABLE: &str = "speed";
/// MAT variable name written for the potential field.
pub const POTENTIAL_VARIABLE: &str = "potential";

/// Supported file formats for field I/O.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy .npy format.
    Npy,
    /// MATLAB .mat format (Level 5).
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

fn field_shape(grid: &Grid) -> [usize; 2] {
    let [nx, ny] = grid.num_points();
    [ny, nx]
}

/// Load a row-major field of shape `[ny, nx]` from a .npy file.
pub fn load_npy_field(path: &Path, grid: &Grid) -> Result<Vec<f64>> {
    let arr: ArrayD<f64> = match ndarray_npy::read_npy(path) {
        Ok(a) => a,
        Err(_) => {
            let arr32: ArrayD<f32> = ndarray_npy::read_npy(path)
                .map_err(|e| EikonalError::UnsupportedDtype(format!("{}", e)))?;
            arr32.mapv(|v| v as f64)
        }
    };

    let expected = field_shape(grid);
    if arr.shape() != &expected[..] {
        return Err(EikonalError::ShapeMismatch {
            expected: expected.to_vec(),
            got: arr.shape().to_vec(),
        });
    }

    // Fortran-order files would otherwise come out column-major.
    Ok(arr.as_standard_layout().to_owned().into_raw_vec())
}

/// Load a row-major field of shape `[ny, nx]` from a .mat file.
///
/// MAT arrays are column-major; both `[ny, nx]` and the transposed `[nx, ny]`
/// layouts are accepted.
pub fn load_mat_field(path: &Path, variable_name: &str, grid: &Grid) -> Result<Vec<f64>> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| EikonalError::Other(format!("MAT parse error: {}", e)))?;

    let array = mat
        .find_by_name(variable_name)
        .ok_or_else(|| EikonalError::MatVariableNotFound {
            expected: variable_name.to_string(),
            available: mat.arrays().iter().map(|a| a.name().to_string()).collect(),
        })?;

    let data: Vec<f64> = match array.data() {
        matfile::NumericData::Double { real, imag: _ } => real.clone(),
        matfile::NumericData::Single { real, imag: _ } => real.iter().map(|&v| v as f64).collect(),
        _ => {
            return Err(EikonalError::UnsupportedDtype(
                "MAT file array is not f64 or f32".to_string(),
            ))
        }
    };

    let expected = field_shape(grid);
    let transposed = [expected[1], expected[0]];
    let mat_shape = array.size().to_vec();
    if mat_shape != expected && mat_shape != transposed {
        return Err(EikonalError::ShapeMismatch {
            expected: expected.to_vec(),
            got: mat_shape,
        });
    }

    let arr = ArrayD::from_shape_vec(IxDyn(&mat_shape).f(), data)
        .map_err(|e| EikonalError::Other(format!("shape error: {}", e)))?;
    let arr = if mat_shape == expected {
        arr
    } else {
        arr.reversed_axes()
    };
    Ok(arr.as_standard_layout().to_owned().into_raw_vec())
}

/// Convert a speed field to costs (element-wise `1 / v`).
///
/// Zero speed becomes an impassable `+inf` cost.
///
/// # Errors
/// Returns an error for negative or NaN speeds.
pub fn speed_to_cost(grid: &Grid, speed: &[f64]) -> Result<Vec<f64>> {
    speed
        .iter()
        .enumerate()
        .map(|(index, &v)| {
            if v.is_nan() || v < 0.0 {
                Err(EikonalError::InvalidCost {
                    point: grid.point_to_coord(grid.node(index)),
                    value: v,
                })
            } else {
                Ok(1.0 / v)
            }
        })
        .collect()
}

/// Load a cost lattice matching `grid`, inferring format from extension.
pub fn load_cost(path: &Path, grid: &Grid) -> Result<GridCost> {
    let values = match infer_format(path)? {
        FileFormat::Npy => load_npy_field(path, grid)?,
        FileFormat::Mat => load_mat_field(path, COST_VARIABLE, grid)?,
    };
    GridCost::new(grid, values)
}

/// Load a speed field matching `grid` and convert it to a cost lattice.
pub fn load_speed_as_cost(path: &Path, grid: &Grid) -> Result<GridCost> {
    let speed = match infer_format(path)? {
        FileFormat::Npy => load_npy_field(path, grid)?,
        FileFormat::Mat => load_mat_field(path, SPEED_VARIABLE, grid)?,
    };
    GridCost::new(grid, speed_to_cost(grid, &speed)?)
}

/// Save the grid potentials to a .npy file.
pub fn save_npy(grid: &Grid, path: &Path) -> Result<()> {
    ndarray_npy::write_npy(path, &grid.to_array())
        .map_err(|e| EikonalError::Other(format!("npy write error: {}", e)))
}

/// Save the grid potentials to a .mat file (Level 5, uncompressed).
///
/// The `matfile` crate only reads, so the writer is hand-rolled. It emits a
/// single real double array.
pub fn save_mat(grid: &Grid, path: &Path, var_name: &str) -> Result<()> {
    let arr: Array2<f64> = grid.to_array();
    let col_major: Vec<f64> = arr.t().as_standard_layout().to_owned().into_raw_vec();
    let [ny, nx] = field_shape(grid);
    write_mat_level5(path, var_name, &[ny, nx], &col_major)
}

/// Save the grid potentials, inferring format from extension.
pub fn save_field(grid: &Grid, path: &Path) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => save_npy(grid, path),
        FileFormat::Mat => save_mat(grid, path, POTENTIAL_VARIABLE),
    }
}

const MI_INT8: u32 = 1;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MX_DOUBLE_CLASS: u32 = 6;

fn padded(len: u32) -> u32 {
    len.div_ceil(8) * 8
}

fn write_element<W: Write>(w: &mut W, data_type: u32, bytes: &[u8]) -> Result<()> {
    let len = bytes.len() as u32;
    w.write_all(&data_type.to_le_bytes())?;
    w.write_all(&len.to_le_bytes())?;
    w.write_all(bytes)?;
    w.write_all(&vec![0u8; (padded(len) - len) as usize])?;
    Ok(())
}

/// Write one `miMATRIX` element holding a column-major double array.
fn write_mat_level5(path: &Path, var_name: &str, dimensions: &[usize], data: &[f64]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);

    // 116 bytes of text, 8 bytes subsystem offset, version, endian marker
    let mut header = [b' '; 116];
    let desc = b"MATLAB 5.0 MAT-file, created by eikonal-fmm";
    header[..desc.len()].copy_from_slice(desc);
    w.write_all(&header)?;
    w.write_all(&[0u8; 8])?;
    w.write_all(&0x0100u16.to_le_bytes())?;
    w.write_all(b"IM")?;

    let flags: Vec<u8> = [MX_DOUBLE_CLASS, 0]
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();
    let dims: Vec<u8> = dimensions
        .iter()
        .flat_map(|&d| (d as i32).to_le_bytes())
        .collect();
    let name = var_name.as_bytes();
    let real: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();

    let body: u32 = [flags.len(), dims.len(), name.len(), real.len()]
        .iter()
        .map(|&len| 8 + padded(len as u32))
        .sum();
    w.write_all(&MI_MATRIX.to_le_bytes())?;
    w.write_all(&body.to_le_bytes())?;
    write_element(&mut w, MI_UINT32, &flags)?;
    write_element(&mut w, MI_INT32, &dims)?;
    write_element(&mut w, MI_INT8, name)?;
    write_element(&mut w, MI_DOUBLE, &real)?;

    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CellState, CellTag};
    use crate::cost::CostFunction;

    /// 4x3 grid whose node `i` holds potential `i`, node 0 left unreached.
    fn numbered_grid() -> Grid {
        let mut grid = Grid::new([4, 3], 1.0, [0.0, 0.0]).unwrap();
        for i in 1..grid.num_nodes() {
            let node = grid.node(i);
            grid.set_state(
                node,
                CellState {
                    potential: i as f64,
                    tag: CellTag::Reached,
                },
            );
        }
        grid
    }

    #[test]
    fn npy_roundtrip() {
        let grid = numbered_grid();
        let tmp = std::env::temp_dir().join("eikonal_fmm_roundtrip.npy");
        save_field(&grid, &tmp).unwrap();

        let loaded = load_npy_field(&tmp, &grid).unwrap();
        assert!(loaded[0].is_infinite());
        for (i, v) in loaded.iter().enumerate().skip(1) {
            assert_eq!(*v, i as f64, "mismatch at {}", i);
        }
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn npy_shape_mismatch() {
        let grid = numbered_grid();
        let tmp = std::env::temp_dir().join("eikonal_fmm_shape_mismatch.npy");
        save_npy(&grid, &tmp).unwrap();

        let other = Grid::new([3, 4], 1.0, [0.0, 0.0]).unwrap();
        let result = load_npy_field(&tmp, &other);
        assert!(matches!(result, Err(EikonalError::ShapeMismatch { .. })));
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_write_read_values() {
        let grid = numbered_grid();
        let tmp = std::env::temp_dir().join("eikonal_fmm_values.mat");
        save_mat(&grid, &tmp, "potential").unwrap();

        let file = std::fs::File::open(&tmp).unwrap();
        let mut reader = std::io::BufReader::new(file);
        let mat = matfile::MatFile::parse(&mut reader).unwrap();
        let arr = mat.find_by_name("potential").unwrap();
        assert_eq!(arr.size().to_vec(), vec![3, 4]);

        let loaded = load_mat_field(&tmp, "potential", &grid).unwrap();
        for (i, v) in loaded.iter().enumerate().skip(1) {
            assert_eq!(*v, i as f64, "mat mismatch at {}", i);
        }
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn mat_missing_variable() {
        let grid = numbered_grid();
        let tmp = std::env::temp_dir().join("eikonal_fmm_missing_var.mat");
        save_mat(&grid, &tmp, "potential").unwrap();
        let result = load_mat_field(&tmp, COST_VARIABLE, &grid);
        assert!(matches!(
            result,
            Err(EikonalError::MatVariableNotFound { ref available, .. }) if available == &["potential"]
        ));
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn load_cost_from_npy() {
        let grid = Grid::new([3, 2], 0.5, [0.0, 0.0]).unwrap();
        let values = Array2::from_shape_vec((2, 3), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let tmp = std::env::temp_dir().join("eikonal_fmm_cost.npy");
        ndarray_npy::write_npy(&tmp, &values).unwrap();

        let cost = load_cost(&tmp, &grid).unwrap();
        assert_eq!(cost.get([2, 0]), Some(3.0));
        assert_eq!(cost.get([0, 1]), Some(4.0));
        assert_eq!(cost.cost_at([1.0, 0.5]), 6.0);
        std::fs::remove_file(&tmp).ok();
    }

    #[test]
    fn speed_to_cost_conversion() {
        let grid = Grid::new([2, 2], 1.0, [0.0, 0.0]).unwrap();
        let cost = speed_to_cost(&grid, &[1.0, 2.0, 4.0, 0.0]).unwrap();
        assert_eq!(&cost[..3], &[1.0, 0.5, 0.25]);
        assert!(cost[3].is_infinite());

        let result = speed_to_cost(&grid, &[1.0, -1.0, 2.0, 2.0]);
        assert!(matches!(
            result,
            Err(EikonalError::InvalidCost { point, .. }) if point == [1.0, 0.0]
        ));
    }

    #[test]
    fn unsupported_format() {
        let result = infer_format(Path::new("field.xyz"));
        assert!(matches!(
            result,
            Err(EikonalError::UnsupportedFileFormat(_))
        ));
        assert!(infer_format(Path::new("field")).is_err());
    }
}
