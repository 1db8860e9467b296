//! ESRI ASCII grid format support.
//!
//! A file starts with a header of `key value` lines followed by `nrows` rows
//! of `ncols` values, northernmost row first:
//!
//! ```text
//! ncols        4
//! nrows        3
//! xllcorner    500000.0
//! yllcorner    4100000.0
//! cellsize     30
//! NODATA_value -9999
//! 812.5 813.0 815.25 -9999
//! ...
//! ```
//!
//! Keys are case-insensitive. `xllcenter`/`yllcenter` are accepted in place of
//! the corner keys and converted to corner coordinates. `NODATA_value` is
//! optional and defaults to `-9999`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::debug;

use crate::error::{DenoiseError, Result};
use crate::grid::{Grid, HeightGrid, DEFAULT_NO_DATA};

/// Load a grid from an ASCII grid file.
///
/// # Example
///
/// ```no_run
/// use terrace::io::asc;
///
/// let grid = asc::load("dem.asc").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Grid> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let grid = read(BufReader::new(file)).map_err(|e| match e {
        DenoiseError::InvalidGrid(message) => DenoiseError::load(path, message),
        other => other,
    })?;
    debug!(
        "loaded {}x{} grid from {}",
        grid.nx(),
        grid.ny(),
        path.display()
    );
    Ok(grid)
}

/// Parse an ASCII grid from `reader`.
pub fn read<R: Read>(mut reader: R) -> Result<Grid> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    let mut tokens = text.split_whitespace().peekable();

    let mut header = Header::default();
    while let Some(token) = tokens.peek() {
        if !token.starts_with(|c: char| c.is_ascii_alphabetic()) || token.parse::<f64>().is_ok() {
            break;
        }
        let key = token.to_ascii_lowercase();
        tokens.next();
        let value = tokens
            .next()
            .ok_or_else(|| invalid(format!("missing value for header key '{}'", key)))?;
        header.set(&key, value)?;
    }

    let nx = header.ncols.ok_or_else(|| invalid("missing 'ncols'"))?;
    let ny = header.nrows.ok_or_else(|| invalid("missing 'nrows'"))?;
    let cell_size = header.cellsize.ok_or_else(|| invalid("missing 'cellsize'"))?;
    let (xll, yll) = header.lower_left(cell_size)?;
    let no_data = header.nodata.unwrap_or(DEFAULT_NO_DATA);

    let total = nx
        .checked_mul(ny)
        .ok_or_else(|| invalid(format!("grid size {} x {} is too large", nx, ny)))?;
    let values: Vec<&str> = tokens.collect();
    if values.len() != total {
        return Err(invalid(format!(
            "expected {} values, found {}",
            total,
            values.len()
        )));
    }

    let mut data = Vec::with_capacity(total);
    // The file lists the northern row first; row 0 of the grid is southern
    if nx > 0 {
        for row in values.chunks(nx).rev() {
            for token in row {
                data.push(parse_f64("value", token)?);
            }
        }
    }
    Ok(Grid::from_vec(nx, ny, cell_size, data)?
        .with_origin(xll, yll)
        .with_no_data(no_data))
}

/// Save a grid to an ASCII grid file.
pub fn save<G: HeightGrid + ?Sized, P: AsRef<Path>>(grid: &G, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write(grid, &mut writer)?;
    writer.flush()?;
    debug!(
        "saved {}x{} grid to {}",
        grid.nx(),
        grid.ny(),
        path.display()
    );
    Ok(())
}

/// Write `grid` in ASCII grid format. No-data cells are written as the
/// grid's no-data value.
pub fn write<G: HeightGrid + ?Sized, W: Write>(grid: &G, writer: &mut W) -> Result<()> {
    let (xll, yll) = grid.origin();
    let no_data = grid.no_data_value();

    writeln!(writer, "ncols {}", grid.nx())?;
    writeln!(writer, "nrows {}", grid.ny())?;
    writeln!(writer, "xllcorner {}", xll)?;
    writeln!(writer, "yllcorner {}", yll)?;
    writeln!(writer, "cellsize {}", grid.cell_size())?;
    writeln!(writer, "NODATA_value {}", no_data)?;

    for y in (0..grid.ny()).rev() {
        for x in 0..grid.nx() {
            if x > 0 {
                write!(writer, " ")?;
            }
            if grid.is_no_data(x, y) {
                write!(writer, "{}", no_data)?;
            } else {
                write!(writer, "{}", grid.value(x, y))?;
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(f64, bool)>,
    yll: Option<(f64, bool)>,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

impl Header {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "ncols" => self.ncols = Some(parse_usize(key, value)?),
            "nrows" => self.nrows = Some(parse_usize(key, value)?),
            "xllcorner" => self.xll = Some((parse_f64(key, value)?, false)),
            "xllcenter" => self.xll = Some((parse_f64(key, value)?, true)),
            "yllcorner" => self.yll = Some((parse_f64(key, value)?, false)),
            "yllcenter" => self.yll = Some((parse_f64(key, value)?, true)),
            "cellsize" => self.cellsize = Some(parse_f64(key, value)?),
            "nodata_value" => self.nodata = Some(parse_f64(key, value)?),
            _ => return Err(invalid(format!("unknown header key '{}'", key))),
        }
        Ok(())
    }

    /// Lower-left corner, shifting centre coordinates by half a cell.
    fn lower_left(&self, cell_size: f64) -> Result<(f64, f64)> {
        let corner = |v: Option<(f64, bool)>, name: &str| match v {
            Some((v, true)) => Ok(v - 0.5 * cell_size),
            Some((v, false)) => Ok(v),
            None => Err(invalid(format!("missing '{}corner' or '{}center'", name, name))),
        };
        Ok((corner(self.xll, "xll")?, corner(self.yll, "yll")?))
    }
}

fn invalid(message: impl Into<String>) -> DenoiseError {
    DenoiseError::InvalidGrid(message.into())
}

fn parse_usize(key: &str, value: &str) -> Result<usize> {
    value
        .parse()
        .map_err(|_| invalid(format!("invalid {} '{}'", key, value)))
}

fn parse_f64(key: &str, value: &str) -> Result<f64> {
    value
        .parse()
        .map_err(|_| invalid(format!("invalid {} '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::HeightGridMut;

    const SAMPLE: &str = "\
ncols 3
nrows 2
xllcorner 100.0
yllcorner 200.0
cellsize 10
NODATA_value -1
1 2 3
4 -1 6
";

    #[test]
    fn test_read_sample() {
        let grid = read(SAMPLE.as_bytes()).unwrap();

        assert_eq!((grid.nx(), grid.ny()), (3, 2));
        assert_eq!(grid.cell_size(), 10.0);
        assert_eq!(grid.origin(), (100.0, 200.0));
        assert_eq!(grid.no_data_value(), -1.0);
        // First file row is the northern (top) row
        assert_eq!(grid.value(0, 1), 1.0);
        assert_eq!(grid.value(2, 1), 3.0);
        assert_eq!(grid.value(0, 0), 4.0);
        assert!(grid.is_no_data(1, 0));
    }

    #[test]
    fn test_read_center_keys_and_default_no_data() {
        let text = "NCOLS 2\nNROWS 1\nXLLCENTER 5\nYLLCENTER 5\nCELLSIZE 10\n-9999 7.5\n";
        let grid = read(text.as_bytes()).unwrap();

        assert_eq!(grid.origin(), (0.0, 0.0));
        assert_eq!(grid.no_data_value(), DEFAULT_NO_DATA);
        assert!(grid.is_no_data(0, 0));
        assert_eq!(grid.value(1, 0), 7.5);
    }

    #[test]
    fn test_read_errors() {
        let cases = [
            "nrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n",
            "ncols 2\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n",
            "ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2\n",
            "ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\nabc\n",
            "ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\ndx 1\n1\n",
            "ncols 1\nnrows 1\ncellsize 1\n1\n",
        ];
        for text in cases {
            let err = read(text.as_bytes()).unwrap_err();
            assert!(matches!(err, DenoiseError::InvalidGrid(_)), "{:?}", text);
        }
    }

    #[test]
    fn test_oversized_header_is_rejected() {
        let cases = [
            "ncols 1\nnrows 18446744073709551615\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n",
            "ncols 4294967296\nnrows 4294967296\nxllcorner 0\nyllcorner 0\ncellsize 1\n1\n",
            "ncols 4294967296\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n",
        ];
        for text in cases {
            let err = read(text.as_bytes()).unwrap_err();
            assert!(matches!(err, DenoiseError::InvalidGrid(_)), "{:?}", text);
        }
    }

    #[test]
    fn test_file_round_trip() {
        let mut grid = Grid::from_vec(3, 2, 2.5, vec![1.25, -3.0, 1e6, 0.1, 7.0, 8.0])
            .unwrap()
            .with_origin(-50.0, 75.5);
        grid.set_no_data(1, 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dem.asc");
        save(&grid, &path).unwrap();
        let back = load(&path).unwrap();

        assert_eq!(back, grid);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.asc");
        std::fs::write(&path, "ncols 2\n").unwrap();

        match load(&path).unwrap_err() {
            DenoiseError::LoadError { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
