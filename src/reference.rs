use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[cfg(test)]
mod tests {

    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", contents).unwrap();
        path
    }

    #[test]
    fn loads_two_columns_with_header() {
        let path = write_temp(
            "modesweep_ref_ok.csv",
            "width,neff\n100,1.45\n200,1.62\n300,1.80\n",
        );
        let data = ReferenceData::from_csv(&path).unwrap();
        assert_eq!(data.x.len(), data.y.len());
        assert_eq!(data.x, vec![100.0, 200.0, 300.0]);
        assert_eq!(data.y[2], 1.80);
    }

    #[test]
    fn rejects_ragged_rows() {
        let path = write_temp("modesweep_ref_ragged.csv", "100,1.45\n200\n");
        assert!(ReferenceData::from_csv(&path).is_err());
    }

    #[test]
    fn rejects_non_numeric_data_rows() {
        let path = write_temp("modesweep_ref_nan.csv", "width,neff\n100,abc\n");
        assert!(ReferenceData::from_csv(&path).is_err());
    }

    #[test]
    fn skips_blank_lines() {
        let path = write_temp("modesweep_ref_blank.csv", "1,2\n\n3,4\n");
        let data = ReferenceData::from_csv(&path).unwrap();
        assert_eq!(data.x, vec![1.0, 3.0]);
        assert_eq!(data.y, vec![2.0, 4.0]);
    }
}

/// Two-column reference measurements loaded from a CSV file.
/// The two columns always have equal length by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ReferenceData {
    /// Reads (x, y) pairs from a comma-separated file. A single leading
    /// header line is tolerated; every other row must hold exactly two
    /// numeric fields.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open reference file {:?}", path))?;
        let reader = BufReader::new(file);

        let mut x = Vec::new();
        let mut y = Vec::new();

        for (line_number, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
            if fields.len() != 2 {
                return Err(anyhow!(
                    "{:?}:{}: expected two columns, got {}",
                    path,
                    line_number + 1,
                    fields.len()
                ));
            }

            match (fields[0].parse::<f64>(), fields[1].parse::<f64>()) {
                (Ok(a), Ok(b)) => {
                    x.push(a);
                    y.push(b);
                }
                _ if line_number == 0 => continue, // header row
                _ => {
                    return Err(anyhow!(
                        "{:?}:{}: non-numeric data row '{}'",
                        path,
                        line_number + 1,
                        trimmed
                    ));
                }
            }
        }

        if x.is_empty() {
            return Err(anyhow!("{:?}: no data rows", path));
        }

        Ok(Self { x, y })
    }
}
