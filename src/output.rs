use std::{fs::File, io::BufWriter, path::Path};

use anyhow::Result;
use std::io::Write;

use crate::settings::Settings;
use crate::sweep::SweepRecord;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn sweep_table_round_trip() {
        let records = vec![
            SweepRecord {
                width_nm: 100,
                n_eff: 1.5123,
                a_eff: 0.0712,
            },
            SweepRecord {
                width_nm: 110,
                n_eff: 1.5531,
                a_eff: 0.0698,
            },
        ];
        let dir = std::env::temp_dir().join("modesweep_output_test");
        std::fs::create_dir_all(&dir).unwrap();
        write_sweep(&records, &dir).unwrap();

        let contents = std::fs::read_to_string(dir.join("sweep_results")).unwrap();
        let rows: Vec<&str> = contents.lines().filter(|l| !l.is_empty()).collect();
        assert_eq!(rows.len(), records.len());
        let fields: Vec<&str> = rows[0].split_whitespace().collect();
        assert_eq!(fields[0], "100");
        assert_eq!(fields.len(), 3);
    }
}

/// Write the accepted sweep records against the width bins.
/// One row per width: width (nm), effective index, effective area.
pub fn write_sweep(records: &[SweepRecord], directory: &Path) -> Result<()> {
    let file = File::create(directory.join("sweep_results"))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        writeln!(
            writer,
            "{} {} {}",
            record.width_nm, record.n_eff, record.a_eff
        )?;
    }

    Ok(())
}

/// Echo the effective settings next to the results for reproducibility.
pub fn write_settings(settings: &Settings, directory: &Path) -> Result<()> {
    let file = File::create(directory.join("settings.toml"))?;
    let mut writer = BufWriter::new(file);
    write!(writer, "{}", toml::to_string(settings)?)?;
    Ok(())
}
