// src/table/write.rs

use anyhow::{bail, Context, Result};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

use super::Table;

impl Table {
    /// Write the header and all rows as CSV. Missing cells become empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        if self.width() > 0 {
            wtr.write_record(self.columns())
                .context("writing CSV header")?;
        }
        for (idx, row) in self.rows().iter().enumerate() {
            wtr.write_record(row.iter().map(|c| c.as_deref().unwrap_or("")))
                .with_context(|| format!("writing CSV row {}", idx))?;
        }
        wtr.flush().context("flushing CSV writer")?;
        Ok(())
    }

    /// Write CSV to `path` atomically: to a tmp file, then rename over the target.
    pub fn write_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let tmp_path = tmp_path_for(path);
        let file = File::create(&tmp_path)
            .with_context(|| format!("creating {:?}", tmp_path))?;
        self.write_csv(file)?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("renaming {:?} -> {:?}", tmp_path, path))?;
        debug!(path = %path.display(), rows = self.len(), "wrote csv");
        Ok(())
    }

    /// Write a single Snappy-compressed Parquet file with Utf8 columns.
    pub fn write_parquet<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if self.width() == 0 {
            bail!("refusing to write {:?}: table has no columns", path);
        }

        let batch = self.to_record_batch()?;
        let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
            .context("creating Arrow writer")?;
        writer.write(&batch).context("writing parquet batch")?;
        writer.close().context("closing parquet writer")?;
        debug!(path = %path.display(), rows = self.len(), "wrote parquet");
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "table.csv".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}
