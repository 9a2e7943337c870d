use anyhow::{ensure, Context, Result};
use csv::{ReaderBuilder, Trim, Writer, WriterBuilder};
use physio_lib::MetricsFrame;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Appends every emitted metrics frame to a TSV file.
///
/// Columns: `onset` (seconds since start), then `<rate>` and `<var>` per
/// monitored channel, e.g. `hr`, `hrv`, `br`, `brv`.
pub struct MetricsRecorder {
    writer: Writer<File>,
    path: PathBuf,
    channels: usize,
    rows: usize,
}

impl MetricsRecorder {
    pub fn create(path: &Path, columns: &[(&str, &str)]) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("creating metrics recording {}", path.display()))?;
        let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(file);
        let mut header = vec!["onset".to_string()];
        for (rate, var) in columns {
            header.push(rate.to_lowercase());
            header.push(var.to_lowercase());
        }
        writer.write_record(&header)?;
        writer.flush()?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            channels: columns.len(),
            rows: 0,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn append(&mut self, onset: f64, frames: &[MetricsFrame]) -> Result<()> {
        ensure!(
            frames.len() == self.channels,
            "recording expects {} frame(s) per row, got {}",
            self.channels,
            frames.len()
        );
        let mut record = Vec::with_capacity(1 + frames.len() * 2);
        record.push(format!("{onset:.3}"));
        for frame in frames {
            record.push(frame.rate_per_min.to_string());
            record.push(frame.variability_ms.to_string());
        }
        self.writer
            .write_record(&record)
            .with_context(|| format!("writing {}", self.path.display()))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }
}

/// One row read back from a metrics recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRow {
    pub onset: f64,
    pub frames: Vec<MetricsFrame>,
}

pub fn read_metrics_tsv(path: &Path) -> Result<Vec<RecordedRow>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(Trim::All)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening metrics {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("parsing metrics row {}", idx + 1))?;
        let values = record
            .iter()
            .map(|v| v.parse::<f64>())
            .collect::<std::result::Result<Vec<f64>, _>>()
            .with_context(|| format!("non-numeric value in metrics row {}", idx + 1))?;
        ensure!(
            values.len() % 2 == 1,
            "metrics row {} has {} columns",
            idx + 1,
            values.len()
        );
        let frames = values[1..]
            .chunks(2)
            .map(|pair| MetricsFrame {
                rate_per_min: pair[0],
                variability_ms: pair[1],
            })
            .collect();
        rows.push(RecordedRow {
            onset: values[0],
            frames,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_and_reads_frames() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.tsv");
        let mut rec = MetricsRecorder::create(&path, &[("HR", "HRV"), ("BR", "BRV")]).unwrap();
        let frames = [
            MetricsFrame {
                rate_per_min: 71.5,
                variability_ms: 12.25,
            },
            MetricsFrame::ZERO,
        ];
        rec.append(1.0, &frames).unwrap();
        assert!(rec.append(2.0, &frames[..1]).is_err());
        assert_eq!(rec.rows(), 1);

        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("onset\thr\thrv\tbr\tbrv"));
        let rows = read_metrics_tsv(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].onset, 1.0);
        assert_eq!(rows[0].frames, frames.to_vec());
    }
}
