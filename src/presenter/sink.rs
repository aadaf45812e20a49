use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{info, warn};

use crate::presenter::chart::ChartSpec;
use crate::processor::ProcessorError;

/// External visualization sink that receives finished chart specs
pub trait ChartSink {
    fn render(&mut self, spec: &ChartSpec) -> Result<(), ProcessorError>;
}

/// Writes each chart as `<out_dir>/<output>.json`
///
/// The directory is created on the first write. Charts with no data or no
/// output stem are skipped.
#[derive(Debug)]
pub struct JsonFileSink {
    out_dir: PathBuf,
    written: Vec<PathBuf>,
}

impl JsonFileSink {
    pub fn new(out_dir: &Path) -> Self {
        Self {
            out_dir: out_dir.to_path_buf(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ChartSink for JsonFileSink {
    fn render(&mut self, spec: &ChartSpec) -> Result<(), ProcessorError> {
        let Some(stem) = spec.output.as_deref() else {
            warn!(title = %spec.title, "chart has no output destination; skipping");
            return Ok(());
        };
        if spec.is_empty() {
            info!(title = %spec.title, "no data; chart skipped");
            return Ok(());
        }

        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(format!("{}.json", stem));
        fs::write(&path, serde_json::to_vec_pretty(spec)?)?;
        info!(path = %path.display(), "chart written");

        self.written.push(path);
        Ok(())
    }
}

/// Keeps every spec in memory, empty ones included
#[derive(Debug, Default)]
pub struct MemorySink {
    pub charts: Vec<ChartSpec>,
}

impl ChartSink for MemorySink {
    fn render(&mut self, spec: &ChartSpec) -> Result<(), ProcessorError> {
        self.charts.push(spec.clone());
        Ok(())
    }
}
