use std::fs;
use std::path::{Path, PathBuf};

use geosync_core::document::OsmDocument;
use geosync_core::ports::BatchExporter;

use crate::xml;

const GENERATOR: &str = concat!("geosync/", env!("CARGO_PKG_VERSION"));

/// Batch exporter writing one `<name>.osm.xml` file per document into the
/// gen directory.
pub struct XmlFileExporter {
    gen_dir: PathBuf,
    successes: u64,
    failures: u64,
}

impl XmlFileExporter {
    pub fn new(gen_dir: impl Into<PathBuf>) -> Self {
        Self {
            gen_dir: gen_dir.into(),
            successes: 0,
            failures: 0,
        }
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Log the write totals at the end of a run.
    pub fn close(&self) {
        log::info!("=== Closing batch exporter ===");
        log::info!("Total of writing successes: {}", self.successes);
        log::info!("Total of writing failures: {}", self.failures);
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.gen_dir.join(format!("{name}.osm.xml"))
    }

    fn try_write(&self, path: &Path, document: &OsmDocument) -> Result<(), String> {
        let body = xml::to_xml(document, GENERATOR, None).map_err(|e| e.to_string())?;
        fs::create_dir_all(&self.gen_dir).map_err(|e| e.to_string())?;
        fs::write(path, body).map_err(|e| e.to_string())
    }
}

impl BatchExporter for XmlFileExporter {
    fn write(&mut self, name: &str, document: &OsmDocument) -> bool {
        let path = self.file_path(name);
        match self.try_write(&path, document) {
            Ok(()) => {
                self.successes += 1;
                log::info!("file {} has been created", path.display());
                true
            }
            Err(err) => {
                self.failures += 1;
                log::error!("unable to write {}: {err}", path.display());
                false
            }
        }
    }
}
