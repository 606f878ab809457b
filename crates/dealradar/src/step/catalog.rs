//! The standard ingestion pipeline.

use std::path::Path;

use crate::config::StepConfig;

pub struct CatalogEntry {
    pub id: &'static str,
    pub script: &'static str,
    pub description: &'static str,
}

/// Steps in execution order.
pub const PIPELINE_STEPS: &[CatalogEntry] = &[
    CatalogEntry {
        id: "01_discover_ir",
        script: "01_discover_ir.py",
        description: "Discovering IR URLs...",
    },
    CatalogEntry {
        id: "02_pdf_links",
        script: "02_collect_pdf_links.py",
        description: "Collecting PDF links...",
    },
    CatalogEntry {
        id: "03_download",
        script: "03_download_pdfs.py",
        description: "Downloading PDFs...",
    },
    CatalogEntry {
        id: "04_extract",
        script: "04_extract_text.py",
        description: "Extracting text...",
    },
    CatalogEntry {
        id: "05_scan",
        script: "05_scan_reports.py",
        description: "Scanning for signals...",
    },
    CatalogEntry {
        id: "06_score",
        script: "06_score_and_export.py",
        description: "Scoring reports...",
    },
    CatalogEntry {
        id: "07_index",
        script: "07_build_index.py",
        description: "Building search index...",
    },
];

/// Builds step configs for the standard pipeline, each running
/// `interpreter <scripts_dir>/<script>`.
pub fn default_step_configs(interpreter: &str, scripts_dir: &Path) -> Vec<StepConfig> {
    PIPELINE_STEPS
        .iter()
        .map(|entry| StepConfig {
            id: entry.id.to_string(),
            description: entry.description.to_string(),
            program: interpreter.to_string(),
            args: vec![scripts_dir.join(entry.script).display().to_string()],
        })
        .collect()
}
