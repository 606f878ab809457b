use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::RegistryError;

use super::company::{CompanyRecord, COLUMNS};
use super::parse::{format_row, is_header, split_row};

/// The on-disk company registry.
///
/// Every merge rewrites the whole file. There is exactly one writer (the
/// queue worker), so no file locking is done.
pub struct CompanyRegistry {
    path: PathBuf,
}

impl CompanyRegistry {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all records in file order. A missing file is an empty registry.
    pub fn load(&self) -> Result<Vec<CompanyRecord>, RegistryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|e| RegistryError::Read {
            path: self.path.clone(),
            source: e,
        })?;

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || (index == 0 && is_header(line)) {
                continue;
            }

            let mut fields = split_row(line);
            if fields.len() < COLUMNS.len() - 1 || fields.len() > COLUMNS.len() {
                return Err(RegistryError::CorruptRow {
                    row: index + 1,
                    reason: format!(
                        "expected {} fields, found {}",
                        COLUMNS.len(),
                        fields.len()
                    ),
                });
            }
            fields.resize(COLUMNS.len(), String::new());

            let mut fields = fields.into_iter();
            let mut next = || fields.next().unwrap_or_default();
            records.push(CompanyRecord {
                company_id: next(),
                company_name: next(),
                country: next(),
                website: next(),
                ir_url: next(),
            });
        }

        Ok(records)
    }

    /// Merges `companies` into the registry, last write wins per `company_id`.
    ///
    /// Existing rows keep their position; unseen ids are appended. The file is
    /// written to a sibling temp file and renamed into place. Returns the ids
    /// of the merged records in input order.
    pub fn merge(&self, companies: &[CompanyRecord]) -> Result<Vec<String>, RegistryError> {
        let mut records = self.load()?;
        let mut index: HashMap<String, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.company_id.clone(), i))
            .collect();

        for company in companies {
            match index.get(&company.company_id) {
                Some(&i) => records[i] = company.clone(),
                None => {
                    index.insert(company.company_id.clone(), records.len());
                    records.push(company.clone());
                }
            }
        }

        self.write_all(&records)?;

        Ok(companies.iter().map(|c| c.company_id.clone()).collect())
    }

    fn write_all(&self, records: &[CompanyRecord]) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| RegistryError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let mut content = COLUMNS.join(";");
        content.push('\n');
        for record in records {
            content.push_str(&format_row(&record.columns()));
            content.push('\n');
        }

        let tmp_path = self.path.with_extension("csv.tmp");
        std::fs::write(&tmp_path, content).map_err(|e| RegistryError::Write {
            path: tmp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| RegistryError::Write {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}
