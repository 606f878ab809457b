use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Column order of the registry file and of batch submissions.
pub const COLUMNS: [&str; 5] = ["company_id", "company_name", "country", "website", "ir_url"];

/// Fields a manual submission must carry.
pub const REQUIRED_FIELDS: [&str; 4] = ["company_id", "company_name", "country", "website"];

/// A single loosely-typed company record as submitted by a caller.
pub type RawRecord = Map<String, Value>;

/// One company known to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Stable lowercase key, unique within the registry.
    pub company_id: String,
    pub company_name: String,
    /// ISO country code.
    pub country: String,
    pub website: String,
    /// Investor-relations URL; empty until discovered.
    #[serde(default)]
    pub ir_url: String,
}

impl CompanyRecord {
    pub fn new(
        company_id: impl Into<String>,
        company_name: impl Into<String>,
        country: impl Into<String>,
        website: impl Into<String>,
        ir_url: impl Into<String>,
    ) -> Self {
        Self {
            company_id: company_id.into(),
            company_name: company_name.into(),
            country: country.into(),
            website: website.into(),
            ir_url: ir_url.into(),
        }
    }

    /// Builds a record from a manual submission.
    ///
    /// All of [`REQUIRED_FIELDS`] must be present as strings. A missing or
    /// `null` `ir_url` becomes an empty string. The result must also pass
    /// [`CompanyRecord::validate`].
    pub fn from_raw(raw: &RawRecord) -> Result<Self, ValidationError> {
        let missing = missing_fields(raw);
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields { missing });
        }

        let field = |name: &str| -> Result<String, ValidationError> {
            match raw.get(name) {
                Some(Value::String(s)) => Ok(s.trim().to_string()),
                Some(Value::Null) | None => Ok(String::new()),
                Some(_) => Err(ValidationError::InvalidFieldType {
                    field: name.to_string(),
                }),
            }
        };

        let record = Self {
            company_id: field("company_id")?,
            company_name: field("company_name")?,
            country: field("country")?,
            website: field("website")?,
            ir_url: field("ir_url")?,
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks what every stored record must satisfy: a non-empty id and
    /// name, and no line breaks in any field.
    ///
    /// The registry is read one line per record, so a line break inside a
    /// field would make the whole file unreadable.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("company_id", &self.company_id),
            ("company_name", &self.company_name),
        ] {
            if value.is_empty() {
                return Err(ValidationError::EmptyField {
                    field: name.to_string(),
                });
            }
        }

        for (name, value) in COLUMNS.iter().zip(self.columns()) {
            if value.contains(['\n', '\r']) {
                return Err(ValidationError::LineBreak {
                    field: name.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Converts the record back into the loose submission shape.
    pub fn to_raw(&self) -> RawRecord {
        let mut raw = Map::new();
        raw.insert("company_id".into(), Value::String(self.company_id.clone()));
        raw.insert("company_name".into(), Value::String(self.company_name.clone()));
        raw.insert("country".into(), Value::String(self.country.clone()));
        raw.insert("website".into(), Value::String(self.website.clone()));
        raw.insert("ir_url".into(), Value::String(self.ir_url.clone()));
        raw
    }

    /// Field values in [`COLUMNS`] order.
    pub fn columns(&self) -> [&str; 5] {
        [
            &self.company_id,
            &self.company_name,
            &self.country,
            &self.website,
            &self.ir_url,
        ]
    }
}

/// Returns the required fields absent (or `null`) in `raw`, in declaration order.
pub fn missing_fields(raw: &RawRecord) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|name| raw.get(**name).is_none_or(Value::is_null))
        .map(|name| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_raw_complete() {
        let record = CompanyRecord::from_raw(&raw(json!({
            "company_id": "acme",
            "company_name": "Acme Corp",
            "country": "US",
            "website": "https://acme.com",
        })))
        .unwrap();

        assert_eq!(record.company_id, "acme");
        assert_eq!(record.company_name, "Acme Corp");
        assert_eq!(record.ir_url, "");
    }

    #[test]
    fn test_from_raw_null_ir_url() {
        let record = CompanyRecord::from_raw(&raw(json!({
            "company_id": "acme",
            "company_name": "Acme Corp",
            "country": "US",
            "website": "https://acme.com",
            "ir_url": null,
        })))
        .unwrap();
        assert_eq!(record.ir_url, "");
    }

    #[test]
    fn test_from_raw_missing_fields() {
        let err = CompanyRecord::from_raw(&raw(json!({
            "company_id": "acme",
            "company_name": "Acme Corp",
        })))
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::MissingFields {
                missing: vec!["country".to_string(), "website".to_string()],
            }
        );
        assert!(err.to_string().contains("country, website"));
    }

    #[test]
    fn test_from_raw_rejects_empty_id_and_name() {
        let err = CompanyRecord::from_raw(&raw(json!({
            "company_id": "",
            "company_name": "Acme Corp",
            "country": "US",
            "website": "https://acme.com",
        })))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::EmptyField {
                field: "company_id".to_string()
            }
        );

        let err = CompanyRecord::from_raw(&raw(json!({
            "company_id": "acme",
            "company_name": "   ",
            "country": "US",
            "website": "https://acme.com",
        })))
        .unwrap_err();
        assert_eq!(err.to_string(), "Field 'company_name' must not be empty");
    }

    #[test]
    fn test_from_raw_rejects_line_breaks() {
        let err = CompanyRecord::from_raw(&raw(json!({
            "company_id": "acme",
            "company_name": "Acme\nCorp",
            "country": "US",
            "website": "https://acme.com",
        })))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::LineBreak {
                field: "company_name".to_string()
            }
        );

        let err = CompanyRecord::from_raw(&raw(json!({
            "company_id": "acme",
            "company_name": "Acme Corp",
            "country": "US",
            "website": "https://acme.com",
            "ir_url": "https://ir.acme.com\r/reports",
        })))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::LineBreak {
                field: "ir_url".to_string()
            }
        );
    }

    #[test]
    fn test_from_raw_rejects_non_string() {
        let err = CompanyRecord::from_raw(&raw(json!({
            "company_id": 42,
            "company_name": "Acme Corp",
            "country": "US",
            "website": "https://acme.com",
        })))
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidFieldType {
                field: "company_id".to_string()
            }
        );
    }

    #[test]
    fn test_to_raw_includes_all_columns() {
        let record = CompanyRecord::new("acme", "Acme Corp", "US", "https://acme.com", "");
        let raw = record.to_raw();
        for column in COLUMNS {
            assert!(raw.contains_key(column), "missing {}", column);
        }
        assert_eq!(CompanyRecord::from_raw(&raw).unwrap(), record);
    }
}
