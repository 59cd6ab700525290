use crate::data::{LookupError, Provider};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use yaml_rust::Yaml;

/// File-based implementation of Provider
/// Answers lookups from a YAML mapping of keys to scalar values
///
/// The file is read on every call, which is exactly the kind of slow backend
/// a caching proxy is meant to sit in front of.
#[derive(Clone, Debug)]
pub struct YamlTableProvider {
    table_path: PathBuf,
}

impl YamlTableProvider {
    /// Creates a new YamlTableProvider
    ///
    /// # Arguments
    /// * `table_path` - Path to the YAML table file
    pub fn new(table_path: impl Into<PathBuf>) -> Self {
        Self {
            table_path: table_path.into(),
        }
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }

    /// Loads the table from the file
    fn load_table(&self, key: &str) -> Result<HashMap<String, String>, LookupError> {
        let content = fs::read_to_string(&self.table_path).map_err(|e| {
            LookupError::failed(
                key,
                format!("Failed to read table {}: {}", self.table_path.display(), e),
            )
        })?;

        parse_table(&content).map_err(|reason| LookupError::failed(key, reason))
    }
}

impl Provider for YamlTableProvider {
    fn get(&self, key: &str) -> Result<String, LookupError> {
        tracing::debug!(
            "[YamlTableProvider] get, key={}, table={}",
            key,
            self.table_path.display()
        );

        let mut table = self.load_table(key)?;
        table.remove(key).ok_or_else(|| {
            LookupError::failed(
                key,
                format!("No entry in table {}", self.table_path.display()),
            )
        })
    }
}

/// Parses the YAML table into a HashMap
/// Scalar values (strings, numbers, booleans) are kept as text; nested values are skipped
fn parse_table(yaml_content: &str) -> Result<HashMap<String, String>, String> {
    use yaml_rust::YamlLoader;

    let docs =
        YamlLoader::load_from_str(yaml_content).map_err(|e| format!("Invalid table YAML: {}", e))?;

    let mut table = HashMap::new();

    let Some(doc) = docs.first() else {
        return Ok(table);
    };

    let Some(hash) = doc.as_hash() else {
        return Err("Table YAML must be a mapping of keys to values".to_string());
    };

    for (key, value) in hash {
        let (Some(k), Some(v)) = (scalar_text(key), scalar_text(value)) else {
            tracing::warn!(
                "[YamlTableProvider] parse_table, skipping non-scalar entry, key={:?}",
                key
            );
            continue;
        };
        table.insert(k, v);
    }

    Ok(table)
}

fn scalar_text(value: &Yaml) -> Option<String> {
    match value {
        Yaml::String(s) | Yaml::Real(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}
