// src/templates/store.rs
//! Directory of JSON template records, one `<gesture>.json` per gesture

use crate::config::constants::sensor::{FEATURE_COUNT, SENSOR_COLUMNS};
use crate::config::constants::templates::TEMPLATE_EXTENSION;
use crate::config::TemplateStoreConfig;
use crate::error::{GestureResult, ResultExt};
use crate::processing::{NormalizedMatrix, FEATURE_PIPELINE_VERSION};
use crate::templates::{GestureTemplate, TemplateError, TemplateMetadata, TemplateSet};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Serialized form of a [`GestureTemplate`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub gesture_name: String,
    pub feature_version: u32,
    pub template_length: usize,
    pub sensor_columns: Vec<String>,
    pub variants: Vec<Vec<[f64; FEATURE_COUNT]>>,
    pub metadata: TemplateMetadata,
    pub checksum: u32,
}

impl TemplateRecord {
    pub fn from_template(template: &GestureTemplate) -> Self {
        let variants: Vec<Vec<[f64; FEATURE_COUNT]>> = template
            .variants()
            .iter()
            .map(|matrix| {
                matrix
                    .as_array()
                    .rows()
                    .into_iter()
                    .map(|row| {
                        let mut values = [0.0; FEATURE_COUNT];
                        for (slot, value) in values.iter_mut().zip(row.iter()) {
                            *slot = *value;
                        }
                        values
                    })
                    .collect()
            })
            .collect();

        Self {
            gesture_name: template.name().to_string(),
            feature_version: FEATURE_PIPELINE_VERSION,
            template_length: template.template_length(),
            sensor_columns: SENSOR_COLUMNS.iter().map(|c| c.to_string()).collect(),
            checksum: variants_checksum(&variants),
            variants,
            metadata: template.metadata().clone(),
        }
    }

    /// Validate and rebuild the in-memory template
    pub fn into_template(self) -> Result<GestureTemplate, TemplateError> {
        if self.feature_version != FEATURE_PIPELINE_VERSION {
            return Err(TemplateError::FeatureVersionMismatch {
                gesture: self.gesture_name,
                expected: FEATURE_PIPELINE_VERSION,
                found: self.feature_version,
            });
        }

        let computed = variants_checksum(&self.variants);
        if computed != self.checksum {
            return Err(TemplateError::ChecksumMismatch {
                gesture: self.gesture_name,
                stored: self.checksum,
                computed,
            });
        }

        let mut matrices = Vec::with_capacity(self.variants.len());
        for (variant, rows) in self.variants.iter().enumerate() {
            if rows.len() != self.template_length {
                return Err(TemplateError::BadShape {
                    gesture: self.gesture_name,
                    variant,
                    expected: self.template_length,
                    actual: rows.len(),
                });
            }
            let flat: Vec<f64> = rows.iter().flat_map(|row| row.iter().copied()).collect();
            let matrix = Array2::from_shape_vec((rows.len(), FEATURE_COUNT), flat).map_err(|_| {
                TemplateError::BadShape {
                    gesture: self.gesture_name.clone(),
                    variant,
                    expected: self.template_length,
                    actual: rows.len(),
                }
            })?;
            matrices.push(NormalizedMatrix::from_stored(matrix));
        }

        GestureTemplate::new(self.gesture_name, self.template_length, matrices, self.metadata)
    }
}

/// CRC-32 over every variant value as little-endian bytes, in storage order
pub fn variants_checksum(variants: &[Vec<[f64; FEATURE_COUNT]>]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for row in variants.iter().flatten() {
        for value in row {
            hasher.update(&value.to_le_bytes());
        }
    }
    hasher.finalize()
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    directory: PathBuf,
}

impl TemplateStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn from_config(config: &TemplateStoreConfig) -> Self {
        Self::new(config.directory.clone())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, TemplateError> {
        validate_name(name)?;
        Ok(self.directory.join(format!("{}.{}", name, TEMPLATE_EXTENSION)))
    }

    /// Gesture names with a record in the directory, sorted; a missing directory is empty
    pub fn list(&self) -> Result<Vec<String>, TemplateError> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(TemplateError::Io {
                    path: self.directory.clone(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| TemplateError::Io {
                path: self.directory.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn load(&self, name: &str) -> Result<GestureTemplate, TemplateError> {
        let path = self.path_for(name)?;
        let text = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound(name.to_string())
            } else {
                TemplateError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let record: TemplateRecord =
            serde_json::from_str(&text).map_err(|source| TemplateError::Json {
                path: path.clone(),
                source,
            })?;

        let template = record.into_template()?;
        debug!(
            gesture = template.name(),
            variants = template.variants().len(),
            length = template.template_length(),
            "loaded template"
        );
        Ok(template)
    }

    pub fn load_all(&self) -> Result<Vec<GestureTemplate>, TemplateError> {
        self.list()?.iter().map(|name| self.load(name)).collect()
    }

    /// Missing names are skipped with a warning; finding none of them is an error
    pub fn load_selected(&self, names: &[String]) -> Result<Vec<GestureTemplate>, TemplateError> {
        let mut templates = Vec::with_capacity(names.len());
        for name in names {
            match self.load(name) {
                Ok(template) => templates.push(template),
                Err(TemplateError::NotFound(missing)) => {
                    warn!(gesture = %missing, directory = %self.directory.display(), "template not found, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        if templates.is_empty() && !names.is_empty() {
            return Err(TemplateError::NoneFound(names.to_vec()));
        }
        Ok(templates)
    }

    /// Load the requested gestures (all when `names` is empty) into a validated set
    pub fn load_set(&self, names: &[String]) -> GestureResult<TemplateSet> {
        let templates = if names.is_empty() {
            self.load_all()
        } else {
            self.load_selected(names)
        }
        .context("templates", "load_set")?;
        let set = TemplateSet::new(templates).context("templates", "load_set")?;
        info!(
            gestures = ?set.names().collect::<Vec<_>>(),
            template_length = set.template_length(),
            "template set ready"
        );
        Ok(set)
    }

    /// Writes `<name>.json.tmp`, then renames it over the record
    pub fn save(&self, template: &GestureTemplate) -> Result<PathBuf, TemplateError> {
        let path = self.path_for(template.name())?;
        fs::create_dir_all(&self.directory).map_err(|source| TemplateError::Io {
            path: self.directory.clone(),
            source,
        })?;

        let record = TemplateRecord::from_template(template);
        let json = serde_json::to_string_pretty(&record).map_err(|source| TemplateError::Json {
            path: path.clone(),
            source,
        })?;

        let tmp_path = path.with_extension(format!("{}.tmp", TEMPLATE_EXTENSION));
        fs::write(&tmp_path, json).map_err(|source| TemplateError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| TemplateError::Io {
            path: path.clone(),
            source,
        })?;

        info!(gesture = template.name(), path = %path.display(), "template saved");
        Ok(path)
    }

    pub fn remove(&self, name: &str) -> Result<(), TemplateError> {
        let path = self.path_for(name)?;
        fs::remove_file(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound(name.to_string())
            } else {
                TemplateError::Io { path, source }
            }
        })?;
        info!(gesture = name, "template removed");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), TemplateError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(TemplateError::InvalidName(name.to_string()))
    }
}
