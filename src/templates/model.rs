// src/templates/model.rs
//! Read-only template types shared with the recognizer

use crate::config::ConfigError;
use crate::processing::NormalizedMatrix;
use crate::templates::TemplateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub created_at_nanos: u64,
    pub samples_used: usize,
    pub avg_activity: f64,
}

/// One gesture: one or more normalized variants of identical length
#[derive(Debug, Clone, PartialEq)]
pub struct GestureTemplate {
    name: String,
    template_length: usize,
    variants: Vec<NormalizedMatrix>,
    metadata: TemplateMetadata,
}

impl GestureTemplate {
    pub fn new(
        name: impl Into<String>,
        template_length: usize,
        variants: Vec<NormalizedMatrix>,
        metadata: TemplateMetadata,
    ) -> Result<Self, TemplateError> {
        let name = name.into();
        if variants.is_empty() {
            return Err(TemplateError::NoVariants(name));
        }
        for (variant, matrix) in variants.iter().enumerate() {
            if matrix.rows() != template_length {
                return Err(TemplateError::BadShape {
                    gesture: name,
                    variant,
                    expected: template_length,
                    actual: matrix.rows(),
                });
            }
        }
        Ok(Self {
            name,
            template_length,
            variants,
            metadata,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template_length(&self) -> usize {
        self.template_length
    }

    pub fn variants(&self) -> &[NormalizedMatrix] {
        &self.variants
    }

    pub fn metadata(&self) -> &TemplateMetadata {
        &self.metadata
    }
}

/// All gestures known to a detector, keyed and iterated by name.
///
/// Built once at start-up and shared behind an `Arc`; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: BTreeMap<String, GestureTemplate>,
    template_length: usize,
}

impl TemplateSet {
    /// Rejects an empty set, duplicate names and templates of differing lengths
    pub fn new(templates: Vec<GestureTemplate>) -> Result<Self, ConfigError> {
        let template_length = match templates.first() {
            Some(first) => first.template_length(),
            None => return Err(ConfigError::NoTemplates),
        };

        let mut by_name = BTreeMap::new();
        for template in templates {
            if template.template_length() != template_length {
                return Err(ConfigError::TemplateLengthMismatch {
                    gesture: template.name().to_string(),
                    expected: template_length,
                    actual: template.template_length(),
                });
            }
            let name = template.name().to_string();
            if by_name.insert(name.clone(), template).is_some() {
                return Err(ConfigError::DuplicateGesture(name));
            }
        }

        Ok(Self {
            templates: by_name,
            template_length,
        })
    }

    pub fn template_length(&self) -> usize {
        self.template_length
    }

    /// Fails when the configured window length differs from the templates'
    pub fn ensure_length(&self, configured: usize) -> Result<(), ConfigError> {
        if configured != self.template_length {
            return Err(ConfigError::TemplateLengthConfigMismatch {
                configured,
                templates: self.template_length,
            });
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&GestureTemplate> {
        self.templates.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GestureTemplate> {
        self.templates.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn template(name: &str, length: usize) -> GestureTemplate {
        GestureTemplate::new(
            name,
            length,
            vec![NormalizedMatrix::from_stored(Array2::zeros((length, 8)))],
            TemplateMetadata::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_template_requires_variants() {
        let result = GestureTemplate::new("empty", 4, vec![], TemplateMetadata::default());
        assert!(matches!(result, Err(TemplateError::NoVariants(name)) if name == "empty"));
    }

    #[test]
    fn test_template_rejects_wrong_row_count() {
        let variants = vec![
            NormalizedMatrix::from_stored(Array2::zeros((4, 8))),
            NormalizedMatrix::from_stored(Array2::zeros((5, 8))),
        ];
        let result = GestureTemplate::new("g", 4, variants, TemplateMetadata::default());
        assert!(matches!(
            result,
            Err(TemplateError::BadShape { variant: 1, expected: 4, actual: 5, .. })
        ));
    }

    #[test]
    fn test_set_orders_by_name() {
        let set = TemplateSet::new(vec![template("b", 4), template("a", 4)]).unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(set.template_length(), 4);
        assert!(set.get("a").is_some());
    }

    #[test]
    fn test_set_rejects_empty() {
        assert!(matches!(TemplateSet::new(vec![]), Err(ConfigError::NoTemplates)));
    }

    #[test]
    fn test_set_rejects_duplicates() {
        let result = TemplateSet::new(vec![template("a", 4), template("a", 4)]);
        assert!(matches!(result, Err(ConfigError::DuplicateGesture(name)) if name == "a"));
    }

    #[test]
    fn test_set_rejects_length_mismatch() {
        let result = TemplateSet::new(vec![template("a", 4), template("b", 6)]);
        assert!(matches!(
            result,
            Err(ConfigError::TemplateLengthMismatch { expected: 4, actual: 6, .. })
        ));
    }

    #[test]
    fn test_configured_length_check() {
        let set = TemplateSet::new(vec![template("a", 4)]).unwrap();
        assert!(set.ensure_length(4).is_ok());
        assert!(matches!(
            set.ensure_length(80),
            Err(ConfigError::TemplateLengthConfigMismatch { configured: 80, templates: 4 })
        ));
    }
}
