use super::{FieldContainer, display_path};
use crate::domain::{PostError, PostResult};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue {
    Int(i64),
    Float(f64),
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum DatasetValue {
    Int(Vec<i32>),
    Float(Vec<f64>),
}

/// Container held entirely in memory; used for tests and for data that
/// was produced in-process rather than loaded from disk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryContainer {
    label: String,
    attributes: BTreeMap<(String, String), AttributeValue>,
    datasets: BTreeMap<String, DatasetValue>,
}

impl MemoryContainer {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(
        mut self,
        path: &str,
        name: &str,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.set_attribute(path, name, value);
        self
    }

    pub fn with_dataset_i32(mut self, path: &str, values: Vec<i32>) -> Self {
        self.datasets
            .insert(path.to_string(), DatasetValue::Int(values));
        self
    }

    pub fn with_dataset_f64(mut self, path: &str, values: Vec<f64>) -> Self {
        self.datasets
            .insert(path.to_string(), DatasetValue::Float(values));
        self
    }

    pub fn set_attribute(&mut self, path: &str, name: &str, value: impl Into<AttributeValue>) {
        self.attributes
            .insert((path.to_string(), name.to_string()), value.into());
    }

    fn attribute(&self, path: &str, name: &str) -> Option<AttributeValue> {
        self.attributes
            .get(&(path.to_string(), name.to_string()))
            .copied()
    }

    fn type_error(&self, path: &str, expected: &str) -> PostError {
        PostError::format(
            "FORMAT.CONTAINER_TYPE",
            format!(
                "'{}' in {} does not hold {} data",
                display_path(path),
                self.label,
                expected
            ),
        )
    }
}

impl FieldContainer for MemoryContainer {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn contains(&self, path: &str) -> bool {
        if path.is_empty() {
            return true;
        }
        let prefix = format!("{path}/");
        self.datasets
            .keys()
            .any(|key| key == path || key.starts_with(&prefix))
            || self
                .attributes
                .keys()
                .any(|(key, _)| key == path || key.starts_with(&prefix))
    }

    fn attribute_i64(&self, path: &str, name: &str) -> PostResult<Option<i64>> {
        match self.attribute(path, name) {
            None => Ok(None),
            Some(AttributeValue::Int(value)) => Ok(Some(value)),
            Some(AttributeValue::Float(value)) if value.fract() == 0.0 && value.is_finite() => {
                Ok(Some(value as i64))
            }
            Some(AttributeValue::Float(_)) => Err(self.type_error(path, "integer")),
        }
    }

    fn attribute_f64(&self, path: &str, name: &str) -> PostResult<Option<f64>> {
        Ok(self.attribute(path, name).map(|value| match value {
            AttributeValue::Int(value) => value as f64,
            AttributeValue::Float(value) => value,
        }))
    }

    fn dataset_i32(&self, path: &str) -> PostResult<Option<Vec<i32>>> {
        match self.datasets.get(path) {
            None => Ok(None),
            Some(DatasetValue::Int(values)) => Ok(Some(values.clone())),
            Some(DatasetValue::Float(_)) => Err(self.type_error(path, "integer")),
        }
    }

    fn dataset_f64(&self, path: &str) -> PostResult<Option<Vec<f64>>> {
        match self.datasets.get(path) {
            None => Ok(None),
            Some(DatasetValue::Float(values)) => Ok(Some(values.clone())),
            Some(DatasetValue::Int(values)) => {
                Ok(Some(values.iter().map(|value| f64::from(*value)).collect()))
            }
        }
    }
}
