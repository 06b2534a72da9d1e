//! Resource attributes describing the reporting process.

use crate::error::ResourceError;
use opentelemetry::{Key, KeyValue, Value};
use opentelemetry_sdk::Resource;
use std::collections::BTreeMap;

/// Immutable set of identifying attributes with an optional schema URL.
///
/// Sets are combined with [`AttributeSet::merge`], which never mutates either
/// side. Duplicate keys resolve to the incoming value.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSet {
    attributes: BTreeMap<Key, Value>,
    schema_url: Option<String>,
}

impl AttributeSet {
    /// An attribute set with no attributes and no schema.
    pub fn empty() -> Self {
        Self {
            attributes: BTreeMap::new(),
            schema_url: None,
        }
    }

    /// Builds a schemaless set from key/value pairs.
    pub fn new<I>(attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        Self {
            attributes: attributes.into_iter().map(|kv| (kv.key, kv.value)).collect(),
            schema_url: None,
        }
    }

    /// Returns a copy of this set bound to `schema_url`.
    pub fn with_schema_url(mut self, schema_url: impl Into<String>) -> Self {
        self.schema_url = Some(schema_url.into());
        self
    }

    /// The schema URL, if any.
    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }

    /// Looks up a single attribute.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(&Key::from(key.to_owned()))
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the set carries no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterates attributes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.attributes.iter()
    }

    /// Merges `other` into a new set.
    ///
    /// Values from `other` win on duplicate keys. When both sets declare a
    /// schema URL they must agree.
    pub fn merge(&self, other: &AttributeSet) -> Result<AttributeSet, ResourceError> {
        let schema_url = match (&self.schema_url, &other.schema_url) {
            (Some(left), Some(right)) if left != right => {
                return Err(ResourceError::SchemaConflict {
                    left: left.clone(),
                    right: right.clone(),
                });
            }
            (Some(url), _) | (None, Some(url)) => Some(url.clone()),
            (None, None) => None,
        };

        let mut attributes = self.attributes.clone();
        attributes.extend(
            other
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        Ok(AttributeSet {
            attributes,
            schema_url,
        })
    }

    /// Converts the set into an SDK [`Resource`].
    pub fn to_resource(&self) -> Resource {
        let attributes: Vec<KeyValue> = self
            .attributes
            .iter()
            .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
            .collect();

        let builder = Resource::builder_empty();
        match &self.schema_url {
            Some(url) => builder.with_schema_url(attributes, url.clone()),
            None => builder.with_attributes(attributes),
        }
        .build()
    }
}

impl Default for AttributeSet {
    /// The SDK's default resource: service name, SDK name, language and version.
    fn default() -> Self {
        Self::from(&Resource::builder().build())
    }
}

impl From<&Resource> for AttributeSet {
    fn from(resource: &Resource) -> Self {
        Self {
            attributes: resource
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            schema_url: resource.schema_url().map(str::to_owned),
        }
    }
}

impl FromIterator<KeyValue> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = KeyValue>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Source of resource attributes, consulted once while options are applied.
pub trait Detector: Send + Sync {
    /// Detects attributes describing the current process.
    fn detect(&self) -> Result<AttributeSet, ResourceError>;
}

impl<F> Detector for F
where
    F: Fn() -> Result<AttributeSet, ResourceError> + Send + Sync,
{
    fn detect(&self) -> Result<AttributeSet, ResourceError> {
        self()
    }
}

/// Detector that always yields the same attributes.
#[derive(Debug, Clone)]
pub struct StaticDetector(AttributeSet);

impl StaticDetector {
    /// Wraps a fixed attribute set.
    pub fn new(attributes: AttributeSet) -> Self {
        Self(attributes)
    }
}

impl Detector for StaticDetector {
    fn detect(&self) -> Result<AttributeSet, ResourceError> {
        Ok(self.0.clone())
    }
}
