//! Property maps with deferred leaves

use crate::output::{Output, OutputValue};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Desired properties of a declaration
#[derive(Debug, Clone)]
pub struct PropertySet {
    /// The JSON object, resolved once every leaf is known
    pub value: Output<Value>,

    /// Top-level keys whose value is secret
    pub secret_keys: BTreeSet<String>,
}

impl PropertySet {
    pub fn empty() -> Self {
        Self {
            value: Output::new(Value::Object(Map::new())),
            secret_keys: BTreeSet::new(),
        }
    }
}

/// Conversion of typed resource arguments into a property set
pub trait IntoProperties {
    fn into_properties(self) -> PropertySet;
}

impl IntoProperties for PropertySet {
    fn into_properties(self) -> PropertySet {
        self
    }
}

impl IntoProperties for Props {
    fn into_properties(self) -> PropertySet {
        self.build()
    }
}

/// Builder for a JSON object whose values may be deferred
#[derive(Debug, Clone, Default)]
pub struct Props {
    entries: Vec<(String, Output<Value>)>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a deferred value
    pub fn set<T>(mut self, key: &str, value: &Output<T>) -> Self
    where
        T: OutputValue + Serialize,
    {
        self.entries.push((key.to_string(), value.to_json()));
        self
    }

    /// Set a literal value
    pub fn set_value(mut self, key: &str, value: impl Serialize) -> Self {
        let output = match serde_json::to_value(value) {
            Ok(value) => Output::new(value),
            Err(e) => Output::failed(format!("property '{}': {}", key, e)),
        };
        self.entries.push((key.to_string(), output));
        self
    }

    /// Set a deferred value, or leave the key out entirely when `None`
    pub fn set_opt<T>(self, key: &str, value: Option<&Output<T>>) -> Self
    where
        T: OutputValue + Serialize,
    {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    /// Set a nested object
    pub fn set_props(mut self, key: &str, nested: Props) -> Self {
        self.entries.push((key.to_string(), nested.build().value));
        self
    }

    /// Set a list of nested objects
    pub fn set_list(mut self, key: &str, items: Vec<Props>) -> Self {
        let items = items.into_iter().map(|item| item.build().value);
        self.entries
            .push((key.to_string(), Output::all(items).apply(Value::Array)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Combine every entry into one deferred JSON object
    pub fn build(self) -> PropertySet {
        let secret_keys = self
            .entries
            .iter()
            .filter(|(_, value)| value.is_secret())
            .map(|(key, _)| key.clone())
            .collect();
        let (keys, values): (Vec<String>, Vec<Output<Value>>) = self.entries.into_iter().unzip();
        let value = Output::all(values)
            .apply(move |values| Value::Object(keys.into_iter().zip(values).collect()));
        PropertySet { value, secret_keys }
    }
}
