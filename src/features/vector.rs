use super::stats::finite_or_zero;
use super::FeatureMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Feature values in a model's declared order.
///
/// The vector always has one value per name; names missing from the raw
/// extraction are filled with 0.0 and every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Reorder `raw` to match `names`
    pub fn align(raw: &FeatureMap, names: &[String]) -> Self {
        let values = names
            .iter()
            .map(|n| raw.get(n).copied().map(finite_or_zero).unwrap_or(0.0))
            .collect();
        Self {
            names: names.to_vec(),
            values,
        }
    }

    /// Names in `names` that `raw` did not provide
    pub fn missing<'a>(raw: &FeatureMap, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .filter(|n| !raw.contains_key(n.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

// Serialized as a JSON object that keeps model order
impl Serialize for FeatureVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}
