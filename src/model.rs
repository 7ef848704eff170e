use serde::Serialize;
use std::collections::BTreeMap;

/// One node of a converted XML tree.
///
/// A child tag maps to [`MetadataValue::List`] only when it occurs more than
/// once under the same parent; a single occurrence is stored directly.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Element without attributes, children or text.
    Null,
    Text(String),
    Map(BTreeMap<String, MetadataValue>),
    List(Vec<MetadataValue>),
}

impl MetadataValue {
    pub fn text(value: impl Into<String>) -> Self {
        MetadataValue::Text(value.into())
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        match self {
            MetadataValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, MetadataValue>> {
        match self {
            MetadataValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Iterates a repeated tag uniformly: a list yields its items, any other
    /// value yields itself once.
    pub fn items(&self) -> std::slice::Iter<'_, MetadataValue> {
        match self {
            MetadataValue::List(items) => items.iter(),
            other => std::slice::from_ref(other).iter(),
        }
    }

    /// True for values that carry no information at all.
    pub fn is_empty(&self) -> bool {
        match self {
            MetadataValue::Null => true,
            MetadataValue::Map(map) => map.is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_on_single_and_list() {
        let single = MetadataValue::text("a");
        assert_eq!(single.items().count(), 1);

        let list = MetadataValue::List(vec!["a".into(), "b".into(), "c".into()]);
        let values: Vec<_> = list.items().filter_map(|v| v.as_str()).collect();
        assert_eq!(values, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_serialize_untagged_yaml() {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), MetadataValue::List(vec!["1".into(), "2".into()]));
        map.insert("n".to_string(), MetadataValue::Null);
        let yaml = serde_yaml::to_string(&MetadataValue::Map(map)).unwrap();

        assert!(yaml.contains("b:\n- '1'\n- '2'"), "unexpected yaml: {yaml}");
        assert!(yaml.contains("n: null"), "unexpected yaml: {yaml}");
    }
}
