use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::widget::WidgetTree;

/// Response values keyed by question key, in original question order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseRecord(IndexMap<String, Vec<String>>);

impl ResponseRecord {
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

/// Responses plus whether each question (by original index) was answered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    pub responses: ResponseRecord,
    pub answered: Vec<bool>,
}

impl Collection {
    pub fn answered_count(&self) -> usize {
        self.answered.iter().filter(|answered| **answered).count()
    }
}

/// Reads every widget by original index, never by display position.
pub fn collect(tree: &WidgetTree) -> Collection {
    let mut responses = IndexMap::with_capacity(tree.len());
    let mut answered = Vec::with_capacity(tree.len());

    for handle in tree.in_original_order() {
        let values = handle.current_value();
        answered.push(!values.is_empty());
        responses.insert(handle.key.clone(), values);
    }

    Collection {
        responses: ResponseRecord(responses),
        answered,
    }
}
