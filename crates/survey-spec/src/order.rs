use rand::Rng;
use rand::seq::SliceRandom;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Display order of the questions: entry `i` is the original index of the
/// question shown at position `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DisplayOrder(Vec<usize>);

impl DisplayOrder {
    pub fn identity(count: usize) -> Self {
        Self((0..count).collect())
    }

    /// Identity order, or a uniformly shuffled one when `randomize` is set.
    pub fn generate<R>(count: usize, randomize: bool, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut order = Self::identity(count);
        if randomize {
            order.0.shuffle(rng);
        }
        tracing::debug!(count, randomize, order = ?order.0, "computed display order");
        order
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Display position of the question at `original_index`.
    pub fn position_of(&self, original_index: usize) -> Option<usize> {
        self.0.iter().position(|index| *index == original_index)
    }

    /// True when every index in `0..len` appears exactly once.
    pub fn is_permutation(&self) -> bool {
        let mut seen = vec![false; self.0.len()];
        for &index in &self.0 {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                _ => return false,
            }
        }
        true
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

impl From<Vec<usize>> for DisplayOrder {
    fn from(order: Vec<usize>) -> Self {
        Self(order)
    }
}
