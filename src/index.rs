use std::collections::HashMap;

use crate::error::{Result, WnmfError};

/// Maps raw external identifiers (user ids, business ids) to dense 0-based indices.
///
/// The number of entries is the true dimension of the corresponding side of the
/// rating matrix.
#[derive(Debug, Clone, Default)]
pub struct RatingIndex {
    forward: HashMap<String, usize>,
    reverse: Vec<String>,
}

impl RatingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign indices in first-seen order; repeated ids keep their first index.
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for id in ids {
            index.insert_or_get(id.as_ref());
        }
        index
    }

    /// Accept a prebuilt `{raw_id: index}` table.
    ///
    /// The indices must cover exactly `0..len`, otherwise the matrix dimensions
    /// derived from the table would be wrong.
    pub fn from_map(map: HashMap<String, usize>) -> Result<Self> {
        let len = map.len();
        let mut reverse: Vec<Option<String>> = vec![None; len];
        for (id, &idx) in &map {
            if idx >= len {
                return Err(WnmfError::InvalidIndexTable(format!(
                    "index {} for '{}' is out of range for a table of {} entries",
                    idx, id, len
                )));
            }
            if let Some(other) = &reverse[idx] {
                return Err(WnmfError::InvalidIndexTable(format!(
                    "index {} is assigned to both '{}' and '{}'",
                    idx, other, id
                )));
            }
            reverse[idx] = Some(id.clone());
        }
        // len entries, all distinct and < len, so every slot is filled
        let reverse = reverse.into_iter().flatten().collect();
        Ok(Self {
            forward: map,
            reverse,
        })
    }

    pub fn insert_or_get(&mut self, id: &str) -> usize {
        if let Some(&idx) = self.forward.get(id) {
            return idx;
        }
        let idx = self.reverse.len();
        self.forward.insert(id.to_string(), idx);
        self.reverse.push(id.to_string());
        idx
    }

    pub fn get(&self, id: &str) -> Option<usize> {
        self.forward.get(id).copied()
    }

    pub fn id_of(&self, index: usize) -> Option<&str> {
        self.reverse.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}
