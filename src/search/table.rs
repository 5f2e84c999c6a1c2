// Choice vectors and the per-decision search table

use serde::{Deserialize, Serialize};

/// One slot per agent in generator order; None means the agent does nothing
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChoiceVector(Vec<Option<usize>>);

impl ChoiceVector {
    pub fn new(slots: Vec<Option<usize>>) -> Self {
        ChoiceVector(slots)
    }

    pub fn get(&self, agent: usize) -> Option<usize> {
        self.0.get(agent).copied().flatten()
    }

    pub fn set(&mut self, agent: usize, choice: Option<usize>) {
        if let Some(slot) = self.0.get_mut(agent) {
            *slot = choice;
        }
    }

    pub fn slots(&self) -> &[Option<usize>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A choice vector with its accumulated rollout value
#[derive(Debug, Clone, PartialEq)]
pub struct SearchEntry {
    pub choices: ChoiceVector,
    pub accumulated: f64,
    pub visits: u32,
}

impl SearchEntry {
    pub fn new(choices: ChoiceVector) -> Self {
        SearchEntry {
            choices,
            accumulated: 0.0,
            visits: 0,
        }
    }

    /// Mean rollout value; unvisited entries rank below everything
    pub fn mean(&self) -> f64 {
        if self.visits == 0 {
            f64::NEG_INFINITY
        } else {
            self.accumulated / self.visits as f64
        }
    }
}

/// Every choice vector scored during one decision, in insertion order
#[derive(Debug, Clone, Default)]
pub struct SearchTable {
    entries: Vec<SearchEntry>,
}

impl SearchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry and returns its index
    pub fn push(&mut self, choices: ChoiceVector) -> usize {
        self.entries.push(SearchEntry::new(choices));
        self.entries.len() - 1
    }

    pub fn record(&mut self, idx: usize, value: f64) {
        if let Some(entry) = self.entries.get_mut(idx) {
            entry.accumulated += value;
            entry.visits += 1;
        }
    }

    pub fn get(&self, idx: usize) -> Option<&SearchEntry> {
        self.entries.get(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the entry with the highest mean among visited entries.
    /// Ties keep the earliest entry.
    pub fn best(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            if entry.visits == 0 {
                continue;
            }
            let mean = entry.mean();
            if best.map_or(true, |(_, best_mean)| mean > best_mean) {
                best = Some((idx, mean));
            }
        }
        best.map(|(idx, _)| idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_prefers_first_on_ties() {
        let mut table = SearchTable::new();
        let a = table.push(ChoiceVector::new(vec![Some(0)]));
        let b = table.push(ChoiceVector::new(vec![Some(1)]));
        let c = table.push(ChoiceVector::new(vec![None]));
        table.record(a, 1.0);
        table.record(b, 0.5);
        table.record(b, 1.5);
        assert_eq!(table.best(), Some(a));
        table.record(c, 2.0);
        assert_eq!(table.best(), Some(c));
    }

    #[test]
    fn test_unvisited_entries_are_never_best() {
        let mut table = SearchTable::new();
        table.push(ChoiceVector::new(vec![Some(0)]));
        assert_eq!(table.best(), None);
        assert_eq!(table.get(0).unwrap().mean(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_choice_vector_slots() {
        let mut choices = ChoiceVector::new(vec![Some(2), None]);
        assert_eq!(choices.get(0), Some(2));
        assert_eq!(choices.get(1), None);
        assert_eq!(choices.get(5), None);
        choices.set(1, Some(0));
        assert_eq!(choices.slots(), &[Some(2), Some(0)]);
    }
}
