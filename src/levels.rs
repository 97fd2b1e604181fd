use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{KittError, Result};

/// Largest number of rectangles the centre column may light.
pub const DEFAULT_MAX_RECTANGLES: u32 = 21;

/// One rung of the ladder: energies at or above `energy` light `rectangles`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStep {
    pub energy: f32,
    pub rectangles: u32,
}

/// Ascending energy cutoffs for one frame rate.
#[derive(Clone, Debug, PartialEq)]
pub struct ThresholdTable {
    steps: Vec<ThresholdStep>,
}

impl ThresholdTable {
    /// Validate and build a table. Cutoffs must be finite, non-negative and
    /// strictly ascending; counts must never decrease.
    pub fn new(fps: u32, steps: Vec<ThresholdStep>) -> Result<Self> {
        let invalid = |reason: String| KittError::InvalidThresholds { fps, reason };

        if steps.is_empty() {
            return Err(invalid("table has no steps".into()));
        }

        for (i, step) in steps.iter().enumerate() {
            if !step.energy.is_finite() || step.energy < 0.0 {
                return Err(invalid(format!("step {} has cutoff {}", i, step.energy)));
            }
            if i > 0 {
                let prev = steps[i - 1];
                if step.energy <= prev.energy {
                    return Err(invalid(format!(
                        "cutoffs must ascend (step {}: {} after {})",
                        i, step.energy, prev.energy
                    )));
                }
                if step.rectangles < prev.rectangles {
                    return Err(invalid(format!(
                        "counts must not decrease (step {}: {} after {})",
                        i, step.rectangles, prev.rectangles
                    )));
                }
            }
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ThresholdStep] {
        &self.steps
    }

    /// Count for the highest cutoff that `energy` meets, or 0 below the ladder.
    pub fn count_for(&self, energy: f32) -> u32 {
        let met = self.steps.partition_point(|step| step.energy <= energy);
        if met == 0 {
            0
        } else {
            self.steps[met - 1].rectangles
        }
    }

    pub fn max_count(&self) -> u32 {
        self.steps.last().map_or(0, |s| s.rectangles)
    }
}

/// Frame rates with a calibrated threshold table.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRateRegistry {
    tables: BTreeMap<u32, ThresholdTable>,
}

impl FrameRateRegistry {
    pub fn empty() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, fps: u32, table: ThresholdTable) {
        self.tables.insert(fps, table);
    }

    pub fn supported(&self) -> Vec<u32> {
        self.tables.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &ThresholdTable)> {
        self.tables.iter().map(|(fps, table)| (*fps, table))
    }

    /// Table for `fps`, or `UnsupportedFrameRate`.
    pub fn table(&self, fps: u32) -> Result<&ThresholdTable> {
        self.tables
            .get(&fps)
            .ok_or_else(|| KittError::UnsupportedFrameRate {
                fps,
                supported: self.supported(),
            })
    }
}

impl Default for FrameRateRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for (fps, cutoffs) in [(10, DEFAULT_CUTOFFS_10FPS), (15, DEFAULT_CUTOFFS_15FPS)] {
            let table = ThresholdTable::new(fps, ladder(&cutoffs))
                .expect("built-in threshold tables are valid");
            registry.insert(fps, table);
        }
        registry
    }
}

// Cutoffs on the peak-scaled energy scale. Rung n lights 2n + 1 rectangles so
// the centre column stays symmetric around its middle rectangle. The top rung
// sits at 1.0 so the loudest chunk reaches 21 at either rate.
const DEFAULT_CUTOFFS_10FPS: [f32; 10] =
    [0.005, 0.04, 0.12, 0.24, 0.36, 0.48, 0.60, 0.75, 0.90, 1.0];
const DEFAULT_CUTOFFS_15FPS: [f32; 10] =
    [0.03, 0.09, 0.15, 0.225, 0.30, 0.375, 0.45, 0.525, 0.60, 0.75];

fn ladder(cutoffs: &[f32]) -> Vec<ThresholdStep> {
    cutoffs
        .iter()
        .enumerate()
        .map(|(i, &energy)| ThresholdStep {
            energy,
            rectangles: 2 * (i as u32 + 1) + 1,
        })
        .collect()
}

/// Map each energy to its rectangle count, clamped to `max_rectangles`.
pub fn map_counts(energies: &[f32], table: &ThresholdTable, max_rectangles: u32) -> Vec<u32> {
    let counts: Vec<u32> = energies
        .iter()
        .map(|&e| table.count_for(e).min(max_rectangles))
        .collect();

    let lit = counts.iter().filter(|&&c| c > 0).count();
    let peak = counts.iter().copied().max().unwrap_or(0);
    log::info!(
        "Mapped {} chunks to rectangle counts ({} lit, peak {})",
        counts.len(),
        lit,
        peak
    );

    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(energy: f32, rectangles: u32) -> ThresholdStep {
        ThresholdStep { energy, rectangles }
    }

    fn custom_table() -> ThresholdTable {
        ThresholdTable::new(12, vec![step(0.1, 1), step(0.5, 4), step(0.9, 8)]).unwrap()
    }

    #[test]
    fn below_lowest_cutoff_is_zero() {
        let table = custom_table();
        assert_eq!(table.count_for(0.0), 0);
        assert_eq!(table.count_for(0.0999), 0);
    }

    #[test]
    fn cutoff_is_inclusive() {
        let table = custom_table();
        assert_eq!(table.count_for(0.1), 1);
        assert_eq!(table.count_for(0.5), 4);
        assert_eq!(table.count_for(0.9), 8);
    }

    #[test]
    fn picks_highest_met_cutoff() {
        let table = custom_table();
        assert_eq!(table.count_for(0.3), 1);
        assert_eq!(table.count_for(0.7), 4);
    }

    #[test]
    fn clamps_above_highest_cutoff() {
        let table = custom_table();
        assert_eq!(table.count_for(1.0), 8);
        assert_eq!(table.count_for(1.0e9), 8);
        assert_eq!(map_counts(&[1.0e9], &table, 5), vec![5]);
    }

    #[test]
    fn mapping_is_monotonic() {
        let registry = FrameRateRegistry::default();
        for (_, table) in registry.iter() {
            let mut prev = 0;
            for i in 0..=2000 {
                let count = table.count_for(i as f32 / 1000.0);
                assert!(count >= prev);
                assert!(count <= DEFAULT_MAX_RECTANGLES);
                prev = count;
            }
        }
    }

    #[test]
    fn default_tables_cover_full_range() {
        let registry = FrameRateRegistry::default();
        assert_eq!(registry.supported(), vec![10, 15]);
        for (_, table) in registry.iter() {
            assert_eq!(table.count_for(0.0), 0);
            assert_eq!(table.count_for(1.0), DEFAULT_MAX_RECTANGLES);
            assert_eq!(table.max_count(), DEFAULT_MAX_RECTANGLES);
        }
    }

    #[test]
    fn only_the_loudest_chunk_tops_the_10fps_ladder() {
        let registry = FrameRateRegistry::default();
        let table = registry.table(10).unwrap();
        assert_eq!(table.count_for(0.999), DEFAULT_MAX_RECTANGLES - 2);
        assert_eq!(table.count_for(1.0), DEFAULT_MAX_RECTANGLES);

        let energies = [0.2, 0.5, 0.999, 1.0];
        let counts: Vec<u32> = energies.iter().map(|&e| table.count_for(e)).collect();
        assert_eq!(counts.iter().filter(|&&c| c == DEFAULT_MAX_RECTANGLES).count(), 1);
    }

    #[test]
    fn unsupported_frame_rate() {
        let registry = FrameRateRegistry::default();
        match registry.table(7) {
            Err(KittError::UnsupportedFrameRate { fps, supported }) => {
                assert_eq!(fps, 7);
                assert_eq!(supported, vec![10, 15]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn registry_accepts_new_rates() {
        let mut registry = FrameRateRegistry::default();
        registry.insert(12, custom_table());
        assert_eq!(registry.table(12).unwrap().count_for(0.6), 4);
        assert_eq!(registry.supported(), vec![10, 12, 15]);
    }

    #[test]
    fn rejects_invalid_tables() {
        assert!(ThresholdTable::new(10, vec![]).is_err());
        assert!(ThresholdTable::new(10, vec![step(0.5, 1), step(0.5, 2)]).is_err());
        assert!(ThresholdTable::new(10, vec![step(0.5, 3), step(0.6, 2)]).is_err());
        assert!(ThresholdTable::new(10, vec![step(-0.1, 1)]).is_err());
        assert!(ThresholdTable::new(10, vec![step(f32::NAN, 1)]).is_err());
    }
}
