//! Fleet-wide summary statistics derived from a train snapshot.
//!
//! Everything here is a pure function of the train slice: no I/O, no clock,
//! and no failure path. Records reach this module with service defaults
//! already applied by the planning decode step.

use super::model::{Decision, Train};

/// Lower bound of the "excellent" fitness band.
pub const EXCELLENT_MIN: f64 = 90.0;
/// Lower bound of the "good" fitness band.
pub const GOOD_MIN: f64 = 80.0;
/// Lower bound of the "fair" fitness band.
pub const FAIR_MIN: f64 = 70.0;

/// Count of trains per fitness band.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FitnessBuckets {
    /// Score of 90 or above.
    pub excellent: usize,
    /// Score in `[80, 90)`.
    pub good: usize,
    /// Score in `[70, 80)`.
    pub fair: usize,
    /// Score below 70.
    pub poor: usize,
}

impl FitnessBuckets {
    fn record(&mut self, score: f64) {
        if score >= EXCELLENT_MIN {
            self.excellent += 1;
        } else if score >= GOOD_MIN {
            self.good += 1;
        } else if score >= FAIR_MIN {
            self.fair += 1;
        } else {
            self.poor += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.excellent + self.good + self.fair + self.poor
    }
}

/// Tally of occurrences keyed by first appearance in the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Distribution<K> {
    entries: Vec<(K, usize)>,
}

impl<K> Default for Distribution<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: PartialEq> Distribution<K> {
    fn add(&mut self, key: K) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, count)) => *count += 1,
            None => self.entries.push((key, 1)),
        }
    }

    /// Count recorded for `key`, zero when never seen.
    pub fn get<Q>(&self, key: &Q) -> usize
    where
        K: PartialEq<Q>,
        Q: ?Sized,
    {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
        self.entries.iter().map(|(key, count)| (key, *count))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }
}

/// Aggregate view of a fleet snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FleetMetrics {
    pub fleet_size: usize,
    pub inducted_count: usize,
    pub held_count: usize,
    pub rejected_count: usize,
    /// Mean fitness rounded to one decimal; 0 for an empty fleet.
    pub avg_fitness: f64,
    pub active_work_orders: u64,
    pub depot_distribution: Distribution<String>,
    pub decision_distribution: Distribution<Decision>,
    pub fitness_buckets: FitnessBuckets,
}

/// One bar of the per-train fitness chart.
#[derive(Clone, Debug, PartialEq)]
pub struct FitnessPoint {
    pub train_id: String,
    pub fitness_score: f64,
    pub inducted: bool,
}

/// Summarise a snapshot. Total over any input, including an empty slice.
pub fn compute_metrics(trains: &[Train]) -> FleetMetrics {
    let mut metrics = FleetMetrics {
        fleet_size: trains.len(),
        ..FleetMetrics::default()
    };
    let mut fitness_sum = 0.0;
    for train in trains {
        match train.final_decision {
            Decision::Induct => metrics.inducted_count += 1,
            Decision::Hold => metrics.held_count += 1,
            Decision::Reject => metrics.rejected_count += 1,
            Decision::Pending | Decision::Unknown => {}
        }
        let score = sanitize_score(train.fitness_score);
        fitness_sum += score;
        metrics.fitness_buckets.record(score);
        metrics.active_work_orders += u64::from(train.open_work_orders);
        metrics.depot_distribution.add(train.depot.clone());
        metrics.decision_distribution.add(train.final_decision);
    }
    if !trains.is_empty() {
        metrics.avg_fitness = round_one_decimal(fitness_sum / trains.len() as f64);
    }
    metrics
}

/// Per-train fitness series in snapshot order.
pub fn fitness_series(trains: &[Train]) -> Vec<FitnessPoint> {
    trains
        .iter()
        .map(|train| FitnessPoint {
            train_id: train.train_id.clone(),
            fitness_score: sanitize_score(train.fitness_score),
            inducted: train.is_inducted(),
        })
        .collect()
}

fn sanitize_score(score: f64) -> f64 {
    if score.is_finite() { score } else { 0.0 }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
