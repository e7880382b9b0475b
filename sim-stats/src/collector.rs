//! The on/off-gated observation protocol shared by every estimator.

use crate::{Error, StatisticAccessor};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out the numeric ids that estimators are known by.
///
/// Ids are unique and increasing for a given generator.  Most code uses the
/// process-wide [`IdGenerator::global`]; tests and embedders wanting
/// reproducible names can construct estimators against their own generator.
#[derive(Debug)]
pub struct IdGenerator {
    next: AtomicU64,
}

impl IdGenerator {
    pub const fn new() -> IdGenerator {
        IdGenerator {
            next: AtomicU64::new(1),
        }
    }

    pub fn global() -> &'static IdGenerator {
        static GLOBAL: IdGenerator = IdGenerator::new();
        &GLOBAL
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next call to `next_id` will return.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.next.store(1, Ordering::Relaxed);
    }
}

impl Default for IdGenerator {
    fn default() -> IdGenerator {
        IdGenerator::new()
    }
}

/// An estimator's id and display name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Identity {
    pub id: u64,
    pub name: String,
}

impl Identity {
    /// Names default to `<kind>_<id>`.
    pub fn new(ids: &IdGenerator, kind: &str, name: Option<&str>) -> Identity {
        let id = ids.next_id();
        let name = match name {
            Some(name) => name.to_string(),
            None => format!("{}_{}", kind, id),
        };
        Identity { id, name }
    }
}

/// A growable copy of the raw observations offered to a collector.
#[derive(Clone, Debug, PartialEq)]
pub struct SavedData {
    values: Vec<f64>,
    weights: Vec<f64>,
    /// how many extra slots to ask for once the buffer fills up
    increment: usize,
}

impl SavedData {
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new() -> SavedData {
        SavedData {
            values: Vec::with_capacity(Self::DEFAULT_CAPACITY),
            weights: Vec::with_capacity(Self::DEFAULT_CAPACITY),
            increment: Self::DEFAULT_CAPACITY,
        }
    }

    pub fn with_capacity(initial: usize, increment: usize) -> Result<SavedData, Error> {
        if increment == 0 {
            return Err(Error::InvalidArgument(
                "saved data growth increment must be at least 1".into(),
            ));
        }
        Ok(SavedData {
            values: Vec::with_capacity(initial),
            weights: Vec::with_capacity(initial),
            increment,
        })
    }

    fn push(&mut self, x: f64, weight: f64) {
        if self.values.len() == self.values.capacity() {
            self.values.reserve(self.increment);
            self.weights.reserve(self.increment);
        }
        self.values.push(x);
        self.weights.push(weight);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// A copy of the values, in the order they were offered.
    pub fn values(&self) -> Vec<f64> {
        self.values.clone()
    }

    /// A copy of the weights, parallel to `values`.
    pub fn weights(&self) -> Vec<f64> {
        self.weights.clone()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.weights.clear();
    }
}

impl Default for SavedData {
    fn default() -> SavedData {
        SavedData::new()
    }
}

/// What a collector should do with an offered observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The collector is off; the observation is dropped.
    Rejected,
    /// The observation (or its weight) isn't finite and was tallied as missing.
    Missing,
    /// The observation should be folded into the statistics.
    Accepted,
}

/// Bookkeeping common to all collectors: the on/off switch, the tally of
/// missing observations, and the optional raw-data buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectorState {
    on: bool,
    missing: f64,
    saved: Option<SavedData>,
}

impl CollectorState {
    pub fn new() -> CollectorState {
        CollectorState {
            on: true,
            missing: 0.,
            saved: None,
        }
    }

    /// Decide the fate of an observation, updating the missing tally and
    /// the raw-data buffer as a side effect.
    pub fn admit(&mut self, x: f64, weight: f64) -> Admission {
        if !self.on {
            return Admission::Rejected;
        }
        if let Some(saved) = &mut self.saved {
            saved.push(x, weight);
        }
        if !x.is_finite() || !weight.is_finite() {
            self.missing += 1.;
            return Admission::Missing;
        }
        Admission::Accepted
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn turn_on(&mut self) {
        self.on = true;
    }

    pub fn turn_off(&mut self) {
        self.on = false;
    }

    pub fn number_missing(&self) -> f64 {
        self.missing
    }

    /// Start or stop retaining raw observations.  Enabling retention doesn't
    /// recover anything collected before; disabling it drops the buffer.
    pub fn set_save_data(&mut self, save: bool) {
        match (save, &self.saved) {
            (true, None) => self.saved = Some(SavedData::new()),
            (false, _) => self.saved = None,
            (true, Some(_)) => (),
        }
    }

    /// Retain raw observations in `buffer` from now on.
    pub fn save_data_into(&mut self, buffer: SavedData) {
        self.saved = Some(buffer);
    }

    pub fn is_saving_data(&self) -> bool {
        self.saved.is_some()
    }

    /// Copies of the retained `(values, weights)`, if retention is enabled.
    pub fn saved_data(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        self.saved.as_ref().map(|s| (s.values(), s.weights()))
    }

    pub fn clear_saved_data(&mut self) {
        if let Some(saved) = &mut self.saved {
            saved.clear();
        }
    }

    /// Back to the post-construction state, except that the retention
    /// setting survives (with an emptied buffer).
    pub fn reset(&mut self) {
        self.on = true;
        self.missing = 0.;
        self.clear_saved_data();
    }
}

impl Default for CollectorState {
    fn default() -> CollectorState {
        CollectorState::new()
    }
}

/// A sequential-sampling stopping criterion.
///
/// After each observation an estimator with a rule checks its confidence
/// half-width; once the rule is satisfied the estimator turns itself off,
/// and the following `collect` returns `false`.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub enum CollectionRule {
    #[default]
    None,
    /// Stop once the half-width is at most this value.
    HalfWidthTarget(f64),
    /// Stop once the half-width is at most this fraction of the average.
    RelativePrecisionTarget(f64),
}

impl CollectionRule {
    pub fn half_width_target(half_width: f64) -> Result<CollectionRule, Error> {
        if !(half_width > 0.) {
            return Err(Error::InvalidArgument(format!(
                "target half-width must be positive, got {}",
                half_width
            )));
        }
        Ok(CollectionRule::HalfWidthTarget(half_width))
    }

    pub fn relative_precision_target(precision: f64) -> Result<CollectionRule, Error> {
        if !(precision > 0.) {
            return Err(Error::InvalidArgument(format!(
                "target relative precision must be positive, got {}",
                precision
            )));
        }
        Ok(CollectionRule::RelativePrecisionTarget(precision))
    }

    /// NaN half-widths never satisfy a rule.
    pub fn is_satisfied(self, half_width: f64, average: f64) -> bool {
        match self {
            CollectionRule::None => false,
            CollectionRule::HalfWidthTarget(target) => half_width <= target,
            CollectionRule::RelativePrecisionTarget(p) => half_width <= average * p,
        }
    }

    /// Check `stat` against the rule.  The half-width is only computed
    /// when there is a target to compare it with.
    pub fn is_met_by(self, stat: &(impl StatisticAccessor + ?Sized)) -> bool {
        match self {
            CollectionRule::None => false,
            _ => self.is_satisfied(stat.half_width(), stat.average()),
        }
    }
}

/// Something observations can be fed to.
///
/// `collect*` returns `false` exactly when the collector is off, either
/// because the caller turned it off or because a [`CollectionRule`] was
/// satisfied.  That isn't an error: the caller should stop feeding data,
/// but the statistics remain available.  Non-finite observations are
/// tallied in `number_missing` and otherwise ignored.
pub trait Collector {
    fn collect_weighted(&mut self, x: f64, weight: f64) -> bool;

    /// Return every statistic to its post-construction value.
    fn reset(&mut self);

    fn collector_state(&self) -> &CollectorState;

    fn collector_state_mut(&mut self) -> &mut CollectorState;

    fn collect(&mut self, x: f64) -> bool {
        self.collect_weighted(x, 1.)
    }

    /// `true` is collected as 1, `false` as 0.
    fn collect_bool(&mut self, x: bool) -> bool {
        self.collect(if x { 1. } else { 0. })
    }

    /// Stops at the first observation that isn't accepted.
    fn collect_slice(&mut self, xs: &[f64]) -> bool {
        xs.iter().all(|&x| self.collect(x))
    }

    fn collect_weighted_slice(&mut self, xs: &[f64], weights: &[f64]) -> Result<bool, Error> {
        if xs.len() != weights.len() {
            return Err(Error::InvalidArgument(format!(
                "{} observations but {} weights",
                xs.len(),
                weights.len()
            )));
        }
        Ok(xs
            .iter()
            .zip(weights)
            .all(|(&x, &w)| self.collect_weighted(x, w)))
    }

    fn turn_on(&mut self) {
        self.collector_state_mut().turn_on();
    }

    fn turn_off(&mut self) {
        self.collector_state_mut().turn_off();
    }

    fn is_turned_on(&self) -> bool {
        self.collector_state().is_on()
    }

    fn is_turned_off(&self) -> bool {
        !self.is_turned_on()
    }

    fn set_save_data(&mut self, save: bool) {
        self.collector_state_mut().set_save_data(save);
    }

    fn saved_data(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        self.collector_state().saved_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Just counts what it's given.
    #[derive(Default)]
    struct Tally {
        state: CollectorState,
        sum: f64,
    }

    impl Collector for Tally {
        fn collect_weighted(&mut self, x: f64, weight: f64) -> bool {
            match self.state.admit(x, weight) {
                Admission::Rejected => false,
                Admission::Missing => true,
                Admission::Accepted => {
                    self.sum += x * weight;
                    true
                }
            }
        }
        fn reset(&mut self) {
            self.state.reset();
            self.sum = 0.;
        }
        fn collector_state(&self) -> &CollectorState {
            &self.state
        }
        fn collector_state_mut(&mut self) -> &mut CollectorState {
            &mut self.state
        }
    }

    #[test]
    fn ids_are_monotonic() {
        let ids = IdGenerator::new();
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.peek(), 3);
        ids.reset();
        assert_eq!(ids.next_id(), 1);
        let a = IdGenerator::global().next_id();
        let b = IdGenerator::global().next_id();
        assert!(b > a);
    }

    #[test]
    fn default_names() {
        let ids = IdGenerator::new();
        assert_eq!(Identity::new(&ids, "Statistic", None).name, "Statistic_1");
        assert_eq!(Identity::new(&ids, "Statistic", Some("wait")).name, "wait");
        assert_eq!(Identity::new(&ids, "Statistic", None).id, 3);
    }

    #[test]
    fn off_rejects_but_missing_does_not() {
        let mut t = Tally::default();
        assert!(t.collect(2.));
        assert!(t.collect(f64::NAN));
        assert!(t.collect(f64::NEG_INFINITY));
        assert!(t.is_turned_on());
        assert_eq!(t.collector_state().number_missing(), 2.);
        t.turn_off();
        assert!(t.is_turned_off());
        assert!(!t.collect(5.));
        assert_eq!(t.sum, 2.);
        t.turn_on();
        assert!(t.collect_bool(true));
        assert!(t.collect_bool(false));
        assert_eq!(t.sum, 3.);
    }

    #[test]
    fn slices() {
        let mut t = Tally::default();
        assert!(t.collect_slice(&[1., 2., 3.]));
        assert_eq!(t.sum, 6.);
        assert!(t.collect_weighted_slice(&[1., 2.], &[2., 0.5]).unwrap());
        assert_eq!(t.sum, 9.);
        assert!(matches!(
            t.collect_weighted_slice(&[1., 2.], &[1.]),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(t.sum, 9.);
        t.turn_off();
        assert!(!t.collect_slice(&[1.]));
    }

    #[test]
    fn saved_data_is_opt_in_and_copied() {
        let mut t = Tally::default();
        t.collect(1.);
        assert_eq!(t.saved_data(), None);
        t.set_save_data(true);
        t.collect(2.);
        t.collect_weighted(f64::NAN, 3.);
        let (mut values, weights) = t.saved_data().unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], 2.);
        assert!(values[1].is_nan());
        assert_eq!(weights, vec![1., 3.]);
        values[0] = 100.;
        assert_eq!(t.saved_data().unwrap().0[0], 2.);

        t.reset();
        assert!(t.collector_state().is_saving_data());
        assert_eq!(t.saved_data(), Some((vec![], vec![])));
        t.set_save_data(false);
        assert_eq!(t.saved_data(), None);
    }

    #[test]
    fn saved_data_grows_by_increment() {
        let mut buf = SavedData::with_capacity(2, 3).unwrap();
        for x in 0..10 {
            buf.push(x as f64, 1.);
        }
        assert_eq!(buf.len(), 10);
        assert!(buf.capacity() >= 10);
        assert_eq!(buf.values()[9], 9.);
        assert!(SavedData::with_capacity(2, 0).is_err());
    }

    #[test]
    fn rules() {
        assert!(!CollectionRule::None.is_satisfied(0., 1.));
        let hw = CollectionRule::half_width_target(0.5).unwrap();
        assert!(hw.is_satisfied(0.5, 100.));
        assert!(!hw.is_satisfied(0.6, 100.));
        assert!(!hw.is_satisfied(f64::NAN, 100.));
        let rel = CollectionRule::relative_precision_target(0.1).unwrap();
        assert!(rel.is_satisfied(0.9, 10.));
        assert!(!rel.is_satisfied(1.1, 10.));
        assert!(CollectionRule::half_width_target(0.).is_err());
        assert!(CollectionRule::relative_precision_target(f64::NAN).is_err());

        let constant = crate::Statistic::from_values(None, &[2., 2., 2.]);
        assert!(!CollectionRule::None.is_met_by(&constant));
        assert!(hw.is_met_by(&constant));
        assert!(rel.is_met_by(&constant));
    }
}
