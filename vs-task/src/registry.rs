use core::cell::RefCell;
use log::*;
use std::rc::Rc;
use vs_core::{Selection, VisualFeature};

/// A feature shared between the caller, who updates it every cycle, and the task that reads it.
pub type SharedFeature = Rc<RefCell<dyn VisualFeature>>;

/// Who is responsible for a feature instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The caller created the feature and keeps its own handle.
    Caller,
    /// The task synthesized the feature and releases it.
    Task,
}

#[derive(Debug)]
enum Desired {
    Shared(SharedFeature),
    Owned(Box<dyn VisualFeature>),
}

/// A current feature, its desired counterpart and the selection of components in use.
#[derive(Debug)]
pub struct FeatureEntry {
    current: SharedFeature,
    desired: Desired,
    selection: Selection,
}

impl FeatureEntry {
    pub fn selection(&self) -> Selection {
        self.selection
    }

    /// Ownership of the desired feature. Current features are always owned by the caller.
    pub fn ownership(&self) -> Ownership {
        match self.desired {
            Desired::Shared(_) => Ownership::Caller,
            Desired::Owned(_) => Ownership::Task,
        }
    }

    /// The number of components this entry adds to the task.
    pub fn dimension(&self) -> usize {
        self.current.borrow().dimension(self.selection)
    }

    pub fn with_current<R>(&self, f: impl FnOnce(&dyn VisualFeature) -> R) -> R {
        f(&*self.current.borrow())
    }

    pub fn with_desired<R>(&self, f: impl FnOnce(&dyn VisualFeature) -> R) -> R {
        match &self.desired {
            Desired::Shared(feature) => f(&*feature.borrow()),
            Desired::Owned(feature) => f(feature.as_ref()),
        }
    }

    /// Gives access to the current and the desired feature together.
    pub fn with_pair<R>(&self, f: impl FnOnce(&dyn VisualFeature, &dyn VisualFeature) -> R) -> R {
        let current = self.current.borrow();
        self.with_desired(|desired| f(&*current, desired))
    }
}

/// The ordered list of features of a task.
///
/// The registration order is the order in which the features are stacked in the interaction
/// matrix and in the error vector.
#[derive(Debug, Default)]
pub struct FeatureRegistry {
    entries: Vec<FeatureEntry>,
    released: bool,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a current feature and the desired feature it should converge to.
    pub fn add(&mut self, current: SharedFeature, desired: SharedFeature, selection: Selection) {
        self.released = false;
        self.entries.push(FeatureEntry {
            current,
            desired: Desired::Shared(desired),
            selection,
        });
    }

    /// Adds a current feature that should converge to its neutral value.
    ///
    /// The desired feature is a copy of `current` brought back to its neutral value, and it is
    /// owned by the registry.
    pub fn add_to_neutral(&mut self, current: SharedFeature, selection: Selection) {
        let mut desired = current.borrow().duplicate();
        desired.reset();
        self.released = false;
        self.entries.push(FeatureEntry {
            current,
            desired: Desired::Owned(desired),
            selection,
        });
    }

    /// The sum of the dimensions of every entry, in registration order.
    pub fn dimension(&self) -> usize {
        self.entries.iter().map(FeatureEntry::dimension).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FeatureEntry] {
        &self.entries
    }

    /// Checks if some entry holds a feature owned by the registry.
    pub fn owns_features(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.ownership() == Ownership::Task)
    }

    /// Drops the features owned by the registry and forgets every entry.
    ///
    /// Calling it again without registering new features does nothing. Returns the number of
    /// owned features that were released.
    pub fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        let owned = self
            .entries
            .iter()
            .filter(|entry| entry.ownership() == Ownership::Task)
            .count();
        self.entries.clear();
        self.released = true;
        debug!("released {} task-owned features", owned);
        owned
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use vs_feature::FeaturePoint;

    fn point(x: f64, y: f64) -> Rc<RefCell<FeaturePoint>> {
        Rc::new(RefCell::new(FeaturePoint::new(x, y, 1.0)))
    }

    #[test]
    fn neutral_desired_is_owned() {
        let mut registry = FeatureRegistry::new();
        registry.add_to_neutral(point(0.3, 0.4), Selection::ALL);
        registry.add(point(0.1, 0.1), point(0.0, 0.0), FeaturePoint::X);
        assert_eq!(registry.entries()[0].ownership(), Ownership::Task);
        assert_eq!(registry.entries()[1].ownership(), Ownership::Caller);
        let neutral = registry.entries()[0].with_desired(|desired| desired.value());
        assert_eq!(neutral.as_slice(), &[0.0, 0.0]);
        assert_eq!(registry.dimension(), 3);
    }

    #[test]
    fn release_is_idempotent() {
        let mut registry = FeatureRegistry::new();
        let current = point(0.3, 0.4);
        registry.add_to_neutral(current.clone(), Selection::ALL);
        assert_eq!(registry.release(), 1);
        assert_eq!(registry.release(), 0);
        assert!(registry.is_empty());
        assert!(registry.is_released());
        // The caller handle is still valid.
        assert_eq!(current.borrow().x, 0.3);
    }

    #[test]
    fn same_feature_on_both_sides() {
        let mut registry = FeatureRegistry::new();
        let feature = point(0.3, 0.4);
        registry.add(feature.clone(), feature, Selection::ALL);
        let error = registry.entries()[0]
            .with_pair(|current, desired| current.error(desired, Selection::ALL))
            .unwrap();
        assert_eq!(error.as_slice(), &[0.0, 0.0]);
    }
}
