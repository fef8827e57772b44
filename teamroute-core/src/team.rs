//! Workers and the ordered team they belong to.

use std::collections::HashSet;

use thiserror::Error;

use crate::Coordinate;

/// A mobile worker with a resolved home base.
///
/// The home is a [`Coordinate`] rather than an address, so a worker can only
/// be built once their home has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Worker {
    /// Unique identifier within a team.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Resolved home position; every route starts and ends here.
    pub home: Coordinate,
    /// Display tag used by map and report collaborators.
    pub color: String,
}

impl Worker {
    /// Construct a worker.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        home: Coordinate,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            home,
            color: color.into(),
        }
    }
}

/// Errors returned by [`Team::new`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TeamError {
    /// No workers were supplied.
    #[error("a team needs at least one worker")]
    Empty,
    /// Two workers share an identifier.
    #[error("worker id {0:?} appears more than once")]
    DuplicateId(String),
}

/// An ordered, non-empty list of workers with unique ids.
///
/// Order is significant: when two workers are equally close to a job the one
/// listed first wins.
///
/// # Examples
///
/// ```
/// use teamroute_core::{Coordinate, Team, Worker};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let team = Team::new(vec![
///     Worker::new("m1", "Member 1", Coordinate::new(51.50, -0.10)?, "#3b82f6"),
///     Worker::new("m2", "Member 2", Coordinate::new(51.52, 0.05)?, "#10b981"),
/// ])?;
/// assert_eq!(team.len(), 2);
/// assert_eq!(team.position("m2"), Some(1));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    workers: Vec<Worker>,
}

impl Team {
    /// Validate and construct a team.
    ///
    /// # Errors
    ///
    /// Returns [`TeamError::Empty`] for an empty list and
    /// [`TeamError::DuplicateId`] when ids collide.
    pub fn new(workers: Vec<Worker>) -> Result<Self, TeamError> {
        if workers.is_empty() {
            return Err(TeamError::Empty);
        }
        let mut seen = HashSet::with_capacity(workers.len());
        for worker in &workers {
            if !seen.insert(worker.id.as_str()) {
                return Err(TeamError::DuplicateId(worker.id.clone()));
            }
        }
        Ok(Self { workers })
    }

    /// Workers in tie-break order.
    #[must_use]
    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Number of workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Always `false`; a team is never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Look up a worker by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Worker> {
        self.workers.iter().find(|worker| worker.id == id)
    }

    /// Position of the worker with `id` in team order.
    #[must_use]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.workers.iter().position(|worker| worker.id == id)
    }

    /// Home coordinates in team order.
    pub fn homes(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.workers.iter().map(|worker| worker.home)
    }
}
