//! Backend abstraction for grid evolution.
//!
//! This module defines the capability both engines share, so a driver can
//! time, compare, or substitute them without knowing which one it holds.

use crate::core::{
    error::Result,
    grid::Grid,
    validation::GridConstraints,
};
use std::fmt::Debug;

/// Trait for Game-of-Life computation backends.
///
/// Implementations must reproduce the B3/S23 toroidal rule bit for bit so
/// that any two backends return identical grids for the same input.
pub trait ComputeBackend: Debug + Send + Sync {
    /// Backend name for identification.
    fn name(&self) -> &str;

    /// Shape constraints this backend imposes on its input.
    fn constraints(&self) -> GridConstraints {
        GridConstraints::universal()
    }

    /// Checks `grid` against [`constraints`](Self::constraints).
    fn validate(&self, grid: &Grid) -> Result<()> {
        self.constraints().check(grid)
    }

    /// Evolves `grid` by `iterations` generations.
    ///
    /// Returns a new grid of the same shape; `grid` is left untouched.
    /// With `iterations == 0` the result equals the input.
    fn evolve(&self, grid: &Grid, iterations: usize) -> Result<Grid>;
}

impl<B: ComputeBackend + ?Sized> ComputeBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn constraints(&self) -> GridConstraints {
        (**self).constraints()
    }

    fn validate(&self, grid: &Grid) -> Result<()> {
        (**self).validate(grid)
    }

    fn evolve(&self, grid: &Grid, iterations: usize) -> Result<Grid> {
        (**self).evolve(grid, iterations)
    }
}

/// Runs `grid` through every backend and reports the first disagreement.
///
/// Returns the name pair of the first two backends whose results differ,
/// or `None` if all agree.
pub fn first_divergence<'a>(
    backends: &'a [&'a dyn ComputeBackend],
    grid: &Grid,
    iterations: usize,
) -> Result<Option<(&'a str, &'a str)>> {
    let mut rest = backends.iter();
    let Some(first) = rest.next() else {
        return Ok(None);
    };

    let expected = first.evolve(grid, iterations)?;
    for backend in rest {
        if backend.evolve(grid, iterations)? != expected {
            return Ok(Some((first.name(), backend.name())));
        }
    }
    Ok(None)
}
