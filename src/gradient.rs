// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Upwind finite-difference gradient of the arrival-time field.
//!
//! Evaluated once per node, at the moment it becomes Alive. Only Alive
//! neighbors contribute, so every difference looks back along the direction
//! the front came from.
//!
//! ```text
//! backward = T(x) - T(x - e_d)     if x - e_d is Alive
//! forward  = T(x + e_d) - T(x)     if x + e_d is Alive
//! g_d      = max(backward, -forward) / h_d, or 0 if that is negative
//! ```

use crate::core::GridData;
use crate::label::{Label, LabelField};

/// Compute the upwind gradient of `times` at `flat`.
///
/// Along each axis, the Alive neighbor with the smaller arrival time is the
/// upwind one. An axis with no Alive neighbor, or whose only Alive neighbors
/// arrived later than `flat`, contributes zero.
pub fn upwind_gradient<G: GridData<N>, const N: usize>(
    grid: &G,
    times: &[f64],
    labels: &LabelField,
    flat: usize,
) -> [f64; N] {
    let spacing = grid.spacing();
    let center = times[flat];
    let mut gradient = [0.0; N];

    for (axis, component) in gradient.iter_mut().enumerate() {
        let alive_value = |upper: bool| {
            grid.axis_neighbor(flat, axis, upper)
                .filter(|&n| labels.get(n) == Label::Alive)
                .map(|n| times[n])
        };

        let backward = alive_value(false).map_or(f64::NEG_INFINITY, |t| center - t);
        let forward = alive_value(true).map_or(f64::INFINITY, |t| t - center);

        if backward.max(-forward) < 0.0 {
            continue;
        }
        let difference = if backward > -forward {
            backward
        } else {
            forward
        };
        *component = difference / spacing[axis];
    }

    gradient
}
