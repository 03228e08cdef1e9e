// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::core::GridData;
use crate::label::{Label, LabelField};

/// Solve the upwind eikonal update for a single node.
///
/// `upwind` holds one `(a_d, h_d)` pair per contributing axis: the smallest
/// finalized neighbor value along that axis and the spacing of the axis.
/// Solves the Godunov discretization
/// `sum_d ((u - a_d) / h_d)^2 = 1 / speed^2` for its larger root.
///
/// Axes are added in ascending order of `a_d`, and only while the current
/// solution still exceeds the next `a_d`; this drops axes whose backward
/// difference would point downwind. The slice is sorted in place.
///
/// Returns `None` when no axis contributes.
pub fn solve_quadratic(upwind: &mut [(f64, f64)], speed: f64) -> Option<f64> {
    upwind.sort_by(|x, y| x.0.total_cmp(&y.0));

    let rhs = 1.0 / (speed * speed);
    let mut aa = 0.0;
    let mut bb = 0.0;
    let mut cc = -rhs;
    let mut solution = f64::INFINITY;

    for &(a, h) in upwind.iter() {
        if solution <= a {
            break;
        }
        let w = 1.0 / (h * h);
        let (next_aa, next_bb, next_cc) = (aa + w, bb + a * w, cc + a * a * w);
        let disc = next_bb * next_bb - next_aa * next_cc;
        if disc < 0.0 {
            // Rounding only; the previous solution is still causal.
            break;
        }
        aa = next_aa;
        bb = next_bb;
        cc = next_cc;
        solution = (bb + disc.sqrt()) / aa;
    }

    solution.is_finite().then_some(solution)
}

/// Compute the candidate arrival time for `flat` from its Alive neighbors.
///
/// For each axis, picks the smaller of the two axis-neighbor values among
/// neighbors labeled [`Label::Alive`], then calls [`solve_quadratic`].
pub fn update_node<G: GridData<N>, const N: usize>(
    grid: &G,
    times: &[f64],
    labels: &LabelField,
    flat: usize,
    speed: f64,
) -> Option<f64> {
    let spacing = grid.spacing();
    let mut upwind = [(f64::INFINITY, 1.0); N];
    let mut count = 0;

    for (axis, &h) in spacing.iter().enumerate() {
        let mut best = f64::INFINITY;
        for upper in [false, true] {
            if let Some(n) = grid.axis_neighbor(flat, axis, upper) {
                if labels.get(n) == Label::Alive {
                    best = best.min(times[n]);
                }
            }
        }
        if best.is_finite() {
            upwind[count] = (best, h);
            count += 1;
        }
    }

    solve_quadratic(&mut upwind[..count], speed)
}
