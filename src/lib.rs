// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! An eikonal equation solver using the Fast Marching Method (FMM).
//!
//! This library computes first-arrival times on N-dimensional Cartesian grids
//! by solving |∇T| = 1/F, where T is the arrival time and F the local speed.
//! A front is expanded from seed nodes in strictly non-decreasing arrival
//! order using a narrow-band priority queue. Optionally, the upwind gradient
//! of T is recorded as nodes are frozen, and marching stops early once a
//! configurable number of target nodes has been reached.
//!
//! ```no_run
//! use eikonal_fmm::{FastMarching, Node, TargetReachedMode};
//!
//! let out = FastMarching::<2>::new()
//!     .with_output_size([128, 128])
//!     .with_speed_constant(1.0)
//!     .with_trial_points([Node::new([10, 10], 0.0)])
//!     .with_target_points([[100, 90]])
//!     .with_target_mode(TargetReachedMode::OneTarget)
//!     .with_gradient(true)
//!     .run()?;
//! println!("target reached at {:?}", out.target_value());
//! # Ok::<(), eikonal_fmm::EikonalError>(())
//! ```

#![warn(missing_docs)]

/// Core grid data structures and traits.
pub mod core;
/// Error types for the library.
pub mod error;
/// Upwind gradient of the arrival-time field.
pub mod gradient;
/// File I/O for loading speed fields and saving results.
pub mod io;
/// Per-node propagation labels.
pub mod label;
/// Fast marching solver and its output.
pub mod marcher;
/// Priority queue of Trial nodes with decrease-key.
pub mod narrow_band;
/// Target-reached stopping rules.
pub mod targets;
/// Upwind quadratic update kernels.
pub mod update_kernels;

pub use crate::core::{CartesianGrid, GridData, Node, Speed};
pub use crate::error::{EikonalError, Result};
pub use crate::label::{Label, LabelField};
pub use crate::marcher::{FastMarching, MarchingOutput, ProgressInfo, StopReason};
pub use crate::targets::TargetReachedMode;
