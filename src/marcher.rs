// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::core::{CartesianGrid, GridData, Node, Speed};
use crate::error::{EikonalError, Result};
use crate::gradient::upwind_gradient;
use crate::label::{Label, LabelField};
use crate::narrow_band::NarrowBand;
use crate::targets::{TargetReachedMode, TargetStop};
use crate::update_kernels::update_node;

/// How often (in frozen nodes) the progress clock is checked.
const PROGRESS_CHECK_STRIDE: usize = 1024;

/// Progress information passed to the optional callback.
#[derive(Debug, Clone, Copy)]
pub struct ProgressInfo {
    /// Number of nodes frozen by the marching loop so far.
    pub nodes_alive: usize,
    /// Current size of the narrow band.
    pub narrow_band_size: usize,
    /// Arrival time of the most recently frozen node.
    pub current_value: f64,
    /// Elapsed time since marching started.
    pub elapsed: Duration,
}

/// Why the marching loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every reachable node became Alive.
    QueueExhausted,
    /// The next arrival time exceeded the stopping value.
    StoppingValue,
    /// The target condition fired and the offset was marched past.
    TargetsReached,
}

/// A Fast Marching Method solver for the eikonal equation |∇T| = 1/F.
///
/// Configured through `with_*` builder methods and executed with
/// [`FastMarching::run`]. The solver only borrows its configuration during
/// a run, so the same instance can be run repeatedly.
pub struct FastMarching<const N: usize> {
    output_size: Option<[usize; N]>,
    spacing: [f64; N],
    speed: Option<Speed>,
    normalization_factor: f64,
    alive_points: Vec<Node<N>>,
    trial_points: Vec<Node<N>>,
    outside_points: Vec<[usize; N]>,
    stopping_value: f64,
    generate_gradient: bool,
    collect_points: bool,
    target_points: Vec<[usize; N]>,
    target_mode: TargetReachedMode,
    target_offset: f64,
    progress_callback: Option<Box<dyn Fn(ProgressInfo) + Send + Sync>>,
    progress_interval: Duration,
}

impl<const N: usize> Default for FastMarching<N> {
    fn default() -> Self {
        FastMarching {
            output_size: None,
            spacing: [1.0; N],
            speed: None,
            normalization_factor: 1.0,
            alive_points: Vec::new(),
            trial_points: Vec::new(),
            outside_points: Vec::new(),
            stopping_value: f64::INFINITY,
            generate_gradient: false,
            collect_points: false,
            target_points: Vec::new(),
            target_mode: TargetReachedMode::NoTargets,
            target_offset: 0.0,
            progress_callback: None,
            progress_interval: Duration::from_millis(500),
        }
    }
}

impl<const N: usize> FastMarching<N> {
    /// Create an unconfigured solver. Output size and speed must be set
    /// before [`FastMarching::run`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of nodes along each axis (builder method).
    pub fn with_output_size(mut self, size: [usize; N]) -> Self {
        self.output_size = Some(size);
        self
    }

    /// Set the grid spacing along each axis (builder method). Default is 1.
    pub fn with_spacing(mut self, spacing: [f64; N]) -> Self {
        self.spacing = spacing;
        self
    }

    /// Use a per-node speed field in row-major order (builder method).
    ///
    /// Nodes with speed <= 0 or NaN are never reached.
    pub fn with_speed_field(mut self, speed: Vec<f64>) -> Self {
        self.speed = Some(Speed::Field(speed));
        self
    }

    /// Use the same speed at every node (builder method).
    pub fn with_speed_constant(mut self, speed: f64) -> Self {
        self.speed = Some(Speed::Constant(speed));
        self
    }

    /// Divide every speed value by `factor` before use (builder method).
    /// Default is 1.
    pub fn with_normalization_factor(mut self, factor: f64) -> Self {
        self.normalization_factor = factor;
        self
    }

    /// Seed nodes with known, final arrival times (builder method).
    ///
    /// Alive seeds are never queued, so they do not start a front by
    /// themselves. They feed the update of neighbors reached from Trial seeds.
    pub fn with_alive_points(mut self, points: impl IntoIterator<Item = Node<N>>) -> Self {
        self.alive_points = points.into_iter().collect();
        self
    }

    /// Seed nodes with fixed tentative arrival times (builder method).
    ///
    /// Their values are never lowered by the front; they are frozen in
    /// arrival order like any other trial node.
    pub fn with_trial_points(mut self, points: impl IntoIterator<Item = Node<N>>) -> Self {
        self.trial_points = points.into_iter().collect();
        self
    }

    /// Exclude nodes from propagation (builder method).
    pub fn with_outside_points(mut self, points: impl IntoIterator<Item = [usize; N]>) -> Self {
        self.outside_points = points.into_iter().collect();
        self
    }

    /// Stop once the next arrival time exceeds `value` (builder method).
    /// Default is unbounded.
    pub fn with_stopping_value(mut self, value: f64) -> Self {
        self.stopping_value = value;
        self
    }

    /// Compute the upwind gradient of the arrival time (builder method).
    pub fn with_gradient(mut self, enabled: bool) -> Self {
        self.generate_gradient = enabled;
        self
    }

    /// Record every node frozen by the marching loop, in order (builder method).
    pub fn with_collect_points(mut self, enabled: bool) -> Self {
        self.collect_points = enabled;
        self
    }

    /// Set the target points used by the target-reached mode (builder method).
    pub fn with_target_points(mut self, points: impl IntoIterator<Item = [usize; N]>) -> Self {
        self.target_points = points.into_iter().collect();
        self
    }

    /// Choose when target points stop the front (builder method).
    pub fn with_target_mode(mut self, mode: TargetReachedMode) -> Self {
        self.target_mode = mode;
        self
    }

    /// March this much further in arrival time after the target condition
    /// fires (builder method). Default is 0.
    pub fn with_target_offset(mut self, offset: f64) -> Self {
        self.target_offset = offset;
        self
    }

    /// Set a progress callback (builder method).
    ///
    /// Invoked at most once per progress interval while marching, and once
    /// more when marching ends.
    pub fn with_progress(mut self, callback: Box<dyn Fn(ProgressInfo) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Set the minimum time between progress callbacks (builder method).
    /// Default is 500ms.
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    fn validate(&self) -> Result<(CartesianGrid<N>, &Speed)> {
        let shape = self.output_size.ok_or(EikonalError::OutputSizeUnset)?;
        let speed = self.speed.as_ref().ok_or(EikonalError::MissingSpeed)?;
        let grid = CartesianGrid::new(shape, self.spacing)?;

        if let Speed::Field(values) = speed {
            if values.len() != grid.num_nodes() {
                return Err(EikonalError::ShapeMismatch {
                    expected: shape.to_vec(),
                    got: vec![values.len()],
                });
            }
        }
        if self.stopping_value.is_nan() {
            return Err(EikonalError::InvalidStoppingValue(self.stopping_value));
        }
        if !self.target_offset.is_finite() || self.target_offset < 0.0 {
            return Err(EikonalError::InvalidTargetOffset(self.target_offset));
        }
        if !self.normalization_factor.is_finite() || self.normalization_factor <= 0.0 {
            return Err(EikonalError::InvalidNormalizationFactor(
                self.normalization_factor,
            ));
        }
        Ok((grid, speed))
    }

    /// Run fast marching from the configured seeds.
    ///
    /// # Errors
    /// Returns a configuration error, before any marching, if the output size
    /// or speed is missing or any parameter is invalid.
    pub fn run(&self) -> Result<MarchingOutput<N>> {
        let (grid, speed) = self.validate()?;
        let mut state = MarchState::new(&grid, speed, self);
        state.seed(self);

        debug!(
            nodes = grid.num_nodes(),
            alive = state.labels.count(Label::Alive),
            trial = state.band.len(),
            outside = state.labels.count(Label::Outside),
            "fast marching initialized"
        );

        let reason = state.march(self);

        info!(
            frozen = state.frozen,
            reason = ?reason,
            target_value = ?state.targets.target_value(),
            "fast marching finished"
        );

        Ok(state.finish(reason))
    }
}

/// Working state of one run. Exclusively owned by [`FastMarching::run`] and
/// moved into the [`MarchingOutput`] when marching ends.
struct MarchState<'a, const N: usize> {
    grid: &'a CartesianGrid<N>,
    speed: &'a Speed,
    normalization_factor: f64,
    times: Vec<f64>,
    labels: LabelField,
    gradient: Option<Vec<[f64; N]>>,
    band: NarrowBand,
    targets: TargetStop,
    processed: Option<Vec<(usize, f64)>>,
    frozen: usize,
}

impl<'a, const N: usize> MarchState<'a, N> {
    fn new(grid: &'a CartesianGrid<N>, speed: &'a Speed, config: &FastMarching<N>) -> Self {
        let num_nodes = grid.num_nodes();
        let targets = config
            .target_points
            .iter()
            .filter_map(|&idx| in_bounds_flat(grid, idx, "target"))
            .collect::<Vec<_>>();

        MarchState {
            grid,
            speed,
            normalization_factor: config.normalization_factor,
            times: vec![f64::INFINITY; num_nodes],
            labels: LabelField::new(num_nodes),
            gradient: config
                .generate_gradient
                .then(|| vec![[0.0; N]; num_nodes]),
            band: NarrowBand::new(num_nodes),
            targets: TargetStop::new(config.target_mode, config.target_offset, targets),
            processed: config.collect_points.then(Vec::new),
            frozen: 0,
        }
    }

    #[inline]
    fn speed(&self, flat: usize) -> f64 {
        self.speed.at(flat) / self.normalization_factor
    }

    /// Label Outside nodes and place the caller's seeds.
    fn seed(&mut self, config: &FastMarching<N>) {
        let grid = self.grid;

        for flat in 0..grid.num_nodes() {
            let speed = self.speed(flat);
            if speed.is_nan() || speed <= 0.0 {
                self.labels.set(flat, Label::Outside);
            }
        }
        for &idx in &config.outside_points {
            if let Some(flat) = in_bounds_flat(grid, idx, "outside") {
                self.labels.set(flat, Label::Outside);
            }
        }

        let mut alive = Vec::with_capacity(config.alive_points.len());
        for node in &config.alive_points {
            if !finite_seed(node, "alive") {
                continue;
            }
            if let Some(flat) = in_bounds_flat(grid, node.index, "alive") {
                self.labels.set(flat, Label::Alive);
                self.times[flat] = node.value;
                alive.push(flat);
            }
        }

        for node in &config.trial_points {
            if !finite_seed(node, "trial") {
                continue;
            }
            let Some(flat) = in_bounds_flat(grid, node.index, "trial") else {
                continue;
            };
            if self.labels.get(flat) == Label::Alive {
                continue;
            }
            self.band.push_or_decrease(flat, node.value);
            // Duplicates keep the smaller queued value.
            self.times[flat] = self.band.value_of(flat).unwrap_or(node.value);
            self.labels.set(flat, Label::InitialTrial);
        }

        for flat in alive {
            if let Some(gradient) = self.gradient.as_mut() {
                gradient[flat] = upwind_gradient(grid, &self.times, &self.labels, flat);
            }
            self.targets.on_alive(flat, self.times[flat]);
        }
    }

    fn march(&mut self, config: &FastMarching<N>) -> StopReason {
        let start = Instant::now();
        let mut last_report = Duration::ZERO;
        let mut current_value = f64::NEG_INFINITY;

        let reason = loop {
            let Some((_, next)) = self.band.peek() else {
                break StopReason::QueueExhausted;
            };
            if next > self.targets.limit(config.stopping_value) {
                break if self.targets.is_latched() {
                    StopReason::TargetsReached
                } else {
                    StopReason::StoppingValue
                };
            }
            let Some((flat, value)) = self.band.pop() else {
                break StopReason::QueueExhausted;
            };

            self.freeze(flat, value);
            self.update_neighbors(flat);
            current_value = value;

            if let Some(cb) = &config.progress_callback {
                if self.frozen % PROGRESS_CHECK_STRIDE == 0 {
                    let elapsed = start.elapsed();
                    if elapsed >= last_report + config.progress_interval {
                        last_report = elapsed;
                        cb(self.progress(current_value, elapsed));
                    }
                }
            }
        };

        if let Some(cb) = &config.progress_callback {
            cb(self.progress(current_value, start.elapsed()));
        }
        reason
    }

    fn progress(&self, current_value: f64, elapsed: Duration) -> ProgressInfo {
        ProgressInfo {
            nodes_alive: self.frozen,
            narrow_band_size: self.band.len(),
            current_value,
            elapsed,
        }
    }

    /// Finalize `flat`. The gradient must be taken here, before any
    /// neighbor is updated.
    fn freeze(&mut self, flat: usize, value: f64) {
        self.times[flat] = value;
        self.labels.set(flat, Label::Alive);
        self.frozen += 1;

        if let Some(processed) = self.processed.as_mut() {
            processed.push((flat, value));
        }
        if let Some(gradient) = self.gradient.as_mut() {
            gradient[flat] = upwind_gradient(self.grid, &self.times, &self.labels, flat);
        }
        self.targets.on_alive(flat, value);
    }

    fn update_neighbors(&mut self, flat: usize) {
        let grid = self.grid;
        for (_, n) in grid.neighbors(flat) {
            if !matches!(self.labels.get(n), Label::Far | Label::Trial) {
                continue;
            }
            let speed = self.speed(n);
            let Some(candidate) = update_node(grid, &self.times, &self.labels, n, speed) else {
                continue;
            };
            if self.band.push_or_decrease(n, candidate) {
                self.times[n] = candidate;
                self.labels.set(n, Label::Trial);
            }
        }
    }

    fn finish(self, stop_reason: StopReason) -> MarchingOutput<N> {
        let grid = self.grid;
        let to_node = |&(flat, value): &(usize, f64)| Node::new(grid.flat_to_nd(flat), value);

        MarchingOutput {
            grid: grid.clone(),
            reached_targets: self.targets.reached().iter().map(to_node).collect(),
            target_value: self.targets.target_value(),
            processed_points: self
                .processed
                .as_ref()
                .map(|p| p.iter().map(to_node).collect()),
            arrival_times: self.times,
            labels: self.labels,
            gradient: self.gradient,
            nodes_frozen: self.frozen,
            stop_reason,
        }
    }
}

fn in_bounds_flat<const N: usize>(
    grid: &CartesianGrid<N>,
    idx: [usize; N],
    role: &str,
) -> Option<usize> {
    if grid.is_in_bounds(idx) {
        Some(grid.nd_to_flat(idx))
    } else {
        debug!(index = ?idx, role, "ignoring out-of-bounds node");
        None
    }
}

fn finite_seed<const N: usize>(node: &Node<N>, role: &str) -> bool {
    if node.value.is_finite() {
        true
    } else {
        debug!(index = ?node.index, value = node.value, role, "ignoring non-finite seed");
        false
    }
}

/// Result of a fast marching run.
///
/// Owns the arrival-time, label, and gradient fields produced by the run.
#[derive(Debug, Clone)]
pub struct MarchingOutput<const N: usize> {
    grid: CartesianGrid<N>,
    arrival_times: Vec<f64>,
    labels: LabelField,
    gradient: Option<Vec<[f64; N]>>,
    reached_targets: Vec<Node<N>>,
    target_value: Option<f64>,
    processed_points: Option<Vec<Node<N>>>,
    nodes_frozen: usize,
    stop_reason: StopReason,
}

impl<const N: usize> MarchingOutput<N> {
    /// Geometry of the computed fields.
    pub fn grid(&self) -> &CartesianGrid<N> {
        &self.grid
    }

    /// Arrival times in row-major order. Far and Outside nodes hold
    /// `f64::INFINITY`; Trial nodes hold their last tentative value.
    pub fn arrival_times(&self) -> &[f64] {
        &self.arrival_times
    }

    fn flat_index(&self, idx: [usize; N]) -> usize {
        assert!(
            self.grid.is_in_bounds(idx),
            "index {:?} out of bounds for shape {:?}",
            idx,
            self.grid.shape()
        );
        self.grid.nd_to_flat(idx)
    }

    /// Arrival time at an N-dimensional index.
    ///
    /// # Panics
    ///
    /// Panics if any component of `idx` is not less than the grid shape.
    pub fn arrival_time(&self, idx: [usize; N]) -> f64 {
        self.arrival_times[self.flat_index(idx)]
    }

    /// Final label of every node.
    pub fn labels(&self) -> &LabelField {
        &self.labels
    }

    /// Final label at an N-dimensional index.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    pub fn label(&self, idx: [usize; N]) -> Label {
        self.labels.get(self.flat_index(idx))
    }

    /// Upwind gradient field, if gradient generation was enabled.
    pub fn gradient(&self) -> Option<&[[f64; N]]> {
        self.gradient.as_deref()
    }

    /// Upwind gradient at an N-dimensional index.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds, even when no gradient was generated.
    pub fn gradient_at(&self, idx: [usize; N]) -> Option<[f64; N]> {
        let flat = self.flat_index(idx);
        self.gradient.as_ref().map(|g| g[flat])
    }

    /// Targets that became Alive, with their arrival times, in reach order.
    pub fn reached_targets(&self) -> &[Node<N>] {
        &self.reached_targets
    }

    /// Arrival time at which the target condition fired.
    ///
    /// For [`TargetReachedMode::NoTargets`] this is the largest arrival time
    /// produced. `None` if the condition never fired.
    pub fn target_value(&self) -> Option<f64> {
        self.target_value
    }

    /// Nodes frozen by the marching loop in freeze order, if collection
    /// was enabled. Alive seeds are not included.
    pub fn processed_points(&self) -> Option<&[Node<N>]> {
        self.processed_points.as_deref()
    }

    /// Number of nodes frozen by the marching loop.
    pub fn nodes_frozen(&self) -> usize {
        self.nodes_frozen
    }

    /// Why marching ended.
    pub fn stop_reason(&self) -> StopReason {
        self.stop_reason
    }

    /// Consume the output and return the arrival-time field.
    pub fn into_arrival_times(self) -> Vec<f64> {
        self.arrival_times
    }

    /// Save the arrival times to a file. Format is inferred from the extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::io::save_arrival_times(self, path.as_ref())
    }

    /// Save the gradient field to a `.npy` file with a trailing axis of
    /// length `N`.
    ///
    /// # Errors
    /// Returns an error if gradient generation was not enabled.
    pub fn save_gradient<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        crate::io::save_gradient(self, path.as_ref())
    }
}
