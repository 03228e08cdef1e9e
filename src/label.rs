// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Propagation state of a single grid node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// Not yet touched by the front.
    Far,
    /// Arrival time is final.
    Alive,
    /// In the narrow band with a tentative arrival time.
    Trial,
    /// Trial node seeded by the caller; its value is never overwritten.
    InitialTrial,
    /// Excluded from propagation.
    Outside,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Label::Far => "Far",
            Label::Alive => "Alive",
            Label::Trial => "Trial",
            Label::InitialTrial => "InitialTrial",
            Label::Outside => "Outside",
        };
        f.write_str(name)
    }
}

/// One [`Label`] per grid node, indexed by flat index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelField {
    labels: Vec<Label>,
}

impl LabelField {
    /// A field of `len` nodes, all [`Label::Far`].
    pub fn new(len: usize) -> Self {
        LabelField {
            labels: vec![Label::Far; len],
        }
    }

    /// Label at a flat index.
    #[inline]
    pub fn get(&self, flat: usize) -> Label {
        self.labels[flat]
    }

    /// Overwrite the label at a flat index.
    #[inline]
    pub fn set(&mut self, flat: usize, label: Label) {
        self.labels[flat] = label;
    }

    /// Number of nodes carrying `label`.
    pub fn count(&self, label: Label) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the field has no nodes.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Raw labels in row-major order.
    pub fn as_slice(&self) -> &[Label] {
        &self.labels
    }
}
