//! Progress projection over a built sequence.
//!
//! Everything here is derived on demand from `(sequence, index)` and never
//! stored: the bead layout for the progress map, the ordinal of a repeated
//! prayer inside its group, and the per-step context handed to the content
//! resolver.

use serde::Serialize;

use crate::sequence::{Selector, Sequence, StepDescriptor, StepKind};

/// Inclusive range of step indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexSpan {
    pub start: usize,
    pub end: usize,
}

impl IndexSpan {
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// One repeating group on the progress map
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCluster {
    /// Title key of the group's announcement step
    pub label: String,
    pub selector_key: Option<String>,
    pub position: Option<u8>,
    pub span: IndexSpan,
}

/// Contiguous clusters of a sequence, keyed by group boundaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BeadLayout {
    pub leading: Option<IndexSpan>,
    pub groups: Vec<GroupCluster>,
    pub trailing: Option<IndexSpan>,
    /// Index into `groups` of the cluster holding the current step
    pub current_cluster: Option<usize>,
    /// Offset of the current step inside that cluster
    pub position_in_cluster: Option<usize>,
}

/// Everything the presentation layer needs to draw progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub layout: BeadLayout,
    pub current_index: usize,
    pub total: usize,
    pub percentage: u8,
    pub completed: bool,
}

/// Derived values a content template may reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepContext {
    pub index: usize,
    pub total: usize,
    pub ordinal: Option<u32>,
    pub repeat_count: usize,
    pub position: Option<u8>,
    pub group_size: usize,
    pub mystery: Option<String>,
}

/// Split `sequence` into leading, group and trailing clusters.
///
/// Group boundaries are the announcement steps; each cluster spans one
/// group width from its announcement.
pub fn project<S: Selector>(sequence: &Sequence<S>, current_index: usize) -> BeadLayout {
    let width = sequence.shape().group_width();
    let last = sequence.last_index();

    let groups: Vec<GroupCluster> = sequence
        .steps()
        .iter()
        .enumerate()
        .filter(|(_, step)| step.kind() == StepKind::GroupAnnouncement)
        .map(|(start, step)| GroupCluster {
            label: step.title_key().to_string(),
            selector_key: step.selector().map(|s| s.key().to_string()),
            position: step.group_position(),
            span: IndexSpan {
                start,
                end: (start + width - 1).min(last),
            },
        })
        .collect();

    let (leading, trailing) = match (groups.first(), groups.last()) {
        (Some(first), Some(final_group)) => (
            (first.span.start > 0).then(|| IndexSpan {
                start: 0,
                end: first.span.start - 1,
            }),
            (final_group.span.end < last).then(|| IndexSpan {
                start: final_group.span.end + 1,
                end: last,
            }),
        ),
        _ => (Some(IndexSpan { start: 0, end: last }), None),
    };

    let current_cluster = groups.iter().position(|g| g.span.contains(current_index));
    let position_in_cluster = current_cluster.map(|i| current_index - groups[i].span.start);

    BeadLayout {
        leading,
        groups,
        trailing,
        current_cluster,
        position_in_cluster,
    }
}

/// Whole-number completion percentage; 100 only once the session completed
pub fn percentage(current_index: usize, len: usize, completed: bool) -> u8 {
    if completed {
        return 100;
    }
    if len == 0 {
        return 0;
    }
    ((current_index.min(len) * 100) / len) as u8
}

/// 1-based ordinal of a repeated prayer inside its group.
///
/// Counts repeated prayers backward from `index` until the group's leader
/// prayer (or the start of the sequence). `None` for any other step kind.
pub fn ordinal_within_group<S>(sequence: &Sequence<S>, index: usize) -> Option<u32> {
    if sequence.get(index)?.kind() != StepKind::RepeatedPrayer {
        return None;
    }

    let count = sequence.steps()[..=index]
        .iter()
        .rev()
        .take_while(|step| step.kind() != StepKind::LeaderPrayer)
        .filter(|step| step.kind() == StepKind::RepeatedPrayer)
        .count();

    Some(count as u32)
}

/// `(position, group_size)` caption for group steps, e.g. "Mystery 3 of 5"
pub fn group_caption<S>(step: &StepDescriptor<S>, sequence: &Sequence<S>) -> Option<(u8, usize)> {
    step.group_position()
        .map(|position| (position, sequence.shape().group_size))
}

/// Build the template context for the step at `index`
pub fn step_context<S: Selector>(sequence: &Sequence<S>, index: usize) -> Option<StepContext> {
    let step = sequence.get(index)?;
    let shape = sequence.shape();

    Some(StepContext {
        index,
        total: sequence.len(),
        ordinal: ordinal_within_group(sequence, index),
        repeat_count: shape.repeat_count,
        position: step.group_position(),
        group_size: shape.group_size,
        mystery: step.selector().map(|s| s.key().to_string()),
    })
}
