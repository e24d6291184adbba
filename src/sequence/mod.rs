//! Sequence builder: expands a list of selectors into the ordered steps of
//! one guided session.
//!
//! The output is a pure function of `(selectors, shape)`. Nothing here reads
//! the clock or any other ambient state, which is what lets a resumed session
//! rebuild exactly the sequence it was saved against from the persisted
//! parametrization alone.

mod blocks;
mod selector;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use selector::{Mystery, Selector};

/// Number of steps in the fixed opening block
pub const OPENING_LEN: usize = blocks::OPENING.len();

/// Number of steps in the fixed closing block
pub const CLOSING_LEN: usize = blocks::CLOSING.len();

/// Largest supported number of groups per selector
pub const MAX_GROUP_SIZE: usize = 5;

/// Input-contract violations of [`Sequence::build`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("at least one selector is required to build a sequence")]
    NoSelectors,

    #[error("group size {0} is outside the supported range 1..=5")]
    GroupSize(usize),

    #[error("repeat count must be at least 1")]
    RepeatCount,
}

/// Category of a step. Determines which descriptor fields are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    OpeningFixed,
    GroupAnnouncement,
    GroupOffering,
    GroupSalutation,
    LeaderPrayer,
    RepeatedPrayer,
    ClosingResponsory,
    ClosingFixed,
}

impl StepKind {
    /// Whether steps of this kind belong to a repeating group
    pub fn is_group_step(&self) -> bool {
        !matches!(self, StepKind::OpeningFixed | StepKind::ClosingFixed)
    }
}

/// One immutable unit of a sequence.
///
/// Keys are opaque handles for the content collaborator; the engine never
/// resolves or inspects them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor<S> {
    kind: StepKind,
    title_key: String,
    content_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    alternate_content_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group_position: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<S>,
}

impl<S> StepDescriptor<S> {
    fn fixed(kind: StepKind, (title, content, alternate): blocks::FixedStep) -> Self {
        Self {
            kind,
            title_key: title.to_string(),
            content_key: content.to_string(),
            alternate_content_key: alternate.map(str::to_string),
            group_position: None,
            selector: None,
        }
    }

    pub fn kind(&self) -> StepKind {
        self.kind
    }

    pub fn title_key(&self) -> &str {
        &self.title_key
    }

    pub fn content_key(&self) -> &str {
        &self.content_key
    }

    pub fn alternate_content_key(&self) -> Option<&str> {
        self.alternate_content_key.as_deref()
    }

    /// 1-based position of the group this step belongs to (1..=5)
    pub fn group_position(&self) -> Option<u8> {
        self.group_position
    }

    pub fn selector(&self) -> Option<&S> {
        self.selector.as_ref()
    }
}

/// Structural constants of the builder.
///
/// A group is `announcement + offering + [salutation] + leader +
/// repeat_count × repeated + responsory`, so its width is
/// `4 + repeat_count` plus one when the salutation is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SequenceShape {
    /// Groups emitted per selector
    #[serde(default = "default_group_size")]
    pub group_size: usize,
    /// Repeated prayers per group
    #[serde(default = "default_repeat_count")]
    pub repeat_count: usize,
    /// Emit a salutation step between the offering and the leader prayer
    #[serde(default)]
    pub include_salutation: bool,
}

fn default_group_size() -> usize {
    5
}

fn default_repeat_count() -> usize {
    10
}

impl Default for SequenceShape {
    fn default() -> Self {
        Self {
            group_size: default_group_size(),
            repeat_count: default_repeat_count(),
            include_salutation: false,
        }
    }
}

impl SequenceShape {
    /// Number of steps in one repeating group
    pub fn group_width(&self) -> usize {
        4 + self.repeat_count + usize::from(self.include_salutation)
    }

    /// Length of the sequence built from `selector_count` selectors
    pub fn sequence_len(&self, selector_count: usize) -> usize {
        OPENING_LEN + selector_count * self.group_size * self.group_width() + CLOSING_LEN
    }

    pub fn validate(&self) -> Result<(), SequenceError> {
        if self.group_size == 0 || self.group_size > MAX_GROUP_SIZE {
            return Err(SequenceError::GroupSize(self.group_size));
        }
        if self.repeat_count == 0 {
            return Err(SequenceError::RepeatCount);
        }
        Ok(())
    }
}

/// An ordered, non-empty, never-mutated list of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sequence<S> {
    steps: Vec<StepDescriptor<S>>,
    selectors: Vec<S>,
    shape: SequenceShape,
}

impl<S: Selector> Sequence<S> {
    /// Expand `selectors` into a sequence.
    ///
    /// One selector yields the focused form, every known selector the
    /// complete form; both come out of the same loop.
    pub fn build(selectors: &[S], shape: SequenceShape) -> Result<Self, SequenceError> {
        if selectors.is_empty() {
            return Err(SequenceError::NoSelectors);
        }
        shape.validate()?;

        let mut steps = Vec::with_capacity(shape.sequence_len(selectors.len()));
        steps.extend(
            blocks::OPENING
                .iter()
                .map(|fixed| StepDescriptor::fixed(StepKind::OpeningFixed, *fixed)),
        );

        for selector in selectors {
            for position in 1..=shape.group_size as u8 {
                push_group(&mut steps, selector, position, &shape);
            }
        }

        steps.extend(
            blocks::CLOSING
                .iter()
                .map(|fixed| StepDescriptor::fixed(StepKind::ClosingFixed, *fixed)),
        );

        debug_assert_eq!(steps.len(), shape.sequence_len(selectors.len()));

        Ok(Self {
            steps,
            selectors: selectors.to_vec(),
            shape,
        })
    }
}

impl<S> Sequence<S> {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false for a built sequence; present for API symmetry
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }

    pub fn get(&self, index: usize) -> Option<&StepDescriptor<S>> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[StepDescriptor<S>] {
        &self.steps
    }

    /// The parametrization this sequence was built from
    pub fn selectors(&self) -> &[S] {
        &self.selectors
    }

    pub fn shape(&self) -> SequenceShape {
        self.shape
    }
}

fn push_group<S: Selector>(
    steps: &mut Vec<StepDescriptor<S>>,
    selector: &S,
    position: u8,
    shape: &SequenceShape,
) {
    let in_group = |mut step: StepDescriptor<S>| {
        step.group_position = Some(position);
        step.selector = Some(selector.clone());
        step
    };

    let (title, content, meditation) = blocks::announcement_keys(selector.key(), position);
    steps.push(in_group(StepDescriptor {
        kind: StepKind::GroupAnnouncement,
        title_key: title,
        content_key: content,
        alternate_content_key: Some(meditation),
        group_position: None,
        selector: None,
    }));

    let (title, content) = blocks::offering_keys(selector.key(), position);
    steps.push(in_group(StepDescriptor {
        kind: StepKind::GroupOffering,
        title_key: title,
        content_key: content,
        alternate_content_key: None,
        group_position: None,
        selector: None,
    }));

    if shape.include_salutation {
        steps.push(in_group(StepDescriptor::fixed(
            StepKind::GroupSalutation,
            blocks::SALUTATION,
        )));
    }

    steps.push(in_group(StepDescriptor::fixed(
        StepKind::LeaderPrayer,
        blocks::LEADER,
    )));

    for _ in 0..shape.repeat_count {
        steps.push(in_group(StepDescriptor::fixed(
            StepKind::RepeatedPrayer,
            blocks::REPEATED,
        )));
    }

    steps.push(in_group(StepDescriptor::fixed(
        StepKind::ClosingResponsory,
        blocks::RESPONSORY,
    )));
}
