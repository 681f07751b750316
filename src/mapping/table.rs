//! Mapping definitions and the table that owns them

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bounds::nearly_equal;
use super::{GlideLimiter, InputWindow, MappingError, OutputRange, RangeMapper};
use crate::pose::{Axis, BodyPart, Landmark, NormalizedPosition};

/// Stable identifier of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingId(Uuid);

impl MappingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MappingId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for MappingId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for MappingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Binding from one landmark axis to one controller address
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    id: MappingId,
    session_id: Option<String>,
    landmark: Landmark,
    axis: Axis,
    mapper: RangeMapper,
    glide: GlideLimiter,
    channel: u8,
    controller: u8,
    previous_value: f64,
    target_value: f64,
    /// Set once the first value has gone out
    emitted: bool,
}

impl Mapping {
    /// Start describing a mapping for `landmark` on `axis`
    pub fn builder(landmark: Landmark, axis: Axis) -> MappingBuilder {
        MappingBuilder::new(landmark, axis)
    }

    pub fn id(&self) -> MappingId {
        self.id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn landmark(&self) -> Landmark {
        self.landmark
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn input_window(&self) -> InputWindow {
        self.mapper.window()
    }

    pub fn output_range(&self) -> OutputRange {
        self.mapper.range()
    }

    pub fn glide_step(&self) -> f64 {
        self.glide.max_step()
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn controller(&self) -> u8 {
        self.controller
    }

    pub fn previous_value(&self) -> f64 {
        self.previous_value
    }

    pub fn target_value(&self) -> f64 {
        self.target_value
    }

    /// Run one dispatch step against this tick's position.
    ///
    /// Returns the new value when it changed (or on the very first available
    /// reading). An unavailable position leaves the mapping untouched.
    pub(crate) fn advance(&mut self, position: &NormalizedPosition) -> Option<f64> {
        let value = position.axis(self.axis)?;
        let scaled = self.mapper.map(value).scaled;
        let range = self.mapper.range();
        let limited = range.clamp(self.glide.step(self.previous_value, scaled));

        if self.emitted && nearly_equal(limited, self.previous_value) {
            return None;
        }

        self.previous_value = limited;
        self.target_value = limited;
        self.emitted = true;
        Some(limited)
    }
}

/// Builder for [`Mapping`]; validation happens in [`MappingBuilder::build`]
#[derive(Debug, Clone)]
pub struct MappingBuilder {
    id: Option<MappingId>,
    session_id: Option<String>,
    landmark: Landmark,
    axis: Axis,
    window: (f64, f64),
    range: (f64, f64),
    glide_step: f64,
    channel: u8,
    controller: u8,
}

impl MappingBuilder {
    fn new(landmark: Landmark, axis: Axis) -> Self {
        Self {
            id: None,
            session_id: None,
            landmark,
            axis,
            window: (0.0, 1.0),
            range: (0.0, 127.0),
            glide_step: DEFAULT_GLIDE_STEP,
            channel: 1,
            controller: 0,
        }
    }

    pub fn with_id(mut self, id: MappingId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Portion of the `0..1` screen axis that drives the output
    pub fn with_window(mut self, start: f64, end: f64) -> Self {
        self.window = (start, end);
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = (min, max);
        self
    }

    /// Largest change per dispatch tick; zero freezes the value
    pub fn with_glide_step(mut self, glide_step: f64) -> Self {
        self.glide_step = glide_step;
        self
    }

    pub fn with_address(mut self, channel: u8, controller: u8) -> Self {
        self.channel = channel;
        self.controller = controller;
        self
    }

    pub fn build(self) -> Result<Mapping, MappingError> {
        let window = InputWindow::new(self.window.0, self.window.1)?;
        let range = OutputRange::new(self.range.0, self.range.1)?;
        let glide = validate_glide(self.glide_step)?;
        let initial = range.min();

        Ok(Mapping {
            id: self.id.unwrap_or_default(),
            session_id: self.session_id,
            landmark: self.landmark,
            axis: self.axis,
            mapper: RangeMapper::new(window, range),
            glide,
            channel: self.channel,
            controller: self.controller,
            previous_value: initial,
            target_value: initial,
            emitted: false,
        })
    }
}

/// Glide step used when none is configured: a full 7-bit sweep per tick,
/// so the output follows the input without limiting.
pub const DEFAULT_GLIDE_STEP: f64 = 127.0;

fn validate_glide(glide_step: f64) -> Result<GlideLimiter, MappingError> {
    if glide_step.is_nan() || glide_step < 0.0 {
        return Err(MappingError::InvalidGlideStep(glide_step));
    }
    Ok(GlideLimiter::new(glide_step))
}

/// The baseline mapping: right wrist height to CC 40 on channel 1
pub fn default_mapping() -> Mapping {
    Mapping {
        id: MappingId::new(),
        session_id: None,
        landmark: Landmark::Body(BodyPart::RightWrist),
        axis: Axis::Y,
        mapper: RangeMapper::new(InputWindow::FULL, OutputRange::MIDI),
        glide: GlideLimiter::new(DEFAULT_GLIDE_STEP),
        channel: 1,
        controller: 40,
        previous_value: 0.0,
        target_value: 0.0,
        emitted: false,
    }
}

/// Partial edit of a mapping. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingPatch {
    pub session_id: Option<Option<String>>,
    pub landmark: Option<Landmark>,
    pub axis: Option<Axis>,
    pub input_window: Option<(f64, f64)>,
    pub output_range: Option<(f64, f64)>,
    pub glide_step: Option<f64>,
    pub channel: Option<u8>,
    pub controller: Option<u8>,
}

/// Ordered collection of mappings
///
/// Iteration follows insertion order, which is also the order in which
/// control messages go out within a tick.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    mappings: Vec<Mapping>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self {
            mappings: Vec::new(),
        }
    }

    /// A table holding only [`default_mapping`]
    pub fn with_defaults() -> Self {
        Self {
            mappings: vec![default_mapping()],
        }
    }

    /// Append a mapping. Ids must be unique within the table.
    pub fn add(&mut self, mapping: Mapping) -> Result<MappingId, MappingError> {
        let id = mapping.id;
        if self.get(id).is_some() {
            return Err(MappingError::DuplicateId(id));
        }
        self.mappings.push(mapping);
        Ok(id)
    }

    pub fn remove(&mut self, id: MappingId) -> Result<Mapping, MappingError> {
        let index = self.index_of(id)?;
        Ok(self.mappings.remove(index))
    }

    /// Remove every mapping owned by `session_id`, returning how many went
    pub fn remove_session(&mut self, session_id: &str) -> usize {
        let before = self.mappings.len();
        self.mappings
            .retain(|m| m.session_id.as_deref() != Some(session_id));
        before - self.mappings.len()
    }

    /// Apply a partial edit. Either every field of the patch is applied or
    /// none is. A new output range pulls the runtime values into it.
    pub fn update(&mut self, id: MappingId, patch: MappingPatch) -> Result<&Mapping, MappingError> {
        let index = self.index_of(id)?;
        let current = &self.mappings[index];

        let window = match patch.input_window {
            Some((start, end)) => InputWindow::new(start, end)?,
            None => current.input_window(),
        };
        let range = match patch.output_range {
            Some((min, max)) => OutputRange::new(min, max)?,
            None => current.output_range(),
        };
        let glide = match patch.glide_step {
            Some(step) => validate_glide(step)?,
            None => current.glide,
        };

        let mapping = &mut self.mappings[index];
        mapping.mapper = RangeMapper::new(window, range);
        mapping.glide = glide;
        mapping.previous_value = range.clamp(mapping.previous_value);
        mapping.target_value = range.clamp(mapping.target_value);

        if let Some(session_id) = patch.session_id {
            mapping.session_id = session_id;
        }
        if let Some(landmark) = patch.landmark {
            mapping.landmark = landmark;
        }
        if let Some(axis) = patch.axis {
            mapping.axis = axis;
        }
        if let Some(channel) = patch.channel {
            mapping.channel = channel;
        }
        if let Some(controller) = patch.controller {
            mapping.controller = controller;
        }

        Ok(mapping)
    }

    pub fn get(&self, id: MappingId) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.id == id)
    }

    /// All mappings in insertion order
    pub fn all(&self) -> &[Mapping] {
        &self.mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Mapping> {
        self.mappings.iter_mut()
    }

    fn index_of(&self, id: MappingId) -> Result<usize, MappingError> {
        self.mappings
            .iter()
            .position(|m| m.id == id)
            .ok_or(MappingError::NotFound(id))
    }
}
