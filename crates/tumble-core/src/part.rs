//! Part catalog: the closed set of placeable variants and their state.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use serde::{Deserialize, Serialize};

/// Board-assigned identifier of a part.
pub type PartId = u32;

/// Index into the board's arena of connected gear sets.
pub type GearSetId = usize;

/// Type tag of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PartType {
    Blank,
    PartLocation,
    GearLocation,
    Ramp,
    Crossover,
    Interceptor,
    Bit,
    Gearbit,
    Gear,
    Ball,
    Drop,
    Fence,
}

/// Constant capabilities and physics hints of a part variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartTraits {
    pub can_rotate: bool,
    pub can_mirror: bool,
    pub can_flip: bool,
    pub body_can_move: bool,
    pub body_can_rotate: bool,
    pub body_restitution: f32,
    pub is_counter_weighted: bool,
}

impl PartTraits {
    const INERT: Self = Self {
        can_rotate: false,
        can_mirror: false,
        can_flip: false,
        body_can_move: false,
        body_can_rotate: false,
        body_restitution: 0.0,
        is_counter_weighted: false,
    };

    const TOGGLE: Self = Self {
        can_rotate: true,
        can_flip: true,
        body_can_rotate: true,
        body_restitution: 0.1,
        ..Self::INERT
    };
}

impl PartType {
    pub const ALL: [PartType; 12] = [
        Self::Blank,
        Self::PartLocation,
        Self::GearLocation,
        Self::Ramp,
        Self::Crossover,
        Self::Interceptor,
        Self::Bit,
        Self::Gearbit,
        Self::Gear,
        Self::Ball,
        Self::Drop,
        Self::Fence,
    ];

    /// Capability flags for this variant.
    pub const fn traits(self) -> PartTraits {
        match self {
            Self::Blank | Self::PartLocation | Self::GearLocation => PartTraits::INERT,
            Self::Ramp => PartTraits {
                can_rotate: true,
                can_mirror: true,
                body_can_rotate: true,
                body_restitution: 0.1,
                is_counter_weighted: true,
                ..PartTraits::INERT
            },
            Self::Crossover => PartTraits {
                body_restitution: 0.2,
                ..PartTraits::INERT
            },
            Self::Interceptor => PartTraits::INERT,
            Self::Bit | Self::Gearbit | Self::Gear => PartTraits::TOGGLE,
            Self::Ball => PartTraits {
                body_can_move: true,
                body_restitution: 0.2,
                ..PartTraits::INERT
            },
            Self::Drop | Self::Fence => PartTraits {
                can_mirror: true,
                body_restitution: 0.1,
                ..PartTraits::INERT
            },
        }
    }

    /// Name used as the shape-table key.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Blank => "Blank",
            Self::PartLocation => "PartLocation",
            Self::GearLocation => "GearLocation",
            Self::Ramp => "Ramp",
            Self::Crossover => "Crossover",
            Self::Interceptor => "Interceptor",
            Self::Bit => "Bit",
            Self::Gearbit => "Gearbit",
            Self::Gear => "Gear",
            Self::Ball => "Ball",
            Self::Drop => "Drop",
            Self::Fence => "Fence",
        }
    }

    /// Gears and gearbits interlock with edge-adjacent neighbours.
    pub const fn is_gear_class(self) -> bool {
        matches!(self, Self::Gear | Self::Gearbit)
    }

    /// Background parts synthesized for empty cells.
    pub const fn is_location(self) -> bool {
        matches!(self, Self::PartLocation | Self::GearLocation)
    }

    /// Background part for a cell of the given checkerboard parity.
    pub const fn background_for(column: usize, row: usize) -> Self {
        if (column + row) % 2 == 0 {
            Self::PartLocation
        } else {
            Self::GearLocation
        }
    }
}

/// Role of a fence within a horizontal run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FenceVariant {
    #[default]
    Preview,
    Side,
    Slope,
}

/// One placeable unit on the board grid, or a free ball.
#[derive(Debug, Clone)]
pub struct Part {
    id: PartId,
    part_type: PartType,
    column: f32,
    row: f32,
    rotation: f32,
    is_flipped: bool,
    is_locked: bool,
    change_counter: u64,
    pub(crate) connected: Option<GearSetId>,
    pub(crate) connection_label: usize,
    pub(crate) variant: FenceVariant,
    pub(crate) modulus: usize,
    pub(crate) sequence: usize,
}

impl Part {
    pub fn new(part_type: PartType) -> Self {
        Self {
            id: 0,
            part_type,
            column: 0.0,
            row: 0.0,
            rotation: 0.0,
            is_flipped: false,
            is_locked: false,
            change_counter: 0,
            connected: None,
            connection_label: 0,
            variant: FenceVariant::Preview,
            modulus: 0,
            sequence: 0,
        }
    }

    pub fn id(&self) -> PartId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: PartId) {
        self.id = id;
    }

    pub fn part_type(&self) -> PartType {
        self.part_type
    }

    pub fn traits(&self) -> PartTraits {
        self.part_type.traits()
    }

    pub fn is_gear_class(&self) -> bool {
        self.part_type.is_gear_class()
    }

    pub fn column(&self) -> f32 {
        self.column
    }

    pub fn row(&self) -> f32 {
        self.row
    }

    /// Column and row rounded to the nearest cell.
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell(&self) -> (i32, i32) {
        (self.column.round() as i32, self.row.round() as i32)
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn is_flipped(&self) -> bool {
        self.is_flipped
    }

    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.is_locked = locked;
    }

    /// Bumped on every position, rotation or flip change.
    pub fn change_counter(&self) -> u64 {
        self.change_counter
    }

    /// Gear set this part belongs to (gear-class parts only).
    pub fn connected(&self) -> Option<GearSetId> {
        self.connected
    }

    pub fn variant(&self) -> FenceVariant {
        self.variant
    }

    pub fn modulus(&self) -> usize {
        self.modulus
    }

    pub fn sequence(&self) -> usize {
        self.sequence
    }

    fn touch(&mut self) {
        self.change_counter = self.change_counter.wrapping_add(1);
    }

    pub fn set_position(&mut self, column: f32, row: f32) {
        if self.column == column && self.row == row {
            return;
        }
        self.column = column;
        self.row = row;
        self.touch();
    }

    /// Sets the rotation clamped to `[0, 1]`. No-op for non-rotatable parts.
    pub fn set_rotation(&mut self, rotation: f32) {
        if !self.traits().can_rotate {
            return;
        }
        let rotation = rotation.clamp(0.0, 1.0);
        if self.rotation == rotation {
            return;
        }
        self.rotation = rotation;
        self.touch();
    }

    /// Sets the mirror state. No-op for parts that cannot mirror.
    pub fn set_flipped(&mut self, flipped: bool) {
        if !self.traits().can_mirror || self.is_flipped == flipped {
            return;
        }
        self.is_flipped = flipped;
        self.touch();
    }

    /// Mirrors the part, or toggles its rotation between the two ends.
    ///
    /// Returns `true` if anything changed.
    pub fn flip(&mut self) -> bool {
        let traits = self.traits();
        if traits.can_mirror {
            self.set_flipped(!self.is_flipped);
            true
        } else if traits.can_flip {
            let target = if self.rotation >= 0.5 { 0.0 } else { 1.0 };
            self.set_rotation(target);
            true
        } else {
            false
        }
    }

    /// Rotation the part settles to when nothing drives it.
    pub fn resting_rotation(&self) -> f32 {
        match self.part_type {
            PartType::Ramp => 0.0,
            PartType::Bit | PartType::Gearbit | PartType::Gear => self.rotation.round(),
            _ => self.rotation,
        }
    }

    /// Whether a bit-like part points right.
    pub fn bit_value(&self) -> bool {
        self.rotation >= 0.5
    }

    /// Body angle (radians) for a logical rotation.
    pub fn angle_for_rotation(&self, rotation: f32) -> f32 {
        match self.part_type {
            PartType::Ramp => {
                let angle = rotation * FRAC_PI_4;
                if self.is_flipped { -angle } else { angle }
            }
            PartType::Bit => (rotation - 0.5) * FRAC_PI_2,
            PartType::Gearbit | PartType::Gear => {
                (rotation - 0.5) * FRAC_PI_2 * self.gear_direction()
            }
            _ => 0.0,
        }
    }

    /// Inverse of [`Part::angle_for_rotation`]. The result is not clamped.
    pub fn rotation_for_angle(&self, angle: f32) -> f32 {
        match self.part_type {
            PartType::Ramp => {
                let angle = if self.is_flipped { -angle } else { angle };
                angle / FRAC_PI_4
            }
            PartType::Bit => angle / FRAC_PI_2 + 0.5,
            PartType::Gearbit | PartType::Gear => {
                angle / (FRAC_PI_2 * self.gear_direction()) + 0.5
            }
            _ => self.rotation,
        }
    }

    /// Edge-adjacent gears sit on opposite parities and turn opposite ways.
    fn gear_direction(&self) -> f32 {
        let (column, row) = self.cell();
        if (column + row).rem_euclid(2) == 0 {
            1.0
        } else {
            -1.0
        }
    }
}
