//! Per-part collision shapes, authored in sprite pixels.
//!
//! Sprites are [`SPRITE_SIZE`] pixels square with the pivot at the centre.

use std::collections::HashMap;

use rapier2d::prelude::{ColliderBuilder, Vector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TumbleError};
use crate::part::PartType;

/// Edge length of the sprite coordinate space.
pub const SPRITE_SIZE: f32 = 64.0;

const BUILTIN_SHAPES_JSON: &str = include_str!("shapes/parts.json");

/// Circular obstacle that bounds a part's rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Collision geometry of one part type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartShape {
    /// Convex polygons, unioned into one body.
    #[serde(default)]
    pub polygons: Vec<Vec<[f32; 2]>>,
    #[serde(default)]
    pub pins: Vec<Pin>,
    /// Body point the counterweight or bias spring pulls on.
    #[serde(default)]
    pub spring: Option<[f32; 2]>,
}

/// Shape lookup keyed by part type name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeTable {
    shapes: HashMap<String, PartShape>,
}

impl Default for ShapeTable {
    fn default() -> Self {
        Self::from_json(BUILTIN_SHAPES_JSON).expect("Failed to parse builtin shape JSON")
    }
}

impl ShapeTable {
    /// Parses and validates a shape table.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        for (name, shape) in &self.shapes {
            for polygon in &shape.polygons {
                if polygon.len() < 3 {
                    return Err(TumbleError::DegeneratePolygon {
                        part: name.clone(),
                        count: polygon.len(),
                    });
                }
                let points: Vec<Vector> = polygon.iter().map(|&[x, y]| Vector::new(x, y)).collect();
                if ColliderBuilder::convex_hull(&points).is_none() {
                    return Err(TumbleError::DegeneratePolygon {
                        part: name.clone(),
                        count: polygon.len(),
                    });
                }
            }
            for pin in &shape.pins {
                if pin.radius <= 0.0 {
                    return Err(TumbleError::InvalidPinRadius {
                        part: name.clone(),
                        radius: pin.radius,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn shape(&self, part_type: PartType) -> Option<&PartShape> {
        self.shapes.get(part_type.name())
    }

    /// Whether a part type has any collision geometry.
    pub fn has_body(&self, part_type: PartType) -> bool {
        part_type == PartType::Ball
            || self
                .shape(part_type)
                .is_some_and(|shape| !shape.polygons.is_empty())
    }

    /// Polygons relative to the pivot, scaled to `part_size`.
    pub fn centered_polygons(&self, part_type: PartType, part_size: f32) -> Vec<Vec<Vector>> {
        let Some(shape) = self.shape(part_type) else {
            return Vec::new();
        };
        shape
            .polygons
            .iter()
            .map(|polygon| {
                polygon
                    .iter()
                    .map(|&point| center(point, part_size))
                    .collect()
            })
            .collect()
    }

    /// Pin centres and radii relative to the pivot, scaled to `part_size`.
    pub fn centered_pins(&self, part_type: PartType, part_size: f32) -> Vec<(Vector, f32)> {
        let Some(shape) = self.shape(part_type) else {
            return Vec::new();
        };
        let scale = part_size / SPRITE_SIZE;
        shape
            .pins
            .iter()
            .map(|pin| (center([pin.x, pin.y], part_size), pin.radius * scale))
            .collect()
    }

    /// Spring attachment point relative to the pivot, scaled to `part_size`.
    pub fn centered_spring(&self, part_type: PartType, part_size: f32) -> Option<Vector> {
        let point = self.shape(part_type)?.spring?;
        Some(center(point, part_size))
    }
}

fn center([x, y]: [f32; 2], part_size: f32) -> Vector {
    let half = SPRITE_SIZE / 2.0;
    let scale = part_size / SPRITE_SIZE;
    Vector::new((x - half) * scale, (y - half) * scale)
}
