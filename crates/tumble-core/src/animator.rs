//! Tick-based linear interpolation of part properties.
//!
//! The animator is owned by the simulation and handed to whoever needs to
//! register or inspect tweens. It never holds a reference to its target;
//! every call receives the [`Animatable`] it operates on.

use std::collections::HashMap;

use crate::part::PartId;

/// Property of a part that can be animated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimatedProperty {
    Rotation,
}

/// Something whose part properties can be read and written by id.
pub trait Animatable {
    /// Live value, or `None` if the subject no longer exists.
    fn property(&self, subject: PartId, property: AnimatedProperty) -> Option<f32>;

    fn set_property(&mut self, subject: PartId, property: AnimatedProperty, value: f32);
}

#[derive(Debug, Clone, Copy)]
struct Animation {
    current: f32,
    end: f32,
    /// Change per nominal tick.
    delta: f32,
}

impl Animation {
    /// Advances by `step` and reports whether `end` was reached.
    fn advance(&mut self, step: f32) -> bool {
        let next = self.current + self.delta * step;
        let reached = if self.delta > 0.0 {
            next >= self.end
        } else if self.delta < 0.0 {
            next <= self.end
        } else {
            true
        };
        self.current = if reached { self.end } else { next };
        reached
    }
}

/// Scheduler of linear property ramps, at most one per (subject, property).
#[derive(Debug, Clone)]
pub struct Animator {
    animations: HashMap<(PartId, AnimatedProperty), Animation>,
    tick_rate: f32,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl Animator {
    /// Creates an animator whose durations are converted to ticks at
    /// `tick_rate` ticks per second.
    pub fn new(tick_rate: f32) -> Self {
        Self {
            animations: HashMap::new(),
            tick_rate,
        }
    }

    /// Starts (or replaces) a ramp from `start` to `end` over `duration`
    /// seconds. The start value is applied immediately.
    pub fn animate(
        &mut self,
        target: &mut impl Animatable,
        subject: PartId,
        property: AnimatedProperty,
        start: f32,
        end: f32,
        duration: f32,
    ) {
        if duration <= 0.0 {
            self.animations.remove(&(subject, property));
            target.set_property(subject, property, end);
            return;
        }
        target.set_property(subject, property, start);
        let delta = (end - start) / (duration * self.tick_rate);
        self.animations.insert(
            (subject, property),
            Animation {
                current: start,
                end,
                delta,
            },
        );
    }

    /// Advances every ramp by one tick scaled by `correction`.
    ///
    /// Returns `true` if any property was written.
    pub fn update(&mut self, target: &mut impl Animatable, correction: f32) -> bool {
        if self.animations.is_empty() {
            return false;
        }
        let step = correction.abs();
        let mut changed = false;
        self.animations.retain(|&(subject, property), animation| {
            if target.property(subject, property).is_none() {
                return false;
            }
            let finished = animation.advance(step);
            target.set_property(subject, property, animation.current);
            changed = true;
            !finished
        });
        changed
    }

    /// The value a property is heading to: the in-flight end value, or the
    /// live value when nothing is animating it.
    pub fn get_end_value(
        &self,
        target: &impl Animatable,
        subject: PartId,
        property: AnimatedProperty,
    ) -> Option<f32> {
        match self.animations.get(&(subject, property)) {
            Some(animation) => Some(animation.end),
            None => target.property(subject, property),
        }
    }

    /// Cancels a ramp, leaving the property at its current value.
    pub fn stop_animating(&mut self, subject: PartId, property: AnimatedProperty) -> bool {
        self.animations.remove(&(subject, property)).is_some()
    }

    pub fn is_animating(&self, subject: PartId, property: AnimatedProperty) -> bool {
        self.animations.contains_key(&(subject, property))
    }

    pub fn tick_rate(&self) -> f32 {
        self.tick_rate
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn clear(&mut self) {
        self.animations.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::part::{Part, PartType};

    /// Minimal target: one float per subject.
    #[derive(Default)]
    struct Values(HashMap<PartId, f32>);

    impl Animatable for Values {
        fn property(&self, subject: PartId, _property: AnimatedProperty) -> Option<f32> {
            self.0.get(&subject).copied()
        }

        fn set_property(&mut self, subject: PartId, _property: AnimatedProperty, value: f32) {
            self.0.insert(subject, value);
        }
    }

    #[test]
    fn test_ramp_reaches_end_and_deregisters() {
        let mut values = Values::default();
        values.0.insert(1, 0.0);
        let mut animator = Animator::new(8.0);
        animator.animate(&mut values, 1, AnimatedProperty::Rotation, 1.0, 0.0, 0.5);
        assert_eq!(values.0[&1], 1.0, "start is applied immediately");

        let mut ticks = 0;
        while animator.update(&mut values, 1.0) {
            ticks += 1;
            assert!(ticks <= 10, "ramp never finished");
        }
        assert_eq!(ticks, 4);
        assert_eq!(values.0[&1], 0.0);
        assert!(animator.is_empty());
    }

    #[test]
    fn test_correction_sign_is_ignored() {
        let mut values = Values::default();
        values.0.insert(1, 0.0);
        let mut animator = Animator::new(4.0);
        animator.animate(&mut values, 1, AnimatedProperty::Rotation, 0.0, 1.0, 1.0);
        animator.update(&mut values, -2.0);
        assert!((values.0[&1] - 0.5).abs() < 1e-6);
        animator.update(&mut values, 3.0);
        assert_eq!(values.0[&1], 1.0, "overshoot clamps to end");
        assert!(!animator.is_animating(1, AnimatedProperty::Rotation));
    }

    #[test]
    fn test_zero_duration_applies_end() {
        let mut values = Values::default();
        let mut animator = Animator::default();
        animator.animate(&mut values, 3, AnimatedProperty::Rotation, 0.0, 1.0, 2.0);
        assert!(animator.is_animating(3, AnimatedProperty::Rotation));
        animator.animate(&mut values, 3, AnimatedProperty::Rotation, 0.0, 0.25, 0.0);
        assert!(!animator.is_animating(3, AnimatedProperty::Rotation));
        assert_eq!(values.0[&3], 0.25);
    }

    #[test]
    fn test_end_value_and_stop() {
        let mut values = Values::default();
        values.0.insert(1, 0.4);
        let mut animator = Animator::default();
        assert_eq!(
            animator.get_end_value(&values, 1, AnimatedProperty::Rotation),
            Some(0.4)
        );
        animator.animate(&mut values, 1, AnimatedProperty::Rotation, 0.4, 1.0, 1.0);
        assert_eq!(
            animator.get_end_value(&values, 1, AnimatedProperty::Rotation),
            Some(1.0)
        );
        assert!(animator.stop_animating(1, AnimatedProperty::Rotation));
        assert!(!animator.stop_animating(1, AnimatedProperty::Rotation));
        assert_eq!(values.0[&1], 0.4);
    }

    #[test]
    fn test_vanished_subject_is_dropped() {
        let mut values = Values::default();
        values.0.insert(1, 0.0);
        let mut animator = Animator::default();
        animator.animate(&mut values, 1, AnimatedProperty::Rotation, 0.0, 1.0, 1.0);
        values.0.remove(&1);
        assert!(!animator.update(&mut values, 1.0));
        assert_eq!(animator.len(), 0);
    }

    #[test]
    fn test_board_bit_value_looks_through_animation() {
        let mut board = Board::new(3, 3);
        let bit = board.set_part(Part::new(PartType::Bit), 0, 0).unwrap();
        let mut animator = Animator::default();
        animator.animate(&mut board, bit, AnimatedProperty::Rotation, 0.0, 1.0, 1.0);
        assert_eq!(board.part(bit).unwrap().rotation(), 0.0);
        assert_eq!(board.bit_value(&animator, bit), Some(true));

        animator.clear();
        assert_eq!(board.bit_value(&animator, bit), Some(false));
    }
}
