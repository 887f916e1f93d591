//! Basic geometry of the v-plotter, including conversion from Cartesian
//! coordinates to cord lengths and back.
//!
//! The pen hangs from two cords. Each cord runs from the pen to an "anchor",
//! where a stepper motor winds it up. The two anchors sit on a horizontal
//! baseline; the left anchor is the geometric origin, with X pointing towards
//! the right anchor. Publicly-visible coordinates are shifted by the origin
//! offset, so that (0, 0) is wherever the pen is parked when the machine
//! starts.
//!
//! This crate supports `no_std` and uses `libm` for the float functions.

#![cfg_attr(not(feature = "std"), no_std)]

use libm::{atan2, cos, sin, sqrt};

pub struct Mm;

pub type Angle = euclid::Angle<f64>;
pub type Point = euclid::Point2D<f64, Mm>;
pub type Offset = euclid::Vector2D<f64, Mm>;

fn square<T: core::ops::Mul<T> + Copy>(x: T) -> <T as core::ops::Mul<T>>::Output {
    x * x
}

/// Shifts a point by an offset.
pub fn translate(p: Point, by: Offset) -> Point {
    p + by
}

/// One of the two cords (and the motor that winds it).
///
/// Left and right are from the point of view of someone looking at the
/// drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Axis {
    Left,
    Right,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::Left => Axis::Right,
            Axis::Right => Axis::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct LeftRight<T> {
    pub left: T,
    pub right: T,
}

impl<T> LeftRight<T> {
    pub fn new(left: T, right: T) -> Self {
        LeftRight { left, right }
    }

    pub fn get(&self, axis: Axis) -> &T {
        match axis {
            Axis::Left => &self.left,
            Axis::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::Left => &mut self.left,
            Axis::Right => &mut self.right,
        }
    }

    pub fn map<S>(self, mut f: impl FnMut(T) -> S) -> LeftRight<S> {
        LeftRight {
            left: f(self.left),
            right: f(self.right),
        }
    }
}

/// Lengths of the cords, from the pen to the anchors.
///
/// Measured in stepper steps, not millimeters. They are floating-point
/// because a target length usually falls between two steps.
pub type CordLengths = LeftRight<f64>;

/// A point in polar form.
///
/// The angle is measured from the positive X axis, which is parallel to the
/// baseline between the two anchors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Polar {
    pub radius: f64,
    pub angle: Angle,
}

impl Polar {
    pub fn new(radius: f64, angle: Angle) -> Self {
        Polar { radius, angle }
    }

    pub fn from_cartesian(p: Point) -> Self {
        Polar {
            radius: sqrt(square(p.x) + square(p.y)),
            angle: Angle::radians(atan2(p.y, p.x)),
        }
    }

    pub fn to_cartesian(&self) -> Point {
        Point::new(
            self.radius * cos(self.angle.radians),
            self.radius * sin(self.angle.radians),
        )
    }

    pub fn with_radius(&self, radius: f64) -> Self {
        Polar {
            radius,
            angle: self.angle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("the base length must be positive, not {0}")]
    NonPositiveBaseLength(f64),
    #[error("steps per millimeter must be positive, not {0}")]
    NonPositiveStepsPerMm(f64),
    #[error("geometry constants must be finite")]
    NonFinite,
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GeometryBuilder {
    base_length: f64,
    origin_offset: Offset,
    steps_per_mm: f64,
}

impl Default for GeometryBuilder {
    fn default() -> Self {
        Self {
            base_length: 690.0,
            origin_offset: Offset::new(135.0, -690.0),
            steps_per_mm: 40.0,
        }
    }
}

impl GeometryBuilder {
    pub fn build(&self) -> Result<MachineGeometry, GeometryError> {
        let finite = self.base_length.is_finite()
            && self.steps_per_mm.is_finite()
            && self.origin_offset.x.is_finite()
            && self.origin_offset.y.is_finite();
        if !finite {
            return Err(GeometryError::NonFinite);
        }
        if self.base_length <= 0.0 {
            return Err(GeometryError::NonPositiveBaseLength(self.base_length));
        }
        if self.steps_per_mm <= 0.0 {
            return Err(GeometryError::NonPositiveStepsPerMm(self.steps_per_mm));
        }
        Ok(self.build_unchecked())
    }

    fn build_unchecked(&self) -> MachineGeometry {
        MachineGeometry {
            base_length: self.base_length,
            origin_offset: self.origin_offset,
            steps_per_mm: self.steps_per_mm,
        }
    }

    pub fn with_base_length(&mut self, base_length: f64) -> &mut Self {
        self.base_length = base_length;
        self
    }

    pub fn with_origin_offset(&mut self, x: f64, y: f64) -> &mut Self {
        self.origin_offset = Offset::new(x, y);
        self
    }

    pub fn with_steps_per_mm(&mut self, steps: f64) -> &mut Self {
        self.steps_per_mm = steps;
        self
    }
}

impl TryFrom<GeometryBuilder> for MachineGeometry {
    type Error = GeometryError;

    fn try_from(b: GeometryBuilder) -> Result<Self, GeometryError> {
        b.build()
    }
}

/// The physical layout of a v-plotter.
///
/// This can only be made through a [`GeometryBuilder`] (or deserialized,
/// which goes through one), so the constants are always sane.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "GeometryBuilder")]
pub struct MachineGeometry {
    /// The horizontal distance between the anchors, in millimeters.
    base_length: f64,
    /// Where the Cartesian origin sits, measured from the left anchor.
    ///
    /// The Y component is negative for a pen hanging below the anchors.
    origin_offset: Offset,
    steps_per_mm: f64,
}

impl Default for MachineGeometry {
    fn default() -> Self {
        // The builder's defaults are the measured rig, which is valid.
        GeometryBuilder::default().build_unchecked()
    }
}

impl MachineGeometry {
    pub fn base_length(&self) -> f64 {
        self.base_length
    }

    pub fn origin_offset(&self) -> Offset {
        self.origin_offset
    }

    pub fn steps_per_mm(&self) -> f64 {
        self.steps_per_mm
    }

    pub fn cord_lengths(&self, p: &Point) -> CordLengths {
        let p = translate(*p, self.origin_offset);
        CordLengths {
            left: self.steps_per_mm * sqrt(square(p.x) + square(p.y)),
            right: self.steps_per_mm * sqrt(square(self.base_length - p.x) + square(p.y)),
        }
    }

    /// The inverse of [`MachineGeometry::cord_lengths`].
    ///
    /// Two points in the plane have any given pair of cord lengths, mirrored
    /// across the baseline. We pick the one on the same side as the origin.
    pub fn cord_lengths_to_point(&self, lengths: &CordLengths) -> Point {
        let b = self.base_length;
        let l = lengths.left / self.steps_per_mm;
        let r = lengths.right / self.steps_per_mm;
        let x = (square(b) + square(l) - square(r)) / (2.0 * b);
        // Rounding can push this slightly negative when the pen is on the baseline.
        let y = sqrt((square(l) - square(x)).max(0.0));
        let y = if self.origin_offset.y < 0.0 { -y } else { y };
        translate(Point::new(x, y), -self.origin_offset)
    }
}
