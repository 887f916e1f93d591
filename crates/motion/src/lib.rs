//! Motion control for a v-plotter.
//!
//! A [`MotionController`] owns an [`Actuator`] (the two stepper motors and
//! the pen servo) and keeps track of how much cord each motor has payed out.
//! Everything here is blocking: the delay between step edges is what sets
//! the speed, so a call doesn't return until the motors have stopped.

use vplotter_geom::{CordLengths, MachineGeometry, Point};

mod actuator;
mod linear;
mod pen;
pub mod pins;
pub mod sim;
mod sync;

pub use actuator::Actuator;
pub use linear::{step_delay_us, FEED_CORRECTION, MIN_STEP_DELAY_US, RAPID_FEED};
pub use pen::PenConfig;
pub use sync::{MAX_STEPS_PER_CALL, SUB_STEP_THRESHOLD};
pub use vplotter_geom::{Axis, LeftRight};

#[derive(Debug, thiserror::Error)]
pub enum MotionError<E: core::fmt::Debug> {
    /// The actuator couldn't be set up, so nothing was ever moved.
    #[error("could not acquire the actuator: {0:?}")]
    Unavailable(E),
    #[error("actuator failure: {0:?}")]
    Actuator(E),
    #[error("cannot move to non-finite point ({x}, {y})")]
    NonFiniteTarget { x: f64, y: f64 },
    /// The step demand couldn't be split into a driver and a follower. The
    /// motor state can't be trusted after this.
    #[error("lost track of the cords (step demand left {steps_left}, right {steps_right})")]
    Desynchronized { steps_left: f64, steps_right: f64 },
}

/// Where the machine is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MachineState {
    /// The cord lengths, in steps. These follow the motors exactly: they
    /// change by one for every step that gets sent.
    pub cord_lengths: CordLengths,
    /// The last position that was asked for.
    ///
    /// This can differ from the cord lengths by rounding, and it's only
    /// updated at the end of [`MotionController::move_to`].
    pub position: Point,
}

pub struct MotionController<A> {
    geometry: MachineGeometry,
    actuator: A,
    pen: PenConfig,
    pen_down: bool,
    state: MachineState,
}

impl<A: Actuator> MotionController<A> {
    /// Sets up the actuator and raises the pen.
    ///
    /// The pen is assumed to be at the origin, so the initial cord lengths
    /// come from the geometry's origin offset.
    pub fn initialize(
        geometry: MachineGeometry,
        actuator: A,
    ) -> Result<Self, MotionError<A::Error>> {
        Self::initialize_with_pen(geometry, actuator, PenConfig::default())
    }

    pub fn initialize_with_pen(
        geometry: MachineGeometry,
        mut actuator: A,
        pen: PenConfig,
    ) -> Result<Self, MotionError<A::Error>> {
        actuator.setup().map_err(MotionError::Unavailable)?;

        let cord_lengths = geometry.cord_lengths(&Point::origin());
        let offset = geometry.origin_offset();
        log::info!(
            "X0={}, Y0={}, cord left={:.1}, cord right={:.1}, steps per mm={}",
            offset.x,
            offset.y,
            cord_lengths.left,
            cord_lengths.right,
            geometry.steps_per_mm()
        );

        let mut ret = MotionController {
            geometry,
            actuator,
            pen,
            pen_down: false,
            state: MachineState {
                cord_lengths,
                position: Point::origin(),
            },
        };
        ret.pen_up()?;
        Ok(ret)
    }

    pub fn geometry(&self) -> &MachineGeometry {
        &self.geometry
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn position(&self) -> Point {
        self.state.position
    }

    pub fn cord_lengths(&self) -> CordLengths {
        self.state.cord_lengths
    }

    pub fn is_pen_down(&self) -> bool {
        self.pen_down
    }

    pub fn pen_config(&self) -> &PenConfig {
        &self.pen
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn into_actuator(self) -> A {
        self.actuator
    }
}
