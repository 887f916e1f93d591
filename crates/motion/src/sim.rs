//! A pretend actuator that just writes down what it was asked to do.

use vplotter_geom::{Axis, LeftRight};

use crate::Actuator;

/// A single step of one motor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pulse {
    pub axis: Axis,
    /// Whether the cord got longer.
    pub forward: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Pulse(Pulse),
    Pwm(u16),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RecorderError {
    #[error("the simulated actuator refused to start")]
    SetupRefused,
    #[error("{0:?} step line set to the level it already had")]
    NoEdge(Axis),
    #[error("{0:?} step line stuck high")]
    StuckHigh(Axis),
}

/// Records step pulses and servo writes instead of sending them anywhere.
///
/// Delays aren't slept, they're just added up in `elapsed_us`.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    pub elapsed_us: u64,
    direction: LeftRight<bool>,
    step_line: LeftRight<bool>,
    refuse_setup: bool,
    stick_after: Option<usize>,
}

impl Recorder {
    /// A recorder that fails to set up, like a machine without permission
    /// to touch its GPIO pins.
    pub fn refusing() -> Self {
        Recorder {
            refuse_setup: true,
            ..Recorder::default()
        }
    }

    /// A recorder whose step lines refuse to go low again once `pulses`
    /// step pulses have been sent.
    pub fn sticking_after(pulses: usize) -> Self {
        Recorder {
            stick_after: Some(pulses),
            ..Recorder::default()
        }
    }

    /// Forgets everything recorded so far. The line states are kept.
    pub fn clear(&mut self) {
        self.events.clear();
        self.elapsed_us = 0;
    }

    pub fn pulses(&self) -> impl Iterator<Item = Pulse> + '_ {
        self.events.iter().filter_map(|ev| match ev {
            Event::Pulse(p) => Some(*p),
            Event::Pwm(_) => None,
        })
    }

    pub fn steps(&self, axis: Axis) -> usize {
        self.pulses().filter(|p| p.axis == axis).count()
    }
}

impl Actuator for Recorder {
    type Error = RecorderError;

    fn setup(&mut self) -> Result<(), RecorderError> {
        if self.refuse_setup {
            return Err(RecorderError::SetupRefused);
        }
        self.direction = LeftRight::default();
        self.step_line = LeftRight::default();
        Ok(())
    }

    fn step(&mut self, axis: Axis, high: bool) -> Result<(), RecorderError> {
        if !high && self.stick_after.is_some_and(|n| self.pulses().count() >= n) {
            return Err(RecorderError::StuckHigh(axis));
        }
        let line = self.step_line.get_mut(axis);
        if *line == high {
            return Err(RecorderError::NoEdge(axis));
        }
        *line = high;
        if high {
            self.events.push(Event::Pulse(Pulse {
                axis,
                forward: *self.direction.get(axis),
            }));
        }
        Ok(())
    }

    fn set_direction(&mut self, axis: Axis, forward: bool) -> Result<(), RecorderError> {
        *self.direction.get_mut(axis) = forward;
        Ok(())
    }

    fn set_pwm(&mut self, duty: u16) -> Result<(), RecorderError> {
        self.events.push(Event::Pwm(duty));
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += us as u64;
    }
}
