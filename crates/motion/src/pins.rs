//! An [`Actuator`] made of `embedded-hal` pins: a step and a direction line
//! for each stepper driver, and a PWM channel for the pen servo.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, Error as _, OutputPin, PinState};
use embedded_hal::pwm::{self, Error as _, SetDutyCycle};
use vplotter_geom::{Axis, LeftRight};

use crate::Actuator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinError {
    Digital(digital::ErrorKind),
    Pwm(pwm::ErrorKind),
}

fn digital_err<E: digital::Error>(e: E) -> PinError {
    PinError::Digital(e.kind())
}

fn pwm_err<E: pwm::Error>(e: E) -> PinError {
    PinError::Pwm(e.kind())
}

pub struct PinActuator<S, D, P, T> {
    step: LeftRight<S>,
    dir: LeftRight<D>,
    servo: P,
    delay: T,
    /// Which direction lines are wired backwards. The right motor faces the
    /// other way, so by default its direction is inverted.
    inverted: LeftRight<bool>,
    /// The servo duty that means 100%.
    pwm_range: u16,
}

impl<S, D, P, T> PinActuator<S, D, P, T>
where
    S: OutputPin,
    D: OutputPin,
    P: SetDutyCycle,
    T: DelayNs,
{
    pub fn new(step: LeftRight<S>, dir: LeftRight<D>, servo: P, delay: T) -> Self {
        PinActuator {
            step,
            dir,
            servo,
            delay,
            inverted: LeftRight::new(false, true),
            pwm_range: 200,
        }
    }

    pub fn with_inverted(mut self, inverted: LeftRight<bool>) -> Self {
        self.inverted = inverted;
        self
    }

    pub fn with_pwm_range(mut self, range: u16) -> Self {
        self.pwm_range = range.max(1);
        self
    }

    pub fn release(self) -> (LeftRight<S>, LeftRight<D>, P, T) {
        (self.step, self.dir, self.servo, self.delay)
    }
}

impl<S, D, P, T> Actuator for PinActuator<S, D, P, T>
where
    S: OutputPin,
    D: OutputPin,
    P: SetDutyCycle,
    T: DelayNs,
{
    type Error = PinError;

    fn setup(&mut self) -> Result<(), PinError> {
        for axis in [Axis::Left, Axis::Right] {
            self.step.get_mut(axis).set_low().map_err(digital_err)?;
            self.dir.get_mut(axis).set_low().map_err(digital_err)?;
        }
        self.servo.set_duty_cycle_fully_off().map_err(pwm_err)
    }

    fn step(&mut self, axis: Axis, high: bool) -> Result<(), PinError> {
        self.step
            .get_mut(axis)
            .set_state(PinState::from(high))
            .map_err(digital_err)
    }

    fn set_direction(&mut self, axis: Axis, forward: bool) -> Result<(), PinError> {
        let level = forward != *self.inverted.get(axis);
        self.dir
            .get_mut(axis)
            .set_state(PinState::from(level))
            .map_err(digital_err)
    }

    fn set_pwm(&mut self, duty: u16) -> Result<(), PinError> {
        self.servo
            .set_duty_cycle_fraction(duty.min(self.pwm_range), self.pwm_range)
            .map_err(pwm_err)
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}
