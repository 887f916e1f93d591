use vplotter_geom::Axis;

/// The hardware that a [`MotionController`](crate::MotionController) drives.
///
/// Each stepper has a step line and a direction line; the pen servo has a
/// PWM line. Writes are expected to succeed, so any error is treated as
/// fatal by the controller.
pub trait Actuator {
    type Error: core::fmt::Debug;

    /// Acquires the lines and puts them into their idle state.
    fn setup(&mut self) -> Result<(), Self::Error>;

    /// Sets the level of an axis' step line. The driver steps on the rising edge.
    fn step(&mut self, axis: Axis, high: bool) -> Result<(), Self::Error>;

    /// `forward` means paying out cord, making it longer.
    fn set_direction(&mut self, axis: Axis, forward: bool) -> Result<(), Self::Error>;

    /// Drives the pen servo. A duty of zero releases the signal.
    fn set_pwm(&mut self, duty: u16) -> Result<(), Self::Error>;

    /// Blocks for `us` microseconds.
    fn delay_us(&mut self, us: u32);
}
