use crate::{Actuator, MotionController, MotionError};

/// Servo settings for lifting and lowering the pen.
///
/// The duties are on the servo's PWM range (200 on the reference rig, where
/// a soft-PWM period is 20ms).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PenConfig {
    pub up_duty: u16,
    pub down_duty: u16,
    /// How long to hold the signal before releasing it, in microseconds.
    pub settle_us: u32,
}

impl Default for PenConfig {
    fn default() -> Self {
        PenConfig {
            up_duty: 13,
            down_duty: 8,
            settle_us: 500_000,
        }
    }
}

impl<A: Actuator> MotionController<A> {
    /// Moves the pen, waits for the servo to get there, and then releases
    /// the signal so that the servo doesn't sit there buzzing.
    pub fn set_pen_down(&mut self, down: bool) -> Result<(), MotionError<A::Error>> {
        let duty = if down {
            self.pen.down_duty
        } else {
            self.pen.up_duty
        };
        self.actuator.set_pwm(duty).map_err(MotionError::Actuator)?;
        self.actuator.delay_us(self.pen.settle_us);
        self.actuator.set_pwm(0).map_err(MotionError::Actuator)?;
        self.pen_down = down;
        Ok(())
    }

    pub fn pen_down(&mut self) -> Result<(), MotionError<A::Error>> {
        self.set_pen_down(true)
    }

    pub fn pen_up(&mut self) -> Result<(), MotionError<A::Error>> {
        self.set_pen_down(false)
    }
}
