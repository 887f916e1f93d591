use vplotter_geom::{translate, Point, Polar};

use crate::{Actuator, MotionController, MotionError};

/// The feed rate used for rapid moves, in mm/min. In practice this just
/// runs into [`MIN_STEP_DELAY_US`].
pub const RAPID_FEED: f64 = 100_000.0;

/// The machine is a bit slower than the nominal feed rate; this was measured.
pub const FEED_CORRECTION: f64 = 1.2;

/// The stepper drivers don't cope with shorter steps than this.
pub const MIN_STEP_DELAY_US: u32 = 100;

/// The interpolated sub-moves are this long, in millimeters.
const SUB_MOVE_MM: f64 = 1.0;

/// Converts a feed rate (in mm/min) into the length of a single step, in
/// microseconds. A feed rate that isn't positive means "as fast as possible."
pub fn step_delay_us(steps_per_mm: f64, feed: f64) -> u32 {
    let feed = if feed > 0.0 && feed.is_finite() {
        feed
    } else {
        RAPID_FEED
    };
    let delay = 60_000_000.0 / (steps_per_mm * feed * FEED_CORRECTION);
    (delay as u32).max(MIN_STEP_DELAY_US)
}

impl<A: Actuator> MotionController<A> {
    /// Moves the pen in a straight line to `(x, y)`, at `feed` mm/min.
    ///
    /// Straight lines on paper aren't straight in cord-length space, so the
    /// move is chopped into 1mm pieces along the way, each of which is
    /// handed to [`MotionController::move_short_dist`].
    pub fn move_to(&mut self, x: f64, y: f64, feed: f64) -> Result<(), MotionError<A::Error>> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(MotionError::NonFiniteTarget { x, y });
        }

        let delay = step_delay_us(self.geometry.steps_per_mm(), feed);
        log::debug!("move to ({x}, {y}) at {feed} mm/min, time={delay}");

        let start = self.state.position;
        let target = Point::new(x, y);
        let polar = Polar::from_cartesian(translate(target, -start.to_vector()));

        let mut r = SUB_MOVE_MM;
        while r < polar.radius {
            let p = translate(polar.with_radius(r).to_cartesian(), start.to_vector());
            self.settle_at(p, delay)?;
            r += SUB_MOVE_MM;
        }
        // Rounding means the last sub-move probably wasn't quite on the target.
        self.settle_at(target, delay)?;

        self.state.position = target;
        Ok(())
    }

    fn settle_at(&mut self, p: Point, delay_us: u32) -> Result<(), MotionError<A::Error>> {
        while !self.move_short_dist(p, delay_us)? {}
        Ok(())
    }
}
