use vplotter_geom::{Axis, LeftRight, Point};

use crate::{Actuator, MotionController, MotionError};

/// The most steps that either motor takes in one call to
/// [`MotionController::move_short_dist`].
pub const MAX_STEPS_PER_CALL: u32 = 1000;

/// Cord length differences smaller than this are rounding, not movement.
pub const SUB_STEP_THRESHOLD: f64 = 0.5;

/// How one call to `move_short_dist` is going to step the motors.
///
/// The axis with more steps to take is the driver. It steps once per
/// iteration, and the follower takes however many steps it needs to keep its
/// progress proportional to the driver's.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Plan {
    driver: Axis,
    driver_steps: u32,
    follower_steps: u32,
    forward: LeftRight<bool>,
    clamped: bool,
}

impl Plan {
    /// Plans the steps for a (finite) difference in cord lengths. Returns
    /// `None` if both cords are already within rounding of their targets.
    fn new(delta: LeftRight<f64>) -> Option<Plan> {
        let demand = delta.map(f64::abs);
        if demand.left < SUB_STEP_THRESHOLD && demand.right < SUB_STEP_THRESHOLD {
            return None;
        }

        // Ties go to the right.
        let driver = if demand.left > demand.right {
            Axis::Left
        } else {
            Axis::Right
        };
        let mut lead = *demand.get(driver);
        let mut follow = *demand.get(driver.other());
        if follow < SUB_STEP_THRESHOLD {
            follow = 0.0;
        }

        let budget = MAX_STEPS_PER_CALL as f64;
        let clamped = lead > budget;
        if clamped {
            follow = follow * budget / lead;
            lead = budget;
        }

        Some(Plan {
            driver,
            // lead is at least 0.5, so this is at least 1.
            driver_steps: lead.round() as u32,
            follower_steps: follow.round() as u32,
            forward: delta.map(|d| d > 0.0),
            clamped,
        })
    }

    fn follower(&self) -> Axis {
        self.driver.other()
    }

    /// The number of follower steps that should be done once the driver has
    /// taken `i` steps: `i * follower_steps / driver_steps`, rounded.
    ///
    /// Since there are never more follower steps than driver steps, this
    /// grows by at most one for each driver step.
    fn follower_due(&self, i: u32) -> u32 {
        let i = i as u64;
        let f = self.follower_steps as u64;
        let d = self.driver_steps as u64;
        ((2 * i * f + d) / (2 * d)) as u32
    }
}

impl<A: Actuator> MotionController<A> {
    /// Moves towards `target`, taking at most [`MAX_STEPS_PER_CALL`] steps on
    /// each motor.
    ///
    /// The two motors are stepped in proportion, so the pen follows a
    /// straight line in cord-length space. That's only close to a straight
    /// line on the paper if the move is short.
    ///
    /// Returns `Ok(true)` if the target was reached and `Ok(false)` if the
    /// step budget ran out first, in which case it should be called again.
    /// `delay_us` is the length of one step.
    pub fn move_short_dist(
        &mut self,
        target: Point,
        delay_us: u32,
    ) -> Result<bool, MotionError<A::Error>> {
        if !(target.x.is_finite() && target.y.is_finite()) {
            return Err(MotionError::NonFiniteTarget {
                x: target.x,
                y: target.y,
            });
        }

        let goal = self.geometry.cord_lengths(&target);
        let cords = self.state.cord_lengths;
        let delta = LeftRight::new(goal.left - cords.left, goal.right - cords.right);
        if !(delta.left.is_finite() && delta.right.is_finite()) {
            return Err(MotionError::Desynchronized {
                steps_left: delta.left,
                steps_right: delta.right,
            });
        }
        log::trace!("steps left={:.2}, right={:.2}", delta.left, delta.right);

        let Some(plan) = Plan::new(delta) else {
            return Ok(true);
        };
        self.run(&plan, delay_us)?;
        Ok(!plan.clamped)
    }

    fn run(&mut self, plan: &Plan, delay_us: u32) -> Result<(), MotionError<A::Error>> {
        let driver = plan.driver;
        let follower = plan.follower();
        let driver_forward = *plan.forward.get(driver);
        let follower_forward = *plan.forward.get(follower);

        self.actuator
            .set_direction(driver, driver_forward)
            .map_err(MotionError::Actuator)?;
        if plan.follower_steps > 0 {
            self.actuator
                .set_direction(follower, follower_forward)
                .map_err(MotionError::Actuator)?;
        }

        let mut taken = 0;
        for i in 1..=plan.driver_steps {
            self.step(driver, driver_forward, delay_us)?;
            while taken < plan.follower_due(i) {
                self.step(follower, follower_forward, delay_us)?;
                taken += 1;
            }
        }
        Ok(())
    }

    fn step(
        &mut self,
        axis: Axis,
        forward: bool,
        delay_us: u32,
    ) -> Result<(), MotionError<A::Error>> {
        let half = delay_us / 2;
        self.actuator.step(axis, true).map_err(MotionError::Actuator)?;
        // The driver steps on the rising edge, so count it now even if the
        // falling edge fails.
        *self.state.cord_lengths.get_mut(axis) += if forward { 1.0 } else { -1.0 };
        self.actuator.delay_us(half);
        self.actuator.step(axis, false).map_err(MotionError::Actuator)?;
        self.actuator.delay_us(half);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Pulse, Recorder, RecorderError};
    use proptest::prelude::*;
    use vplotter_geom::MachineGeometry;

    fn controller() -> MotionController<Recorder> {
        let mut ctrl =
            MotionController::initialize(MachineGeometry::default(), Recorder::default()).unwrap();
        ctrl.actuator_mut().clear();
        ctrl
    }

    fn step_counts(pulses: &[Pulse]) -> LeftRight<u32> {
        let mut ret = LeftRight::new(0, 0);
        for p in pulses {
            *ret.get_mut(p.axis) += 1;
        }
        ret
    }

    #[test]
    fn plan_ties_go_right() {
        let plan = Plan::new(LeftRight::new(5.0, -5.0)).unwrap();
        assert_eq!(plan.driver, Axis::Right);
        assert_eq!(plan.driver_steps, 5);
        assert_eq!(plan.follower_steps, 5);
        assert_eq!(plan.forward, LeftRight::new(true, false));
        assert!(!plan.clamped);
    }

    #[test]
    fn plan_below_threshold() {
        assert_eq!(Plan::new(LeftRight::new(0.49, -0.2)), None);
        assert_eq!(Plan::new(LeftRight::new(0.0, 0.0)), None);
    }

    #[test]
    fn plan_single_axis() {
        let plan = Plan::new(LeftRight::new(0.3, 12.4)).unwrap();
        assert_eq!(plan.driver, Axis::Right);
        assert_eq!(plan.driver_steps, 12);
        assert_eq!(plan.follower_steps, 0);
        assert!(!plan.clamped);

        let plan = Plan::new(LeftRight::new(-2500.0, 0.1)).unwrap();
        assert_eq!(plan.driver, Axis::Left);
        assert_eq!(plan.driver_steps, 1000);
        assert_eq!(plan.follower_steps, 0);
        assert!(!plan.forward.left);
        assert!(plan.clamped);
    }

    #[test]
    fn plan_clamp_keeps_proportion() {
        let plan = Plan::new(LeftRight::new(3000.0, -1500.0)).unwrap();
        assert_eq!(plan.driver, Axis::Left);
        assert_eq!(plan.driver_steps, 1000);
        assert_eq!(plan.follower_steps, 500);
        assert!(plan.clamped);
    }

    #[test]
    fn follower_due_is_even() {
        let plan = Plan {
            driver: Axis::Left,
            driver_steps: 10,
            follower_steps: 3,
            forward: LeftRight::new(true, true),
            clamped: false,
        };
        let due: Vec<u32> = (0..=10).map(|i| plan.follower_due(i)).collect();
        assert_eq!(due, vec![0, 0, 1, 1, 1, 2, 2, 2, 2, 3, 3]);
    }

    #[test]
    fn move_to_current_position_is_noop() {
        let mut ctrl = controller();
        assert!(ctrl.move_short_dist(Point::origin(), 500).unwrap());
        assert!(ctrl.actuator().events.is_empty());
    }

    // Moving 40mm straight down takes about 1570 steps on the left cord,
    // so it needs two calls.
    #[test]
    fn budget_needs_two_calls() {
        let mut ctrl = controller();
        let target = Point::new(0.0, -40.0);
        let start = ctrl.cord_lengths();
        let goal = ctrl.geometry().cord_lengths(&target);
        let demand_left = goal.left - start.left;
        assert!(demand_left > 1000.0 && demand_left < 2000.0);
        assert!(goal.right - start.right < demand_left);

        assert!(!ctrl.move_short_dist(target, 100).unwrap());
        let first = step_counts(&ctrl.actuator().pulses().collect::<Vec<_>>());
        assert_eq!(first.left, 1000);
        assert!(first.right < 1000);
        ctrl.actuator_mut().clear();

        assert!(ctrl.move_short_dist(target, 100).unwrap());
        let second = step_counts(&ctrl.actuator().pulses().collect::<Vec<_>>());
        assert_eq!(second.left as f64, (demand_left - 1000.0).round());

        // Both cords lengthen.
        assert!(ctrl.actuator().pulses().all(|p| p.forward));
        let cords = ctrl.cord_lengths();
        assert!((cords.left - goal.left).abs() <= 0.5);
        assert!((cords.right - goal.right).abs() <= 0.5);

        ctrl.actuator_mut().clear();
        assert!(ctrl.move_short_dist(target, 100).unwrap());
        assert_eq!(ctrl.actuator().pulses().count(), 0);
    }

    #[test]
    fn pulse_timing() {
        let mut ctrl = controller();
        let target = Point::new(5.0, 0.0);
        ctrl.move_short_dist(target, 301).unwrap();
        let steps = ctrl.actuator().pulses().count() as u64;
        assert!(steps > 0);
        // Two half-periods per step, each rounded down.
        assert_eq!(ctrl.actuator().elapsed_us, steps * 300);
    }

    #[test]
    fn bad_targets() {
        let mut ctrl = controller();
        assert!(matches!(
            ctrl.move_short_dist(Point::new(f64::NAN, 0.0), 100),
            Err(MotionError::NonFiniteTarget { .. })
        ));
        assert!(matches!(
            ctrl.move_short_dist(Point::new(1e300, 0.0), 100),
            Err(MotionError::Desynchronized { .. })
        ));
        assert!(ctrl.actuator().events.is_empty());
    }

    #[test]
    fn failed_write_keeps_count() {
        let mut ctrl =
            MotionController::initialize(MachineGeometry::default(), Recorder::sticking_after(5))
                .unwrap();
        let start = ctrl.cord_lengths();

        let err = ctrl.move_short_dist(Point::new(0.0, -5.0), 100).unwrap_err();
        // Left drives, and the steps alternate L R L R L.
        assert!(matches!(
            err,
            MotionError::Actuator(RecorderError::StuckHigh(Axis::Left))
        ));

        // The fifth step went out on its rising edge, so it counts.
        let pulses: Vec<Pulse> = ctrl.actuator().pulses().collect();
        assert_eq!(pulses.len(), 5);
        let mut expected = start;
        for p in &pulses {
            *expected.get_mut(p.axis) += if p.forward { 1.0 } else { -1.0 };
        }
        assert_eq!(ctrl.cord_lengths(), expected);
    }

    proptest! {
        #[test]
        fn follower_tracks_driver(x in -15.0..15.0f64, y in -15.0..15.0f64) {
            let mut ctrl = controller();
            let target = Point::new(x, y);
            let goal = ctrl.geometry().cord_lengths(&target);

            prop_assert!(ctrl.move_short_dist(target, 100).unwrap());
            let pulses: Vec<Pulse> = ctrl.actuator().pulses().collect();
            let counts = step_counts(&pulses);

            if let Some(first) = pulses.first() {
                // The driver always goes first.
                let driver = first.axis;
                let d = *counts.get(driver) as f64;
                let f = *counts.get(driver.other()) as f64;
                prop_assert!(f <= d);
                let fact = f / d;

                let mut driver_taken = 0u32;
                let mut follower_taken = 0u32;
                for (idx, p) in pulses.iter().enumerate() {
                    if p.axis == driver {
                        driver_taken += 1;
                    } else {
                        follower_taken += 1;
                    }
                    let next_is_driver = pulses.get(idx + 1).map_or(true, |q| q.axis == driver);
                    if next_is_driver {
                        let expected = (driver_taken as f64 * fact).round();
                        prop_assert!((follower_taken as f64 - expected).abs() <= 1.0);
                    }
                }
            }

            let cords = ctrl.cord_lengths();
            prop_assert!((cords.left - goal.left).abs() <= 0.5);
            prop_assert!((cords.right - goal.right).abs() <= 0.5);
        }

        #[test]
        fn never_exceeds_budget(x in -300.0..300.0f64, y in -300.0..300.0f64) {
            let mut ctrl = controller();
            let target = Point::new(x, y);
            let mut calls = 0;
            loop {
                calls += 1;
                let done = ctrl.move_short_dist(target, 100).unwrap();
                let counts = step_counts(&ctrl.actuator().pulses().collect::<Vec<_>>());
                prop_assert!(counts.left <= MAX_STEPS_PER_CALL);
                prop_assert!(counts.right <= MAX_STEPS_PER_CALL);
                ctrl.actuator_mut().clear();
                if done {
                    break;
                }
                prop_assert!(calls < 100);
            }
        }
    }
}
