use std::time::{Duration, Instant};

use bevy_ecs::{schedule::ShouldRun, system::ResMut};

use crate::config::MAX_UPDATE_STEPS;

/// Moves real time elapsed since the last call into the unsimulated pool.
pub fn advance_clock(mut time: ResMut<TimeResource>) {
    let now = Instant::now();
    let elapsed = now - time.last_frame;
    time.last_frame = now;
    time.accumulate(elapsed);
}

/// Keeps the fixed update stage looping while a full step of unsimulated time is pending.
pub fn update_criteria(mut time: ResMut<TimeResource>) -> ShouldRun {
    if time.consume_step() {
        ShouldRun::YesAndCheckAgain
    } else {
        ShouldRun::No
    }
}

#[derive(Clone, Debug)]
pub struct TimeResource {
    pub update_dt: Duration,
    pub max_steps: u32,

    pub ingame_time: Duration,
    pub ticks: u64,

    pub last_frame: Instant,
    // real time not yet simulated; never more than max_steps worth
    pub unsimulated_time: Duration,
    steps_this_frame: u32,
}

impl TimeResource {
    pub fn new(update_dt: Duration) -> Self {
        Self {
            update_dt,
            max_steps: MAX_UPDATE_STEPS,

            ingame_time: Duration::default(),
            ticks: 0,
            last_frame: Instant::now(),
            unsimulated_time: Duration::default(),
            steps_this_frame: 0,
        }
    }

    pub fn accumulate(&mut self, elapsed: Duration) {
        let cap = self.update_dt * self.max_steps;
        self.unsimulated_time = (self.unsimulated_time + elapsed).min(cap);
        self.steps_this_frame = 0;
    }

    /// Takes one fixed step out of the pool if one is available.
    pub fn consume_step(&mut self) -> bool {
        if self.unsimulated_time < self.update_dt || self.steps_this_frame >= self.max_steps {
            return false;
        }
        self.unsimulated_time -= self.update_dt;
        self.ingame_time += self.update_dt;
        self.ticks += 1;
        self.steps_this_frame += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_steps_are_consumed() {
        let dt = Duration::from_millis(10);
        let mut time = TimeResource::new(dt);
        time.accumulate(Duration::from_millis(25));

        assert!(time.consume_step());
        assert!(time.consume_step());
        assert!(!time.consume_step());
        assert_eq!(time.ticks, 2);
        assert_eq!(time.unsimulated_time, Duration::from_millis(5));

        time.accumulate(Duration::from_millis(5));
        assert!(time.consume_step());
        assert_eq!(time.ingame_time, Duration::from_millis(30));
    }

    #[test]
    fn long_stalls_are_capped() {
        let dt = Duration::from_millis(10);
        let mut time = TimeResource::new(dt);
        time.accumulate(Duration::from_secs(3));

        let mut steps = 0;
        while time.consume_step() {
            steps += 1;
        }
        assert_eq!(steps, MAX_UPDATE_STEPS);
    }
}
