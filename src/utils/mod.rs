use std::fmt;
use std::time::{Duration, Instant};

/// A simple timer based on std::time::Instant that prints the elapsed time when it is displayed.
pub struct Timer {
    time: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Timer {
            time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.time.elapsed()
    }
}

impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:>68} {:>8.2} s",
            "elapsed time:",
            self.elapsed().as_secs_f32()
        )
    }
}
