//! Rate limiting logic and state management.

mod clock;
mod limiter;
mod sweeper;
mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::RateLimiter;
pub use sweeper::{spawn_sweeper, SweeperHandle};
pub use window::{
    ClientWindow, RateLimitDecision, RateLimitPolicy, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW,
};
