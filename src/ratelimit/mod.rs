//! Rate limiting logic and state management.

mod limiter;
mod window;

pub use limiter::{Admission, RateLimiter};
pub use window::TimeWindow;
