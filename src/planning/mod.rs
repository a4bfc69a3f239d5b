//! Run Planning
//!
//! Partitions an asset sequence into units of work and estimates what
//! dispatching them will cost, before any network call is made.
//!
//! ## Window Policy
//!
//! Windows start at index 0 and advance by `stride = sequence_length - overlap`.
//! The last window may be shorter than `sequence_length`; planning stops as
//! soon as a window reaches the end of the sequence.
//!
//! | assets | length | overlap | windows             |
//! |--------|--------|---------|---------------------|
//! | 5      | 3      | 1       | `[0,1,2] [2,3,4]`   |
//! | 4      | 2      | 1       | `[0,1] [1,2] [2,3]` |
//! | 2      | 3      | 1       | `[0,1]`             |

pub mod cost;
pub mod window;

pub use cost::{CostEstimator, image_cost};
pub use window::{WindowPlanner, clamp_window, window_count};
