//! Property tests for replay ordering and range bounds.

mod replay_bounds;
mod replay_order;
