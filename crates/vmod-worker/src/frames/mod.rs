//! Frame event processing: extraction, text merge, batching and naming.
//!
//! Each step takes the frame sequence by value and hands it on.

mod batch;
mod extract;
mod merge;

pub use batch::{partition, rebind_names};
pub use extract::extract_frame_events;
pub use merge::merge_text_scores;
