//! Batching and review-bound naming of frame events.

use std::num::NonZeroUsize;

use vmod_models::{FrameEvent, FrameNamingError};

/// Split frames into contiguous batches of at most `batch_size`, in order.
///
/// Zero frames yield zero batches.
pub fn partition(frames: Vec<FrameEvent>, batch_size: NonZeroUsize) -> Vec<Vec<FrameEvent>> {
    let size = batch_size.get();
    let mut batches = Vec::with_capacity(frames.len().div_ceil(size));
    let mut frames = frames.into_iter().peekable();
    while frames.peek().is_some() {
        batches.push(frames.by_ref().take(size).collect());
    }
    batches
}

/// Bind every frame name to `review_id`.
///
/// Fails if any frame is already bound to a review.
pub fn rebind_names(
    mut frames: Vec<FrameEvent>,
    review_id: &str,
) -> Result<Vec<FrameEvent>, FrameNamingError> {
    for frame in &mut frames {
        frame.frame_name.bind(review_id)?;
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmod_models::Score;

    fn frames(count: u32) -> Vec<FrameEvent> {
        (1..=count)
            .map(|i| FrameEvent::new(i, i as i64 * 40, false, Score::zero(), Score::zero(), false, false))
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_partition_1200_by_500() {
        let batches = partition(frames(1200), size(500));
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![500, 500, 200]);
    }

    #[test]
    fn test_partition_reconstructs_sequence() {
        for (count, batch) in [(1u32, 1usize), (7, 3), (9, 3), (10, 500), (501, 500)] {
            let original = frames(count);
            let batches = partition(original.clone(), size(batch));

            assert_eq!(batches.len(), (count as usize).div_ceil(batch));
            let last = batches.len() - 1;
            assert!(batches[..last].iter().all(|b| b.len() == batch));
            assert_eq!(batches.concat(), original);
        }
    }

    #[test]
    fn test_partition_empty_yields_no_batches() {
        assert!(partition(Vec::new(), size(500)).is_empty());
    }

    #[test]
    fn test_rebind_prefixes_review_id() {
        let bound = rebind_names(frames(2), "201712abc").unwrap();
        assert_eq!(bound[0].frame_name.to_string(), "201712abc_1.jpg");
        assert_eq!(bound[1].frame_name.to_string(), "201712abc_2.jpg");
    }

    #[test]
    fn test_rebind_twice_is_rejected() {
        let bound = rebind_names(frames(3), "rev").unwrap();
        let err = rebind_names(bound, "rev").unwrap_err();
        assert_eq!(
            err,
            FrameNamingError::AlreadyBound {
                ordinal: 1,
                review_id: "rev".into()
            }
        );
    }
}
