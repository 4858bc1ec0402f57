//! Structural attention mask
//!
//! The context window splits into a known region `[0, boundary)` and a
//! prediction region `[boundary, context_length)`. Known-region positions
//! attend bidirectionally within the known region only; prediction-region
//! positions see the whole known region plus a strictly causal view of the
//! prediction region. The matrix is precomputed once per model and shared by
//! every block.

/// Precomputed boolean attention mask of shape
/// (context_length × context_length), row-major; `true` means "may attend".
#[derive(Debug, Clone)]
pub struct AttentionMask {
    allowed: Vec<bool>,
    context_length: usize,
    boundary: usize,
}

impl AttentionMask {
    /// Build the mask for a known-region boundary.
    ///
    /// Masked training uses `boundary = input_length` (the word region);
    /// the reversed task uses `boundary = group_size` (the permutation).
    pub fn new(context_length: usize, boundary: usize) -> Self {
        assert!(boundary <= context_length, "boundary exceeds context length");
        let mut allowed = vec![false; context_length * context_length];
        for i in 0..context_length {
            for k in 0..context_length {
                allowed[i * context_length + k] = k < boundary || (i >= boundary && k <= i);
            }
        }
        Self { allowed, context_length, boundary }
    }

    /// Whether position `i` may attend to position `k`.
    pub fn allows(&self, i: usize, k: usize) -> bool {
        self.allowed[i * self.context_length + k]
    }

    /// Index of the first prediction-region position.
    pub fn boundary(&self) -> usize {
        self.boundary
    }

    /// The top-left (t × t) sub-mask, for sequences shorter than the full
    /// context (masked training feeds context_length − 1 tokens).
    pub fn for_len(&self, t: usize) -> Vec<bool> {
        assert!(t <= self.context_length, "sequence longer than the context");
        let mut sub = Vec::with_capacity(t * t);
        for i in 0..t {
            sub.extend_from_slice(&self.allowed[i * self.context_length..i * self.context_length + t]);
        }
        sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_region_is_bidirectional_within_itself() {
        let mask = AttentionMask::new(11, 6);
        for i in 0..6 {
            for k in 0..6 {
                assert!(mask.allows(i, k), "word position {i} must see word position {k}");
            }
        }
    }

    #[test]
    fn test_word_region_never_sees_prediction_region() {
        let mask = AttentionMask::new(11, 6);
        for i in 0..6 {
            for k in 6..11 {
                assert!(!mask.allows(i, k), "word position {i} must not see prediction slot {k}");
            }
        }
    }

    #[test]
    fn test_prediction_region_sees_whole_word_region() {
        let mask = AttentionMask::new(11, 6);
        for i in 6..11 {
            for k in 0..6 {
                assert!(mask.allows(i, k));
            }
        }
    }

    #[test]
    fn test_prediction_region_is_strictly_causal() {
        let mask = AttentionMask::new(11, 6);
        for i in 6..11 {
            for k in 6..11 {
                assert_eq!(mask.allows(i, k), k <= i, "({i}, {k})");
            }
        }
    }

    #[test]
    fn test_every_row_allows_something() {
        // softmax over an all-masked row would be undefined
        let mask = AttentionMask::new(11, 6);
        for i in 0..11 {
            assert!((0..11).any(|k| mask.allows(i, k)), "row {i} fully masked");
        }
    }

    #[test]
    fn test_sub_mask_matches_full_mask() {
        let mask = AttentionMask::new(11, 6);
        let sub = mask.for_len(10);
        for i in 0..10 {
            for k in 0..10 {
                assert_eq!(sub[i * 10 + k], mask.allows(i, k));
            }
        }
    }

    #[test]
    fn test_reversed_boundary() {
        // reversed task: permutation (4 tokens) is the known region
        let mask = AttentionMask::new(11, 4);
        assert!(mask.allows(0, 3));
        assert!(!mask.allows(0, 4));
        assert!(mask.allows(7, 2));
        assert!(mask.allows(7, 7));
        assert!(!mask.allows(7, 8));
    }
}
