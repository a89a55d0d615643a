// b2backup/src/storage/strategy.rs

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    Small,
    Large,
}

/// Sizes at or above `large_threshold_bytes` go through the multipart path.
pub fn choose_strategy(size_bytes: u64, large_threshold_bytes: u64) -> UploadStrategy {
    if size_bytes >= large_threshold_bytes {
        UploadStrategy::Large
    } else {
        UploadStrategy::Small
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_threshold_boundary_selects_large() {
        let threshold = 100 * MIB;
        assert_eq!(choose_strategy(threshold - 1, threshold), UploadStrategy::Small);
        assert_eq!(choose_strategy(threshold, threshold), UploadStrategy::Large);
        assert_eq!(choose_strategy(threshold + 1, threshold), UploadStrategy::Large);
    }

    #[test]
    fn test_sizes_on_either_side() {
        let threshold = 100 * MIB;
        for size in [0, 1, 10 * MIB, 99 * MIB] {
            assert_eq!(choose_strategy(size, threshold), UploadStrategy::Small);
        }
        for size in [100 * MIB, 250 * MIB, 5 * 1024 * MIB] {
            assert_eq!(choose_strategy(size, threshold), UploadStrategy::Large);
        }
    }
}
