//! Upload plan arithmetic.
//!
//! Parts are fixed-size 5 MiB slices; the multipart path is only selected
//! above a 50 MiB total.  Part numbering on the wire is 1-based and
//! contiguous; internally workers claim 0-based indices and convert at the
//! edge.  All of this is integer arithmetic with no I/O, kept separate from
//! the coordinator so it can be exercised exhaustively.

use serde::{Deserialize, Serialize};

/// Fixed size of every part except possibly the last.
pub const PART_SIZE: u64 = 5 * 1024 * 1024;

/// Totals above this take the multipart path.
pub const MULTIPART_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Slicing plan for one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPlan {
    total_size: u64,
}

impl UploadPlan {
    pub fn new(total_size: u64) -> Self {
        Self { total_size }
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Whether this payload takes the multipart path.
    pub fn is_multipart(&self) -> bool {
        self.total_size > MULTIPART_THRESHOLD
    }

    /// `ceil(total / PART_SIZE)`; zero for an empty payload.
    pub fn part_count(&self) -> u64 {
        self.total_size.div_ceil(PART_SIZE)
    }

    /// Byte range of the part at 0-based `index`: `[start, end)`.
    ///
    /// The caller must keep `index < part_count()`; the last part is short
    /// unless the total is an exact multiple of the part size.
    pub fn part_range(&self, index: u64) -> (u64, u64) {
        let start = index * PART_SIZE;
        let end = (start + PART_SIZE).min(self.total_size);
        (start, end)
    }
}

/// One uploaded part in the completion manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    /// 1-based wire part number.
    pub part_number: u32,
    /// Content tag returned by the object store, quotes stripped.
    pub etag: String,
}

/// Strips one pair of surrounding double quotes if present.
///
/// Object stores disagree on whether the ETag header value includes its
/// RFC-style quotes; the completion endpoint wants it bare.
pub fn normalize_etag(raw: &str) -> String {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
        .to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_count_is_ceiling_division() {
        assert_eq!(UploadPlan::new(0).part_count(), 0);
        assert_eq!(UploadPlan::new(1).part_count(), 1);
        assert_eq!(UploadPlan::new(PART_SIZE).part_count(), 1);
        assert_eq!(UploadPlan::new(PART_SIZE + 1).part_count(), 2);
        assert_eq!(UploadPlan::new(10 * PART_SIZE).part_count(), 10);
    }

    #[test]
    fn test_part_ranges_are_contiguous_and_cover_the_total() {
        let total = 3 * PART_SIZE + 123;
        let plan = UploadPlan::new(total);
        let mut expected_start = 0;
        for index in 0..plan.part_count() {
            let (start, end) = plan.part_range(index);
            assert_eq!(start, expected_start, "parts must be contiguous");
            assert!(end > start);
            expected_start = end;
        }
        assert_eq!(expected_start, total, "ranges must cover every byte once");
    }

    #[test]
    fn test_last_part_is_short() {
        let plan = UploadPlan::new(PART_SIZE + 10);
        let (start, end) = plan.part_range(1);
        assert_eq!(start, PART_SIZE);
        assert_eq!(end - start, 10);
    }

    #[test]
    fn test_exact_multiple_has_full_final_part() {
        let plan = UploadPlan::new(2 * PART_SIZE);
        let (start, end) = plan.part_range(1);
        assert_eq!(end - start, PART_SIZE);
    }

    #[test]
    fn test_multipart_selection_is_strictly_above_threshold() {
        assert!(!UploadPlan::new(MULTIPART_THRESHOLD).is_multipart());
        assert!(UploadPlan::new(MULTIPART_THRESHOLD + 1).is_multipart());
    }

    #[test]
    fn test_normalize_etag_strips_one_quote_pair() {
        assert_eq!(normalize_etag("\"abc123\""), "abc123");
        assert_eq!(normalize_etag("abc123"), "abc123");
        // A lone quote on one side is left alone.
        assert_eq!(normalize_etag("\"abc123"), "\"abc123");
        assert_eq!(normalize_etag("\"\"x\"\""), "\"x\"");
    }
}
