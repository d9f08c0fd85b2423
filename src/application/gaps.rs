// Gap processor - marks holes in a raw series for chart rendering
use crate::domain::sample::{Sample, SeriesEntry};

/// Interleave gap markers wherever consecutive samples are more than `threshold_ms` apart.
///
/// With `fix_render`, each gap is framed as `Gap, 0 @ prev, 0 @ cur, Gap` so that
/// fill-to-zero area charts drop to the baseline instead of bridging the hole.
pub fn insert_gaps(samples: &[Sample], threshold_ms: i64, fix_render: bool) -> Vec<SeriesEntry> {
    let mut out = Vec::with_capacity(samples.len());
    let mut prev: Option<&Sample> = None;

    for cur in samples {
        if let Some(prev) = prev {
            if cur.timestamp - prev.timestamp > threshold_ms {
                out.push(SeriesEntry::Gap);
                if fix_render {
                    out.push(SeriesEntry::point(prev.timestamp, 0.0));
                    out.push(SeriesEntry::point(cur.timestamp, 0.0));
                    out.push(SeriesEntry::Gap);
                }
            }
        }
        out.push(SeriesEntry::Point(*cur));
        prev = Some(cur);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Sample> {
        vec![
            Sample::new(0, 1.0),
            Sample::new(1000, 2.0),
            Sample::new(9000, 3.0),
        ]
    }

    #[test]
    fn test_single_marker_per_gap() {
        let out = insert_gaps(&samples(), 3000, false);
        assert_eq!(
            out,
            vec![
                SeriesEntry::point(0, 1.0),
                SeriesEntry::point(1000, 2.0),
                SeriesEntry::Gap,
                SeriesEntry::point(9000, 3.0),
            ]
        );
    }

    #[test]
    fn test_fix_render_pins_gap_to_zero() {
        let out = insert_gaps(&samples(), 3000, true);
        assert_eq!(
            out,
            vec![
                SeriesEntry::point(0, 1.0),
                SeriesEntry::point(1000, 2.0),
                SeriesEntry::Gap,
                SeriesEntry::point(1000, 0.0),
                SeriesEntry::point(9000, 0.0),
                SeriesEntry::Gap,
                SeriesEntry::point(9000, 3.0),
            ]
        );
    }

    #[test]
    fn test_spacing_equal_to_threshold_is_not_a_gap() {
        let out = insert_gaps(&[Sample::new(0, 1.0), Sample::new(3000, 1.0)], 3000, true);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_empty_and_single_sample() {
        assert!(insert_gaps(&[], 3000, true).is_empty());
        assert_eq!(
            insert_gaps(&[Sample::new(5000, 4.0)], 10, true),
            vec![SeriesEntry::point(5000, 4.0)]
        );
    }
}
