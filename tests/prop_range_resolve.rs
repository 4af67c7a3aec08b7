// Property: a resolved byte range always lies within the resource, its
// slice has exactly the advertised size, and unsatisfiable requests are
// rejected rather than clamped into nonsense.

use bytes::Bytes;
use proptest::prelude::*;
use segserve::ByteRange;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_bounded_range_within_resource(
        total in 1u64..1_000_000,
        start in 0u64..1_000_000,
        end in 0u64..1_000_000,
    ) {
        let header = format!("bytes={}-{}", start, end);
        match ByteRange::resolve(&header, total) {
            Ok(Some(range)) => {
                prop_assert!(start <= end);
                prop_assert!(start < total);
                prop_assert_eq!(range.start, start);
                prop_assert!(range.end < total);
                prop_assert!(range.start <= range.end);
            }
            Ok(None) => prop_assert!(false, "single range never falls back to full body"),
            Err(_) => {
                // Rejected only when inverted or past the end.
                prop_assert!(start > end || start >= total);
            }
        }
    }

    #[test]
    fn prop_suffix_range_covers_tail(total in 1u64..1_000_000, n in 1u64..2_000_000) {
        let range = ByteRange::resolve(&format!("bytes=-{}", n), total)
            .unwrap()
            .unwrap();
        prop_assert_eq!(range.end, total - 1);
        prop_assert_eq!(range.size(), n.min(total));
    }

    #[test]
    fn prop_open_range_reaches_end(total in 1u64..1_000_000, start in 0u64..1_000_000) {
        let result = ByteRange::resolve(&format!("bytes={}-", start), total);
        if start < total {
            let range = result.unwrap().unwrap();
            prop_assert_eq!(range.start, start);
            prop_assert_eq!(range.end, total - 1);
        } else {
            prop_assert!(result.is_err());
        }
    }

    #[test]
    fn prop_slice_length_matches_size(
        data in prop::collection::vec(any::<u8>(), 1..4096),
        start in 0usize..4096,
        end in 0usize..4096,
    ) {
        let total = data.len() as u64;
        let data = Bytes::from(data);
        let header = format!("bytes={}-{}", start, end);

        if let Ok(Some(range)) = ByteRange::resolve(&header, total) {
            let slice = range.slice(&data);
            prop_assert_eq!(slice.len() as u64, range.size());
            prop_assert_eq!(
                slice,
                data.slice(range.start as usize..=range.end as usize)
            );
        }
    }
}
