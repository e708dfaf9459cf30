/*!
 * Lookup Property Tests
 * Every address inside a live block resolves to that block, and only to it
 */

use proptest::prelude::*;
use rgc::memory::BlockTable;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_find_containing_matches_ranges(
        sizes in prop::collection::vec(1usize..600, 1..40),
        offsets in prop::collection::vec(any::<usize>(), 40),
        release_mask in prop::collection::vec(any::<bool>(), 40),
    ) {
        let mut table = BlockTable::with_capacity(1 << 24);
        let handles: Vec<_> = sizes
            .iter()
            .map(|&size| table.allocate(size).unwrap())
            .collect();

        for (index, handle) in handles.iter().enumerate() {
            if release_mask[index] {
                table.release(handle.address()).unwrap();
            }
        }

        for (index, (handle, &size)) in handles.iter().zip(&sizes).enumerate() {
            let start = handle.address();
            let inside = start + offsets[index] % size;
            if release_mask[index] {
                prop_assert_ne!(table.find_containing(inside), Some(*handle));
            } else {
                prop_assert_eq!(table.find_containing(inside), Some(*handle));
                prop_assert_ne!(table.find_containing(start + size), Some(*handle));
            }
        }

        for block in table.iter() {
            prop_assert!(block.size > 0);
            prop_assert_eq!(table.find_containing(block.end() - 1), Some(block.handle()));
        }
    }
}
