#![no_main]

use cordyceps_rbtree::model::MergeInput;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: MergeInput| {
    cordyceps_rbtree::model::run_merge_equivalence(input);
});
