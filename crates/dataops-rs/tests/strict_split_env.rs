use dataops_rs::backend::ptir_utils::tensor_spec_static;
use dataops_rs::backend::spec::DType;
use dataops_rs::ops::data::split;
use dataops_rs::{GraphBuilder, LoweringError, LoweringOptions, SplitPolicy};

// The flag is read once per process, so this binary holds a single test that sets it first.
#[test]
fn strict_split_env_flag_turns_overflow_into_an_error() {
    std::env::set_var("DATAOPS_STRICT_SPLIT", "true");

    let options = LoweringOptions::from_env();
    assert_eq!(options.split, SplitPolicy::Strict);

    let mut b = GraphBuilder::new();
    assert_eq!(b.options().split, SplitPolicy::Strict);
    let x = b.parameter(tensor_spec_static(DType::F32, &[3, 5]));
    let err = split(&mut b, &x, &[2, 2, 2], 1).expect_err("strict split overflows");
    assert_eq!(
        err,
        LoweringError::SplitSizeOverflow {
            index: 2,
            requested: 2,
            remaining: 1,
        }
    );
    assert!(b.instructions().is_empty());

    std::env::set_var("DATAOPS_STRICT_SPLIT", "0");
    assert_eq!(LoweringOptions::from_env().split, SplitPolicy::Strict);
}
