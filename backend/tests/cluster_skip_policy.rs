//! Embedded cluster failures break the suite unless skipping is requested.

use env_lock::lock_env;
use rstest::rstest;

mod support;

use support::cluster_skip::should_skip_test_cluster;
use support::handle_cluster_setup_failure;

#[rstest]
#[case(None, false)]
#[case(Some("1"), true)]
#[case(Some("YES"), true)]
#[case(Some("0"), false)]
fn skip_flag_is_opt_in(#[case] value: Option<&str>, #[case] expected: bool) {
    let _guard = lock_env([("SKIP_TEST_CLUSTER", value.map(str::to_owned))]);

    assert_eq!(should_skip_test_cluster(), expected);
}

#[rstest]
#[should_panic(expected = "Set SKIP_TEST_CLUSTER=1 to skip")]
fn setup_failures_panic_by_default() {
    let _guard = lock_env([("SKIP_TEST_CLUSTER", None::<String>)]);

    let _: Option<()> = handle_cluster_setup_failure("cluster unavailable");
}

#[rstest]
fn setup_failures_skip_when_requested() {
    let _guard = lock_env([("SKIP_TEST_CLUSTER", Some("true".to_owned()))]);

    let skipped: Option<()> = handle_cluster_setup_failure("cluster unavailable");

    assert!(skipped.is_none());
}
