// Reports a protocol violation: a logic defect upstream of the bridge.
// With the `fatal_invariants` feature this panics, otherwise the violation is
// logged and the caller abandons the current operation.
cfg_if! {
    if #[cfg(feature = "fatal_invariants")] {
        pub(crate) fn report_violation(context: &str, violation: &dyn std::error::Error) {
            panic!("protocol violation in {}: {}", context, violation);
        }
    } else {
        use log::error;

        pub(crate) fn report_violation(context: &str, violation: &dyn std::error::Error) {
            error!("protocol violation in {}: {}", context, violation);
        }
    }
}
