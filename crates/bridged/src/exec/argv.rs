//! Argument vector construction.

use bridge_config::ParameterStyle;

use crate::validate::CommandCall;

/// Appends validated parameters to the command's fixed arguments.
///
/// Parameters arrive in declaration order, so the client's key order never
/// influences placement.
pub(super) fn build_arguments(call: &CommandCall<'_>) -> Vec<String> {
    let mut arguments = call.spec.fixed_arguments().to_vec();
    for bound in &call.parameters {
        let name = bound.spec.name();
        let value = bound.value.to_string();
        match bound.spec.style() {
            ParameterStyle::Argument => arguments.push(value),
            ParameterStyle::Flag => {
                arguments.push(format!("--{name}"));
                arguments.push(value);
            }
            ParameterStyle::SingleFlag => arguments.push(format!("--{name}={value}")),
        }
    }
    arguments
}
