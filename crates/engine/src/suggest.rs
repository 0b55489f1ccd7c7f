//! Completion candidates for operation ids and `--param` flags.

use oaish_types::{FlattenedParameter, ShellConfig};

use crate::catalog::Catalog;

/// Operation ids and configured command names starting with `prefix`, ignoring case.
///
/// Commands come first in configuration order, then operations in document order.
pub fn complete_targets<'a>(catalog: &'a Catalog, config: &'a ShellConfig, prefix: &str) -> Vec<&'a str> {
    let needle = prefix.to_lowercase();
    config
        .commands
        .keys()
        .map(String::as_str)
        .chain(catalog.operation_ids())
        .filter(|candidate| candidate.to_lowercase().starts_with(&needle))
        .collect()
}

/// Inputs of `operation_id` not yet supplied, matching a partially typed flag.
///
/// `partial` may include the leading `--`. Required inputs are listed first.
pub fn suggest_parameters(catalog: &Catalog, operation_id: &str, supplied: &[&str], partial: &str) -> Vec<FlattenedParameter> {
    let needle = partial.trim_start_matches('-').to_lowercase();
    let (mut required, optional): (Vec<_>, Vec<_>) = catalog
        .params_for_operation(operation_id)
        .into_iter()
        .filter(|param| !supplied.contains(&param.name.as_str()))
        .filter(|param| param.name.to_lowercase().starts_with(&needle))
        .partition(|param| param.required);
    required.extend(optional);
    required
}

/// Renders a suggestion the way it is typed on the command line.
pub fn flag_for(param: &FlattenedParameter) -> String {
    format!("--{}", param.name)
}
