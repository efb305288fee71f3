//! Release file naming.

use crate::core::platform::TargetPlatform;

/// Derive the release file name for a build.
///
/// The name is `{name}-{platform}-v{version}[-{qualifier}]{ext}` with the
/// application name lowercased. It depends only on its arguments, so a
/// rebuild of the same inputs always lands on the same file.
pub fn release_name(
    app_name: &str,
    target: &TargetPlatform,
    version: &str,
    qualifier: Option<&str>,
) -> String {
    let mut name = format!(
        "{}-{}-v{}",
        app_name.to_lowercase(),
        target.identifier(),
        version
    );

    if let Some(qualifier) = qualifier.filter(|q| !q.is_empty()) {
        name.push('-');
        name.push_str(qualifier);
    }

    name.push_str(target.file_extension());
    name
}
