//! Well-known namespaces, attributes and directives.

/// Package exports and imports; the package name is the attribute of the same name
pub const PACKAGE: &str = "wiring.package";
/// Whole-resource requirements (require-bundle)
pub const BUNDLE: &str = "wiring.bundle";
/// Attachment of a fragment to its host
pub const HOST: &str = "wiring.host";
pub const IDENTITY: &str = "identity";

pub const VERSION_ATTRIBUTE: &str = "version";
pub const BUNDLE_VERSION_ATTRIBUTE: &str = "bundle-version";

pub const USES_DIRECTIVE: &str = "uses";
pub const RESOLUTION_DIRECTIVE: &str = "resolution";
pub const VISIBILITY_DIRECTIVE: &str = "visibility";

pub const RESOLUTION_MANDATORY: &str = "mandatory";
pub const RESOLUTION_OPTIONAL: &str = "optional";
pub const RESOLUTION_DYNAMIC: &str = "dynamic";
pub const VISIBILITY_REEXPORT: &str = "reexport";
