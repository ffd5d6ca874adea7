//! Reserved names.

use nancy_dom::QName;

/// Namespace of every name the expander reserves.
pub const NC_NAMESPACE: &str = "https://github.com/rrthomas/nancy/raw/master/nancy.dtd";

/// Prefix pre-bound to [`NC_NAMESPACE`] in source files and queries.
pub const NC_PREFIX: &str = "nc";

/// Element for a directory.
pub const DIRECTORY: &str = "directory";
/// Element for an executable file.
pub const EXECUTABLE: &str = "executable";
/// Element for a file whose content is not parsed.
pub const FILE: &str = "file";
/// Unprefixed element for anything that is neither a directory nor a file.
pub const UNKNOWN: &str = "unknown";

/// Element-form macro reference.
pub const MACRO: &str = "x";
/// Annotation left on a macro reference that failed in keep-going mode.
pub const ERROR: &str = "error";

/// Marker attribute holding the source path.
pub const PATH: &str = "path";
/// Marker attribute holding the basename.
pub const NAME: &str = "name";
/// Marker attribute holding the entry kind.
pub const KIND: &str = "kind";

/// `nc:`-prefixed name.
pub(crate) fn nc(local: &str) -> QName {
    QName::prefixed(NC_PREFIX, local, NC_NAMESPACE)
}
