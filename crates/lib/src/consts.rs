/// Application name, used for default directory names.
pub const APP_NAME: &str = "metapack";

/// Namespace carried by the root element of every generated manifest.
pub const PACKAGE_NAMESPACE: &str = "http://soap.sforce.com/2006/04/metadata";

/// File name of the standard deployment manifest.
pub const PACKAGE_MANIFEST: &str = "package.xml";

/// File name of the destructive (deletion) manifest.
pub const DESTRUCTIVE_MANIFEST: &str = "destructiveChanges.xml";

/// Marker in a file name identifying a companion descriptor file (e.g. `Foo.cls-meta.xml`).
pub const META_MARKER: &str = "-meta";

/// Declared type the registry assigns to plain XML companion files.
pub const XML_TYPE: &str = "XML";

/// Declared type given to paths whose extension is not in the registry.
pub const INVALID_TYPE: &str = "Invalid";

/// Container given to paths whose extension is not in the registry.
pub const EMPTY_CONTAINER: &str = "empty";

/// Member name meaning "every component of this type" in a repository `package.xml`.
pub const WILDCARD_MEMBER: &str = "*";

/// Published output naming the deployment stage directory.
pub const DEPLOY_OUTPUT: &str = "METAPACK_DEPLOY";

/// Published output naming the rollback archive.
pub const ROLLBACK_OUTPUT: &str = "METAPACK_ROLLBACK";
