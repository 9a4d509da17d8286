use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};

/// Case-encode a module path or version the way the module proxy expects:
/// every uppercase ASCII letter becomes `!` followed by its lowercase form.
///
/// Paths that already contain `!`, are empty, or contain control characters
/// are rejected because their escaped form would be ambiguous.
pub fn escape_module_path(path: &str) -> Result<String> {
    let invalid = |reason| StoreError::InvalidModulePath {
        path: path.to_string(),
        reason,
    };
    if path.is_empty() {
        return Err(invalid("empty"));
    }

    let mut escaped = String::with_capacity(path.len() + 4);
    for c in path.chars() {
        match c {
            '!' => return Err(invalid("contains '!'")),
            c if c.is_control() => return Err(invalid("contains a control character")),
            c if c.is_ascii_uppercase() => {
                escaped.push('!');
                escaped.push(c.to_ascii_lowercase());
            }
            c => escaped.push(c),
        }
    }
    Ok(escaped)
}

/// Relative location of one module file inside the namespace root:
/// `<escaped module>/@v/<escaped version>/<file>`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct LogicalPath(PathBuf);

impl LogicalPath {
    /// Build the namespace path for archive member `member` of `module@version`.
    ///
    /// Module zips prefix every member with `<module>@<version>/`; that prefix
    /// is replaced by the `@v/<version>` directory. Members outside the prefix
    /// are kept whole under the version directory.
    pub fn for_member(module: &str, version: &str, member: &str) -> Result<Self> {
        let mut path = PathBuf::new();
        for segment in escape_module_path(module)?.split('/') {
            check_segment(segment).map_err(|reason| StoreError::InvalidModulePath {
                path: module.to_string(),
                reason,
            })?;
            path.push(segment);
        }

        let escaped_version = escape_module_path(version)?;
        let version_check = match check_segment(&escaped_version) {
            Ok(()) if escaped_version.contains('/') => Err("version contains '/'"),
            other => other,
        };
        version_check.map_err(|reason| StoreError::InvalidModulePath {
            path: version.to_string(),
            reason,
        })?;
        path.push("@v");
        path.push(escaped_version);

        let prefix = format!("{module}@{version}/");
        let relative = member.strip_prefix(prefix.as_str()).unwrap_or(member);
        let invalid = |reason| StoreError::InvalidMember {
            member: member.to_string(),
            reason,
        };
        if relative.is_empty() {
            return Err(invalid("empty file name"));
        }
        if relative.starts_with('/') || relative.contains('\\') {
            return Err(invalid("absolute or non-portable path"));
        }
        for segment in relative.split('/') {
            check_segment(segment).map_err(invalid)?;
            path.push(segment);
        }

        Ok(Self(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

fn check_segment(segment: &str) -> std::result::Result<(), &'static str> {
    match segment {
        "" => Err("empty path segment"),
        "." | ".." => Err("relative path segment"),
        s if s.contains('\0') => Err("contains NUL"),
        _ => Ok(()),
    }
}

impl AsRef<Path> for LogicalPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl fmt::Debug for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LogicalPath({})", self.0.display())
    }
}
