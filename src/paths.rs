//! Sandbox policy for input and output paths.
//!
//! Conversions touch the filesystem twice, at the source and the
//! destination, and both paths come from the caller. The policy confines
//! them to a configured root directory (plus the system temp directory)
//! and rejects traversal components and URL-scheme wrappers before any
//! file is opened. The root is an explicit field on the policy, set at
//! construction time.

use crate::error::{Error, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Path validation policy confining conversions to a root directory.
#[derive(Debug, Clone)]
pub struct SandboxPolicy {
    root: PathBuf,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            root: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

impl SandboxPolicy {
    /// Create a policy rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The configured sandbox root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate an input path: it must pass screening, canonicalize to an
    /// existing regular file, and reside under the sandbox root or the
    /// system temp directory.
    pub fn validate_input(&self, path: &Path) -> Result<PathBuf> {
        screen(path)?;
        let canonical = path
            .canonicalize()
            .map_err(|_| Error::InvalidPath(format!("{}: not found", path.display())))?;
        let meta = canonical.metadata()?;
        if !meta.is_file() {
            return Err(Error::InvalidPath(format!(
                "{}: not a regular file",
                path.display()
            )));
        }
        if !self.is_sandboxed(&canonical) {
            return Err(Error::InvalidPath(format!(
                "{}: outside sandbox",
                path.display()
            )));
        }
        Ok(canonical)
    }

    /// Validate an output path: its parent must exist, be a writable
    /// directory under the sandbox, and the result is the canonical parent
    /// joined with the base name.
    pub fn validate_output(&self, path: &Path) -> Result<PathBuf> {
        screen(path)?;
        let name = path
            .file_name()
            .ok_or_else(|| Error::InvalidPath(format!("{}: no file name", path.display())))?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let parent = parent
            .canonicalize()
            .map_err(|_| Error::InvalidPath(format!("{}: parent not found", path.display())))?;
        let meta = parent.metadata()?;
        if !meta.is_dir() {
            return Err(Error::InvalidPath(format!(
                "{}: parent is not a directory",
                path.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(Error::InvalidPath(format!(
                "{}: parent is not writable",
                path.display()
            )));
        }
        if !self.is_sandboxed(&parent) {
            return Err(Error::InvalidPath(format!(
                "{}: outside sandbox",
                path.display()
            )));
        }
        Ok(parent.join(name))
    }

    fn is_sandboxed(&self, canonical: &Path) -> bool {
        if let Ok(root) = self.root.canonicalize() {
            if canonical.starts_with(&root) {
                return true;
            }
        }
        if let Ok(temp) = env::temp_dir().canonicalize() {
            if canonical.starts_with(&temp) {
                return true;
            }
        }
        false
    }
}

/// Lexical screening applied before any filesystem access.
fn screen(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidPath("empty path".to_string()));
    }
    if path.as_os_str().as_encoded_bytes().contains(&0) {
        return Err(Error::InvalidPath("path contains NUL byte".to_string()));
    }
    let text = path.to_string_lossy();
    if has_url_scheme(&text) {
        return Err(Error::InvalidPath(format!("{}: URL scheme not allowed", text)));
    }
    if text.split('/').any(|part| part == "..") {
        return Err(Error::InvalidPath(format!(
            "{}: parent traversal not allowed",
            text
        )));
    }
    Ok(())
}

/// Whether the path begins with a `scheme://` wrapper prefix.
fn has_url_scheme(text: &str) -> bool {
    let Some(pos) = text.find("://") else {
        return false;
    };
    let scheme = &text[..pos];
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        }
        _ => false,
    }
}
