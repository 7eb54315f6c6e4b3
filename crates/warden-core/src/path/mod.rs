//! Secure path construction from untrusted segments
//!
//! [`SecurePathBuilder`] combines a trusted base directory with caller-supplied
//! segments and guarantees the result resolves inside that base, or fails.
//!
//! Every call runs the same pipeline:
//!
//! 1. blank inputs are rejected before any path logic ([`WardenError::InvalidArgument`]);
//! 2. each segment is checked syntactically against the reserved-character
//!    tables, the literal `..` rule and the multiple-`%` rule;
//! 3. segments are joined, anchored and canonicalized lexically;
//! 4. the result is compared against the canonical base, either as the exact
//!    parent or as any ancestor.

mod reserved;
mod style;

pub use reserved::{POSIX_V1, ReservedCharacters, WINDOWS_V1};
pub use style::PathStyle;

use crate::error::{WardenError, WardenResult};
use serde::{Serialize, Serializer};
use std::path::Path;
use style::LexicalPath;
use tracing::{debug, warn};

/// A canonical absolute path proven to lie inside the base it was built from.
///
/// Only [`SecurePathBuilder`] creates values of this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedPath {
    path: String,
    style: PathStyle,
}

impl ValidatedPath {
    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.path)
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    /// Final component of the path
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(|c| self.style.is_separator(c))
            .next()
            .unwrap_or(&self.path)
    }

    pub fn into_string(self) -> String {
        self.path
    }
}

impl std::fmt::Display for ValidatedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

impl AsRef<str> for ValidatedPath {
    fn as_ref(&self) -> &str {
        &self.path
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        self.as_path()
    }
}

impl PartialEq<str> for ValidatedPath {
    fn eq(&self, other: &str) -> bool {
        self.path == other
    }
}

impl PartialEq<&str> for ValidatedPath {
    fn eq(&self, other: &&str) -> bool {
        self.path == *other
    }
}

impl Serialize for ValidatedPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path)
    }
}

/// How far below the base the combined path may land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Containment {
    /// The base must be the immediate parent
    ExactParent,
    /// Any depth below the base
    Descendant,
}

/// Builds paths that cannot escape their base directory.
///
/// The builder holds no state beyond its [`PathStyle`]; it is `Copy` and every
/// call revalidates from scratch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurePathBuilder {
    style: PathStyle,
}

impl SecurePathBuilder {
    /// Builder for the compilation target's conventions
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(style: PathStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    /// Combine `base_path` and a bare `file_name`.
    ///
    /// The canonical result's parent must be exactly the base path, so the
    /// file name cannot introduce directories.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] if either input is blank
    /// - [`WardenError::InvalidPath`] for reserved characters, a `..` in the
    ///   base, or more than one `%`
    /// - [`WardenError::TraversalRejected`] if the file name contains `..`,
    ///   separators or a volume, or the result is not directly inside the base
    pub fn build_exact(&self, base_path: &str, file_name: &str) -> WardenResult<ValidatedPath> {
        require_non_blank("base_path", base_path)?;
        require_non_blank("file_name", file_name)?;
        self.check_base(base_path)?;
        self.check_file_name(file_name)?;
        self.combine(base_path, &[file_name], Containment::ExactParent)
    }

    /// Combine `base_path` with a relative tail that may name subdirectories.
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] if either input is blank
    /// - [`WardenError::InvalidPath`] for reserved characters, a `..` in the
    ///   base, or more than one `%`
    /// - [`WardenError::TraversalRejected`] if the tail contains `..` or the
    ///   result does not lie below the base
    pub fn build_with_subdirectories(
        &self,
        base_path: &str,
        relative_path: &str,
    ) -> WardenResult<ValidatedPath> {
        require_non_blank("base_path", base_path)?;
        require_non_blank("relative_path", relative_path)?;
        self.check_base(base_path)?;
        self.check_relative("relative_path", relative_path)?;
        self.combine(base_path, &[relative_path], Containment::Descendant)
    }

    /// Combine `segments[0]` (base), any sub-directory segments, and
    /// `segments[last]` (file name).
    ///
    /// # Errors
    ///
    /// - [`WardenError::InvalidArgument`] if fewer than two segments are given
    ///   or any segment is blank
    /// - [`WardenError::InvalidPath`] / [`WardenError::TraversalRejected`] as
    ///   for [`build_exact`](Self::build_exact) and
    ///   [`build_with_subdirectories`](Self::build_with_subdirectories)
    pub fn build_from_segments<S: AsRef<str>>(&self, segments: &[S]) -> WardenResult<ValidatedPath> {
        if segments.len() < 2 {
            return Err(WardenError::InvalidArgument {
                name: "segments",
                reason: format!(
                    "at least a base path and a file name are required, got {} segment(s)",
                    segments.len()
                ),
            });
        }
        for segment in segments {
            require_non_blank("segments", segment.as_ref())?;
        }

        let base_path = segments[0].as_ref();
        let tail: Vec<&str> = segments[1..].iter().map(AsRef::as_ref).collect();
        let Some((file_name, directories)) = tail.split_last() else {
            return Err(WardenError::blank("segments"));
        };

        self.check_base(base_path)?;
        for directory in directories {
            self.check_relative("segments", directory)?;
        }
        self.check_file_name(file_name)?;
        self.combine(base_path, &tail, Containment::Descendant)
    }

    /// Whether `path` is free of reserved path characters and, when its last
    /// component looks like `name.ext`, free of reserved file-name characters.
    ///
    /// Structural problems produce `Ok(false)`; only a blank input is an error.
    ///
    /// # Errors
    ///
    /// [`WardenError::InvalidArgument`] if `path` is blank.
    pub fn is_valid(&self, path: &str) -> WardenResult<bool> {
        require_non_blank("path", path)?;
        let reserved = self.style.reserved_characters();
        if reserved.find_in_path(path).is_some() {
            return Ok(false);
        }

        let last = path
            .rsplit(|c| self.style.is_separator(c))
            .next()
            .unwrap_or(path);
        let has_extension = matches!(last.rfind('.'), Some(dot) if dot + 1 < last.len());
        if has_extension && reserved.find_in_file_name(last).is_some() {
            return Ok(false);
        }
        Ok(true)
    }

    fn check_base(&self, base_path: &str) -> WardenResult<()> {
        if let Some(c) = self.style.reserved_characters().find_in_path(base_path) {
            return Err(self.invalid(format!(
                "base path contains reserved character {:?}: {}",
                c, base_path
            )));
        }
        if base_path.contains("..") {
            return Err(self.invalid(format!("base path contains '..': {}", base_path)));
        }
        self.check_volume_separator("base path", base_path)?;
        self.check_percent(base_path)
    }

    /// Sub-directory names and relative tails
    fn check_relative(&self, name: &'static str, value: &str) -> WardenResult<()> {
        if value.contains("..") {
            return Err(self.traversal(format!("{} contains '..': {}", name, value)));
        }
        if let Some(c) = self.style.reserved_characters().find_in_path(value) {
            return Err(self.invalid(format!(
                "{} contains reserved character {:?}: {}",
                name, c, value
            )));
        }
        self.check_volume_separator(name, value)?;
        self.check_percent(value)
    }

    /// The volume separator may only appear in a leading `X:` drive prefix.
    /// Anywhere else it would name an alternate data stream.
    fn check_volume_separator(&self, name: &str, value: &str) -> WardenResult<()> {
        let Some(volume) = self.style.volume_separator() else {
            return Ok(());
        };
        let drive_prefix = value.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        let stray = value
            .char_indices()
            .any(|(index, c)| c == volume && !(index == 1 && drive_prefix));
        if stray {
            return Err(self.invalid(format!(
                "{} contains {:?} outside a drive prefix: {}",
                name, volume, value
            )));
        }
        Ok(())
    }

    fn check_file_name(&self, file_name: &str) -> WardenResult<()> {
        if file_name.contains("..") {
            return Err(self.traversal(format!("file name contains '..': {}", file_name)));
        }
        let changes_directory = file_name
            .chars()
            .any(|c| self.style.is_separator(c) || Some(c) == self.style.volume_separator());
        if changes_directory {
            return Err(self.traversal(format!(
                "file name must not name a directory or volume: {}",
                file_name
            )));
        }
        if let Some(c) = self.style.reserved_characters().find_in_file_name(file_name) {
            return Err(self.invalid(format!(
                "file name contains reserved character {:?}: {}",
                c, file_name
            )));
        }
        self.check_percent(file_name)
    }

    /// Two or more `%` could smuggle an environment-variable expansion.
    fn check_percent(&self, value: &str) -> WardenResult<()> {
        if value.matches('%').count() > 1 {
            return Err(self.invalid(format!("more than one '%' in: {}", value)));
        }
        Ok(())
    }

    fn combine(
        &self,
        base_path: &str,
        tail: &[&str],
        containment: Containment,
    ) -> WardenResult<ValidatedPath> {
        let base = LexicalPath::parse(self.style, base_path)?
            .absolutize(self.style)?
            .normalize();

        let mut combined = base.clone();
        for segment in tail {
            combined = combined.join(LexicalPath::parse(self.style, segment)?);
        }
        let combined = combined.absolutize(self.style)?.normalize();
        let rendered = combined.render(self.style);

        let contained = combined.is_within(&base, self.style)
            && match containment {
                Containment::ExactParent => combined.depth() == base.depth() + 1,
                Containment::Descendant => combined.depth() > base.depth(),
            };
        if !contained {
            return Err(self.traversal(format!(
                "{} resolves outside of {}",
                rendered,
                base.render(self.style)
            )));
        }

        debug!(path = %rendered, style = %self.style, "Path validated");
        Ok(ValidatedPath {
            path: rendered,
            style: self.style,
        })
    }

    fn invalid(&self, detail: String) -> WardenError {
        warn!(category = "invalid_path", style = %self.style, "{}", detail);
        WardenError::InvalidPath(detail)
    }

    fn traversal(&self, detail: String) -> WardenError {
        warn!(category = "traversal_rejected", style = %self.style, "{}", detail);
        WardenError::TraversalRejected(detail)
    }
}

fn require_non_blank(name: &'static str, value: &str) -> WardenResult<()> {
    if value.trim().is_empty() {
        return Err(WardenError::blank(name));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows() -> SecurePathBuilder {
        SecurePathBuilder::with_style(PathStyle::Windows)
    }

    fn posix() -> SecurePathBuilder {
        SecurePathBuilder::with_style(PathStyle::Posix)
    }

    #[test]
    fn test_build_exact_normalizes_trailing_separator() {
        let path = windows().build_exact("C:\\data\\", "report.txt").unwrap();
        assert_eq!(path, "C:\\data\\report.txt");
        assert_eq!(path.file_name(), "report.txt");
    }

    #[test]
    fn test_build_exact_rejects_traversal() {
        let result = windows().build_exact("C:\\data", "..\\..\\escape.txt");
        assert!(matches!(result, Err(WardenError::TraversalRejected(_))));
    }

    #[test]
    fn test_build_exact_rejects_benign_looking_traversal() {
        // resolves back to C:\data\x.txt but still carries a traversal token
        let result = windows().build_exact("C:\\data", "..\\data\\x.txt");
        assert!(matches!(result, Err(WardenError::TraversalRejected(_))));
    }

    #[test]
    fn test_build_exact_rejects_subdirectories_and_volumes() {
        for name in ["sub\\x.txt", "sub/x.txt", "D:x.txt", "\\\\srv\\share\\x.txt"] {
            let result = windows().build_exact("C:\\data", name);
            assert!(
                matches!(result, Err(WardenError::TraversalRejected(_))),
                "Should reject file name: {}",
                name
            );
        }
    }

    #[test]
    fn test_build_exact_invalid_characters() {
        let result = windows().build_exact("C:\\data", "a<b>.txt");
        assert!(matches!(result, Err(WardenError::InvalidPath(_))));

        let result = windows().build_exact("C:\\da|ta", "a.txt");
        assert!(matches!(result, Err(WardenError::InvalidPath(_))));
    }

    #[test]
    fn test_base_with_dot_dot_is_invalid_path() {
        let result = windows().build_exact("C:\\data\\..\\windows", "a.txt");
        assert!(matches!(result, Err(WardenError::InvalidPath(_))));
    }

    #[test]
    fn test_percent_heuristic() {
        assert!(windows().build_exact("C:\\data", "50%.txt").is_ok());
        assert!(matches!(
            windows().build_exact("C:\\data", "%TEMP%.txt"),
            Err(WardenError::InvalidPath(_))
        ));
        assert!(matches!(
            windows().build_exact("C:\\%APPDATA%", "a.txt"),
            Err(WardenError::InvalidPath(_))
        ));
        assert!(matches!(
            windows().build_with_subdirectories("C:\\data", "%USERPROFILE%\\a.txt"),
            Err(WardenError::InvalidPath(_))
        ));
        assert!(matches!(
            windows().build_from_segments(&["C:\\data", "%TEMP%", "a.txt"]),
            Err(WardenError::InvalidPath(_))
        ));
        assert!(matches!(
            posix().build_with_subdirectories("/srv", "%HOME%/a.txt"),
            Err(WardenError::InvalidPath(_))
        ));
        assert!(
            windows()
                .build_from_segments(&["C:\\data", "50%", "a.txt"])
                .is_ok()
        );

        // is_valid is a character predicate only; the '%' rule is not applied
        assert!(posix().is_valid("/srv/%HOME%/a.txt").unwrap());
    }

    #[test]
    fn test_blank_inputs_rejected_before_path_logic() {
        // the invalid base would otherwise produce InvalidPath
        let result = windows().build_exact("C:\\da|ta", "   ");
        assert!(matches!(
            result,
            Err(WardenError::InvalidArgument {
                name: "file_name",
                ..
            })
        ));
        assert!(matches!(
            windows().build_with_subdirectories("", "a.txt"),
            Err(WardenError::InvalidArgument {
                name: "base_path",
                ..
            })
        ));
    }

    #[test]
    fn test_build_with_subdirectories() {
        let path = windows()
            .build_with_subdirectories("C:\\data", "sub/deep/file.txt")
            .unwrap();
        assert_eq!(path, "C:\\data\\sub\\deep\\file.txt");

        let result = windows().build_with_subdirectories("C:\\data", "../../escape.txt");
        assert!(matches!(result, Err(WardenError::TraversalRejected(_))));
    }

    #[test]
    fn test_build_with_subdirectories_rejects_rooted_tail() {
        for tail in ["D:\\other\\x.txt", "\\windows\\x.txt", "\\\\srv\\share\\x.txt"] {
            let result = windows().build_with_subdirectories("C:\\data", tail);
            assert!(
                matches!(result, Err(WardenError::TraversalRejected(_))),
                "Should reject tail: {}",
                tail
            );
        }

        let result = posix().build_with_subdirectories("/srv/data", "/etc/passwd");
        assert!(matches!(result, Err(WardenError::TraversalRejected(_))));
    }

    #[test]
    fn test_stray_volume_separator_rejected() {
        for tail in ["ab:c.txt", "sub\\report.txt:hidden", "sub:stream\\x.txt"] {
            let result = windows().build_with_subdirectories("C:\\data", tail);
            assert!(
                matches!(result, Err(WardenError::InvalidPath(_))),
                "Should reject tail: {}",
                tail
            );
        }

        let result = windows().build_from_segments(&["C:\\data", "ab:c", "out.txt"]);
        assert!(matches!(result, Err(WardenError::InvalidPath(_))));

        let result = windows().build_exact("C:\\data:stream", "a.txt");
        assert!(matches!(result, Err(WardenError::InvalidPath(_))));

        // a leading drive prefix is still a rooted tail, caught by containment
        let result = windows().build_with_subdirectories("C:\\data", "C:sub\\x.txt");
        assert!(matches!(result, Err(WardenError::TraversalRejected(_))));

        // ':' is an ordinary character on POSIX
        let path = posix().build_with_subdirectories("/srv", "a:b/c.txt").unwrap();
        assert_eq!(path, "/srv/a:b/c.txt");
    }

    #[test]
    fn test_tail_resolving_to_base_is_rejected() {
        let result = windows().build_with_subdirectories("C:\\data", ".\\.");
        assert!(matches!(result, Err(WardenError::TraversalRejected(_))));
    }

    #[test]
    fn test_prefix_sibling_is_not_a_descendant() {
        let result = windows().build_with_subdirectories("C:\\data", "C:\\database\\x.txt");
        assert!(matches!(result, Err(WardenError::TraversalRejected(_))));
    }

    #[test]
    fn test_build_from_segments() {
        let path = windows()
            .build_from_segments(&["C:\\data", "logs", "out.txt"])
            .unwrap();
        assert_eq!(path, "C:\\data\\logs\\out.txt");

        let result = windows().build_from_segments(&["C:\\data"]);
        assert!(matches!(result, Err(WardenError::InvalidArgument { .. })));

        let result = windows().build_from_segments(&["C:\\data", "..", "out.txt"]);
        assert!(matches!(result, Err(WardenError::TraversalRejected(_))));

        let result = windows().build_from_segments(&["C:\\data", "lo|gs", "out.txt"]);
        assert!(matches!(result, Err(WardenError::InvalidPath(_))));
    }

    #[test]
    fn test_unc_base() {
        let path = windows()
            .build_exact("\\\\server\\share\\drop", "in.csv")
            .unwrap();
        assert_eq!(path, "\\\\server\\share\\drop\\in.csv");

        let path = windows()
            .build_with_subdirectories("\\\\SERVER\\share", "a\\b.txt")
            .unwrap();
        assert_eq!(path, "\\\\SERVER\\share\\a\\b.txt");
    }

    #[test]
    fn test_filesystem_root_base() {
        let path = posix().build_exact("/", "top.txt").unwrap();
        assert_eq!(path, "/top.txt");

        let path = windows().build_exact("C:\\", "top.txt").unwrap();
        assert_eq!(path, "C:\\top.txt");
    }

    #[test]
    fn test_posix_build() {
        let path = posix().build_exact("/var/lib/app/", "state.json").unwrap();
        assert_eq!(path, "/var/lib/app/state.json");
        assert_eq!(path.as_path(), Path::new("/var/lib/app/state.json"));

        // backslash is an ordinary character on POSIX
        let path = posix().build_exact("/var/lib/app", "a\\b").unwrap();
        assert_eq!(path, "/var/lib/app/a\\b");
    }

    #[test]
    fn test_is_valid() {
        let builder = windows();
        assert!(builder.is_valid("C:\\data\\report.txt").unwrap());
        assert!(builder.is_valid("C:\\data\\no_extension").unwrap());
        assert!(!builder.is_valid("C:\\data\\re|port.txt").unwrap());
        assert!(!builder.is_valid("C:\\data\\a:b.txt").unwrap());
        assert!(matches!(
            builder.is_valid(" "),
            Err(WardenError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_validated_path_is_valid() {
        let builder = windows();
        let path = builder.build_exact("C:\\data", "report.txt").unwrap();
        assert!(builder.is_valid(path.as_str()).unwrap());
    }

    #[test]
    fn test_validated_path_serializes_as_string() {
        let path = posix().build_exact("/srv", "a.txt").unwrap();
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"/srv/a.txt\"");
    }
}
