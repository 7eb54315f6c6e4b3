//! Path syntax per filesystem convention and lexical canonicalization
//!
//! Canonicalization here never touches the filesystem: the target of a path
//! being built usually does not exist yet, so `.` and `..` are resolved
//! textually and a non-qualified path is anchored at the working directory.

use super::reserved::{POSIX_V1, ReservedCharacters, WINDOWS_V1};
use crate::error::{WardenError, WardenResult};
use serde::{Deserialize, Serialize};

/// Filesystem convention a path is built under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// Drive letters, UNC shares, `\` and `/` separators, case-insensitive
    Windows,
    /// Single `/` root, `/` separator, case-sensitive
    Posix,
}

impl PathStyle {
    /// The convention of the compilation target
    pub const fn native() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }

    /// Separator used when rendering
    pub const fn separator(self) -> char {
        match self {
            PathStyle::Windows => '\\',
            PathStyle::Posix => '/',
        }
    }

    pub fn is_separator(self, c: char) -> bool {
        match self {
            PathStyle::Windows => c == '\\' || c == '/',
            PathStyle::Posix => c == '/',
        }
    }

    pub const fn volume_separator(self) -> Option<char> {
        match self {
            PathStyle::Windows => Some(':'),
            PathStyle::Posix => None,
        }
    }

    pub fn reserved_characters(self) -> &'static ReservedCharacters {
        match self {
            PathStyle::Windows => &WINDOWS_V1,
            PathStyle::Posix => &POSIX_V1,
        }
    }

    pub const fn is_case_sensitive(self) -> bool {
        matches!(self, PathStyle::Posix)
    }

    fn names_equal(self, a: &str, b: &str) -> bool {
        if self.is_case_sensitive() {
            a == b
        } else {
            a.to_lowercase() == b.to_lowercase()
        }
    }
}

impl Default for PathStyle {
    fn default() -> Self {
        Self::native()
    }
}

impl std::fmt::Display for PathStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathStyle::Windows => f.write_str("windows"),
            PathStyle::Posix => f.write_str("posix"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Root {
    Relative,
    /// Leading separator with no volume
    Separator,
    /// Upper-cased drive letter
    Drive(char),
    Unc { server: String, share: String },
}

/// A path split into its root and its non-empty components
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexicalPath {
    pub(crate) root: Root,
    pub(crate) components: Vec<String>,
}

impl LexicalPath {
    pub(crate) fn parse(style: PathStyle, value: &str) -> WardenResult<Self> {
        match style {
            PathStyle::Posix => Ok(Self {
                root: if value.starts_with('/') {
                    Root::Separator
                } else {
                    Root::Relative
                },
                components: split_components(style, value),
            }),
            PathStyle::Windows => Self::parse_windows(value),
        }
    }

    fn parse_windows(value: &str) -> WardenResult<Self> {
        let style = PathStyle::Windows;
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(a), Some(b)) if style.is_separator(a) && style.is_separator(b) => {
                let mut parts = split_components(style, value).into_iter();
                match (parts.next(), parts.next()) {
                    (Some(server), Some(share)) => Ok(Self {
                        root: Root::Unc { server, share },
                        components: parts.collect(),
                    }),
                    _ => Err(WardenError::InvalidPath(format!(
                        "network path must name a server and a share: {}",
                        value
                    ))),
                }
            }
            // `C:relative` is treated as rooted at the drive; there is no
            // per-drive working directory to resolve it against.
            (Some(letter), Some(':')) if letter.is_ascii_alphabetic() => Ok(Self {
                root: Root::Drive(letter.to_ascii_uppercase()),
                components: split_components(style, &value[2..]),
            }),
            (Some(a), _) if style.is_separator(a) => Ok(Self {
                root: Root::Separator,
                components: split_components(style, value),
            }),
            _ => Ok(Self {
                root: Root::Relative,
                components: split_components(style, value),
            }),
        }
    }

    /// Append `tail`. A rooted tail replaces everything before it; on Windows a
    /// tail rooted only by a separator keeps the current volume.
    pub(crate) fn join(mut self, tail: LexicalPath) -> Self {
        match tail.root {
            Root::Relative => {
                self.components.extend(tail.components);
                self
            }
            Root::Separator if matches!(self.root, Root::Drive(_) | Root::Unc { .. }) => Self {
                root: self.root,
                components: tail.components,
            },
            _ => tail,
        }
    }

    /// Anchor a non fully-qualified path at the working directory.
    pub(crate) fn absolutize(self, style: PathStyle) -> WardenResult<Self> {
        let qualified = match (&self.root, style) {
            (Root::Relative, _) => false,
            (Root::Separator, PathStyle::Windows) => false,
            _ => true,
        };
        if qualified {
            return Ok(self);
        }
        Ok(working_directory(style)?.join(self))
    }

    /// Resolve `..` textually; it never climbs above the root.
    pub(crate) fn normalize(self) -> Self {
        let mut components: Vec<String> = Vec::with_capacity(self.components.len());
        for component in self.components {
            if component == ".." {
                components.pop();
            } else {
                components.push(component);
            }
        }
        Self {
            root: self.root,
            components,
        }
    }

    /// Whether `self` equals `base` or lies somewhere beneath it
    pub(crate) fn is_within(&self, base: &LexicalPath, style: PathStyle) -> bool {
        let same_root = match (&self.root, &base.root) {
            (
                Root::Unc { server, share },
                Root::Unc {
                    server: base_server,
                    share: base_share,
                },
            ) => {
                style.names_equal(server.as_str(), base_server.as_str())
                    && style.names_equal(share.as_str(), base_share.as_str())
            }
            (root, base_root) => root == base_root,
        };

        same_root
            && self.components.len() >= base.components.len()
            && self
                .components
                .iter()
                .zip(&base.components)
                .all(|(a, b)| style.names_equal(a.as_str(), b.as_str()))
    }

    pub(crate) fn depth(&self) -> usize {
        self.components.len()
    }

    pub(crate) fn render(&self, style: PathStyle) -> String {
        let sep = style.separator();
        let mut out = match &self.root {
            Root::Relative => String::new(),
            Root::Separator => sep.to_string(),
            Root::Drive(letter) => format!("{}:{}", letter, sep),
            Root::Unc { server, share } => format!("{sep}{sep}{server}{sep}{share}"),
        };
        let unc = matches!(self.root, Root::Unc { .. });
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 || unc {
                out.push(sep);
            }
            out.push_str(component);
        }
        out
    }
}

fn split_components(style: PathStyle, value: &str) -> Vec<String> {
    value
        .split(|c| style.is_separator(c))
        .filter(|part| !part.is_empty() && *part != ".")
        .map(str::to_string)
        .collect()
}

fn working_directory(style: PathStyle) -> WardenResult<LexicalPath> {
    if style != PathStyle::native() {
        return Err(WardenError::InvalidPath(format!(
            "path is not fully qualified and cannot be resolved for {} style",
            style
        )));
    }
    let cwd = std::env::current_dir().map_err(|e| {
        WardenError::InvalidPath(format!("cannot resolve working directory: {}", e))
    })?;
    let cwd = cwd.to_str().ok_or_else(|| {
        WardenError::InvalidPath("working directory is not valid UTF-8".to_string())
    })?;
    LexicalPath::parse(style, cwd)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows(value: &str) -> LexicalPath {
        LexicalPath::parse(PathStyle::Windows, value).unwrap()
    }

    #[test]
    fn test_parse_windows_roots() {
        assert_eq!(windows("c:\\data\\").root, Root::Drive('C'));
        assert_eq!(windows("c:\\data\\").components, vec!["data"]);
        assert_eq!(windows("\\logs").root, Root::Separator);
        assert_eq!(windows("logs\\a").root, Root::Relative);
        assert_eq!(
            windows("\\\\server\\share\\dir").root,
            Root::Unc {
                server: "server".to_string(),
                share: "share".to_string()
            }
        );
        assert!(LexicalPath::parse(PathStyle::Windows, "\\\\server").is_err());
    }

    #[test]
    fn test_rooted_tail_replaces_base() {
        let joined = windows("C:\\data").join(windows("D:\\other"));
        assert_eq!(joined.render(PathStyle::Windows), "D:\\other");

        let same_drive = windows("C:\\data").join(windows("\\other"));
        assert_eq!(same_drive.render(PathStyle::Windows), "C:\\other");
    }

    #[test]
    fn test_normalize_never_climbs_above_root() {
        let path = windows("C:\\a\\..\\..\\b").normalize();
        assert_eq!(path.render(PathStyle::Windows), "C:\\b");
    }

    #[test]
    fn test_render_unc() {
        let path = windows("//server/share/docs/./a.txt");
        assert_eq!(path.render(PathStyle::Windows), "\\\\server\\share\\docs\\a.txt");
    }

    #[test]
    fn test_containment_case_rules() {
        let base = windows("C:\\Data");
        assert!(windows("c:\\data\\x.txt").is_within(&base, PathStyle::Windows));
        assert!(!windows("C:\\database\\x.txt").is_within(&base, PathStyle::Windows));

        let posix_base = LexicalPath::parse(PathStyle::Posix, "/data").unwrap();
        let other = LexicalPath::parse(PathStyle::Posix, "/Data/x").unwrap();
        assert!(!other.is_within(&posix_base, PathStyle::Posix));
    }

    #[test]
    fn test_foreign_relative_path_cannot_be_resolved() {
        let foreign = if PathStyle::native() == PathStyle::Windows {
            PathStyle::Posix
        } else {
            PathStyle::Windows
        };
        let relative = LexicalPath::parse(foreign, "relative").unwrap();
        assert!(matches!(
            relative.absolutize(foreign),
            Err(WardenError::InvalidPath(_))
        ));
    }
}
