//! Reserved-character tables
//!
//! Each table is a named, versioned constant so a filesystem convention can be
//! retargeted without touching the validation logic in [`super::SecurePathBuilder`].

/// Reserved characters for one filesystem convention.
///
/// The `path` set applies to strings that may contain separators. The
/// `file_name` set is stricter and additionally forbids the separators and the
/// volume separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservedCharacters {
    /// Table identifier
    pub name: &'static str,
    /// Bumped whenever either set changes
    pub version: u32,
    path: &'static [char],
    file_name: &'static [char],
    /// Reject U+0001..=U+001F in both contexts
    control_characters: bool,
}

/// Win32 conventions.
pub const WINDOWS_V1: ReservedCharacters = ReservedCharacters {
    name: "windows",
    version: 1,
    path: &['\0', '"', '<', '>', '|', '*', '?'],
    file_name: &['\0', '"', '<', '>', '|', '*', '?', ':', '\\', '/'],
    control_characters: true,
};

/// POSIX conventions. Only NUL and, in file names, `/` are reserved.
pub const POSIX_V1: ReservedCharacters = ReservedCharacters {
    name: "posix",
    version: 1,
    path: &['\0'],
    file_name: &['\0', '/'],
    control_characters: false,
};

impl ReservedCharacters {
    /// First reserved character in a path-context string
    pub fn find_in_path(&self, value: &str) -> Option<char> {
        self.find(value, self.path)
    }

    /// First reserved character in a file-name-context string
    pub fn find_in_file_name(&self, value: &str) -> Option<char> {
        self.find(value, self.file_name)
    }

    fn find(&self, value: &str, set: &[char]) -> Option<char> {
        value.chars().find(|c| {
            set.contains(c) || (self.control_characters && c.is_ascii_control() && *c != '\u{7f}')
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_path_allows_separators_and_drive() {
        assert_eq!(WINDOWS_V1.find_in_path("C:\\data\\logs/out.txt"), None);
        assert_eq!(WINDOWS_V1.find_in_path("C:\\da|ta"), Some('|'));
        assert_eq!(WINDOWS_V1.find_in_path("C:\\data\u{1}"), Some('\u{1}'));
    }

    #[test]
    fn test_windows_file_name_is_stricter() {
        assert_eq!(WINDOWS_V1.find_in_file_name("report.txt"), None);
        assert_eq!(WINDOWS_V1.find_in_file_name("sub\\report.txt"), Some('\\'));
        assert_eq!(WINDOWS_V1.find_in_file_name("C:report.txt"), Some(':'));
        assert_eq!(WINDOWS_V1.find_in_file_name("what?.txt"), Some('?'));
    }

    #[test]
    fn test_posix_tables() {
        assert_eq!(POSIX_V1.find_in_path("/var/data/what?.txt"), None);
        assert_eq!(POSIX_V1.find_in_path("/var/\0data"), Some('\0'));
        assert_eq!(POSIX_V1.find_in_file_name("a/b"), Some('/'));
        assert_eq!(POSIX_V1.find_in_file_name("tab\there"), None);
    }
}
