//! Property-based tests for secure path construction
//!
//! Verifies, across generated inputs:
//! - exact builds land directly inside the base
//! - any traversal token or foreign root in a file name is rejected
//! - relative builds stay below the base
//! - validated paths re-validate cleanly

use proptest::prelude::*;
use warden_core::{PathStyle, SecurePathBuilder, WardenError};

fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ -]{0,6}[A-Za-z0-9_]"
}

fn file_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_]{1,8}\\.[a-z]{1,4}"
}

/// `C:\a\b` with an optional trailing separator
fn windows_base() -> impl Strategy<Value = String> {
    (
        "[A-Z]",
        prop::collection::vec(segment(), 0..4),
        prop::bool::ANY,
    )
        .prop_map(|(drive, segments, trailing)| {
            let mut base = format!("{}:\\{}", drive, segments.join("\\"));
            if trailing && !segments.is_empty() {
                base.push('\\');
            }
            base
        })
}

fn posix_base() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 0..4).prop_map(|segments| format!("/{}", segments.join("/")))
}

fn windows() -> SecurePathBuilder {
    SecurePathBuilder::with_style(PathStyle::Windows)
}

fn trim_windows(base: &str) -> String {
    let trimmed = base.trim_end_matches('\\');
    if trimmed.ends_with(':') {
        format!("{}\\", trimmed)
    } else {
        trimmed.to_string()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the parent of an exact build is the normalized base
    #[test]
    fn prop_exact_parent_is_base(base in windows_base(), name in file_name()) {
        let path = windows().build_exact(&base, &name).unwrap();
        let rendered = path.as_str();
        let (parent, last) = rendered.rsplit_once('\\').unwrap();
        prop_assert_eq!(last, name.as_str());

        let expected = trim_windows(&base);
        let parent = if parent.ends_with(':') { format!("{}\\", parent) } else { parent.to_string() };
        prop_assert_eq!(parent.to_lowercase(), expected.to_lowercase());
    }

    /// Property: a file name carrying `..` is always a traversal, wherever it resolves
    #[test]
    fn prop_dot_dot_in_file_name_rejected(
        base in windows_base(),
        prefix in "[a-z\\\\/]{0,4}",
        suffix in "[a-z\\\\/.]{0,6}",
    ) {
        let name = format!("{}..{}", prefix, suffix);
        let result = windows().build_exact(&base, &name);
        prop_assert!(matches!(result, Err(WardenError::TraversalRejected(_))));
    }

    /// Property: a file name naming another volume is a traversal
    #[test]
    fn prop_foreign_root_rejected(base in windows_base(), drive in "[A-Z]", name in file_name()) {
        let escaped = format!("{}:\\{}", drive, name);
        let result = windows().build_exact(&base, &escaped);
        prop_assert!(matches!(result, Err(WardenError::TraversalRejected(_))));
    }

    /// Property: relative builds land strictly below the base
    #[test]
    fn prop_subdirectories_are_descendants(
        base in posix_base(),
        dirs in prop::collection::vec(segment(), 0..4),
        name in file_name(),
    ) {
        let builder = SecurePathBuilder::with_style(PathStyle::Posix);
        let mut relative = dirs.join("/");
        if !relative.is_empty() {
            relative.push('/');
        }
        relative.push_str(&name);

        let path = builder.build_with_subdirectories(&base, &relative).unwrap();
        let base_prefix = if base == "/" { base.clone() } else { format!("{}/", base) };
        prop_assert!(path.as_str().starts_with(&base_prefix));
        prop_assert!(path.as_str().ends_with(&name));
    }

    /// Property: every validated path passes `is_valid` without error
    #[test]
    fn prop_validated_paths_revalidate(base in windows_base(), dirs in prop::collection::vec(segment(), 1..3), name in file_name()) {
        let builder = windows();
        let mut segments = vec![base];
        segments.extend(dirs);
        segments.push(name);

        let path = builder.build_from_segments(&segments).unwrap();
        prop_assert!(builder.is_valid(path.as_str()).unwrap());
    }

    /// Property: whatever a subdirectory build accepts re-validates, even when
    /// the tail carries volume separators in arbitrary positions
    #[test]
    fn prop_subdirectory_builds_revalidate(
        base in windows_base(),
        dirs in prop::collection::vec("[A-Za-z0-9_:]{1,6}", 0..3),
        name in "[A-Za-z0-9_:]{1,8}\\.[a-z:]{1,4}",
    ) {
        let builder = windows();
        let mut tail = dirs.join("\\");
        if !tail.is_empty() {
            tail.push('\\');
        }
        tail.push_str(&name);

        if let Ok(path) = builder.build_with_subdirectories(&base, &tail) {
            prop_assert!(builder.is_valid(path.as_str()).unwrap());
            prop_assert!(!path.as_str()[2..].contains(':'), "stream marker in {}", path);
        }
    }
}

#[test]
fn test_concrete_scenarios() {
    let builder = windows();
    assert_eq!(
        builder.build_exact("C:\\data\\", "report.txt").unwrap().as_str(),
        "C:\\data\\report.txt"
    );
    assert!(matches!(
        builder.build_exact("C:\\data", "..\\..\\escape.txt"),
        Err(WardenError::TraversalRejected(_))
    ));
    assert_eq!(
        builder
            .build_from_segments(&["C:\\data", "logs", "out.txt"])
            .unwrap()
            .as_str(),
        "C:\\data\\logs\\out.txt"
    );
    assert!(
        builder
            .build_with_subdirectories("C:\\data", "sub/deep/file.txt")
            .is_ok()
    );
    assert!(matches!(
        builder.build_with_subdirectories("C:\\data", "../../escape.txt"),
        Err(WardenError::TraversalRejected(_))
    ));
}

#[test]
fn test_native_relative_base_resolves_against_working_directory() {
    let builder = SecurePathBuilder::new();
    let path = builder.build_exact("relative_dir", "file.txt").unwrap();
    let cwd = std::env::current_dir().unwrap();
    assert!(path.as_path().starts_with(&cwd));
    assert!(path.as_path().is_absolute());
}

#[test]
fn test_builder_shared_across_threads() {
    let builder = windows();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                builder
                    .build_exact("C:\\data", &format!("file{}.txt", i))
                    .map(|p| p.into_string())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let path = handle.join().unwrap().unwrap();
        assert_eq!(path, format!("C:\\data\\file{}.txt", i));
    }
}
