// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Decides whether two filesystem paths denote the same project directory.
//!
//! The server may run in a remote or containerized environment, so the
//! reported path can differ cosmetically from the editor's local path
//! (separators, trailing slash, casing). Comparison also allows parent/child
//! containment in either direction: the editor may have a subdirectory of the
//! served tree open, or vice versa.

/// Returns true if `server_path` and `local_path` denote the same project
/// directory, or one contains the other.
///
/// Case sensitivity follows the *local* OS filesystem convention: the editor
/// side decides, regardless of what convention the server's environment uses.
#[must_use]
pub fn paths_match(server_path: &str, local_path: &str) -> bool {
    paths_match_with(server_path, local_path, local_fs_case_insensitive())
}

/// Whether the native filesystem of the local OS compares paths
/// case-insensitively.
#[must_use]
pub const fn local_fs_case_insensitive() -> bool {
    cfg!(any(windows, target_os = "macos"))
}

/// Comparison core with explicit case handling, split out so tests cover both
/// conventions on any host.
pub(crate) fn paths_match_with(
    server_path: &str,
    local_path: &str,
    case_insensitive: bool,
) -> bool {
    if server_path.is_empty() || local_path.is_empty() {
        return false;
    }

    let Some(a) = normalize(server_path, case_insensitive) else {
        return false;
    };
    let Some(b) = normalize(local_path, case_insensitive) else {
        return false;
    };

    // Equal, or one is a segment-wise prefix of the other (containment).
    // The filesystem root normalizes to zero segments and is a prefix of
    // every absolute path.
    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    longer.starts_with(shorter.as_slice())
}

/// Splits a path into normalized segments: separators unified, `.` dropped,
/// `..` resolved against preceding segments, trailing separator ignored.
///
/// The filesystem root resolves to an empty segment list, which is still a
/// valid path. A relative path that resolves to nothing (`.`, `a/..`) is not,
/// and yields `None`.
fn normalize(path: &str, case_insensitive: bool) -> Option<Vec<String>> {
    let unified = path.replace('\\', "/");
    let mut segments: Vec<String> = Vec::new();

    for raw in unified.split('/') {
        match raw {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => {
                let segment = if case_insensitive {
                    segment.to_lowercase()
                } else {
                    segment.to_string()
                };
                segments.push(segment);
            }
        }
    }

    if segments.is_empty() && !unified.starts_with('/') {
        return None;
    }

    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_paths_match() {
        assert!(paths_match("/home/user/project", "/home/user/project"));
    }

    #[test]
    fn root_is_reflexive() {
        assert!(paths_match("/", "/"));
        assert!(paths_match_with(r"\", "/", true));
    }

    #[test]
    fn root_contains_any_absolute_path() {
        assert!(paths_match("/", "/home/user/project"));
        assert!(paths_match("/home/user/project", "/"));
    }

    #[test]
    fn relative_paths_resolving_to_nothing_never_match() {
        assert!(!paths_match(".", "."));
        assert!(!paths_match("a/..", "/"));
    }

    #[test]
    fn empty_never_matches() {
        assert!(!paths_match("", "/home/user/project"));
        assert!(!paths_match("/home/user/project", ""));
        assert!(!paths_match("", ""));
    }

    #[test]
    fn trailing_separator_ignored() {
        assert!(paths_match("/a/b/", "/a/b"));
        assert!(paths_match("/a/b", "/a/b/"));
    }

    #[test]
    fn relative_segments_resolved() {
        assert!(paths_match("/a/b/../b/./c", "/a/b/c"));
    }

    #[test]
    fn separators_unified() {
        assert!(paths_match_with(r"C:\Users\dev\proj", "C:/Users/dev/proj", true));
    }

    #[test]
    fn case_handling_follows_convention() {
        assert!(paths_match_with("/A/B", "/a/b", true));
        assert!(!paths_match_with("/A/B", "/a/b", false));
    }

    #[test]
    fn containment_matches_both_directions() {
        assert!(paths_match("/home/user/project", "/home/user/project/src"));
        assert!(paths_match("/home/user/project/src", "/home/user/project"));
    }

    #[test]
    fn sibling_prefix_is_not_containment() {
        assert!(!paths_match("/project", "/project-backup/x"));
        assert!(!paths_match("/project-backup/x", "/project"));
    }
}
