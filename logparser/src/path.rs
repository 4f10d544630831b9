//! Discovery and normalization of the repository-relative path reported by
//! an `RCS file:` line, mirroring `parse_rcs_file`/`init_paths`: the first
//! successfully parsed file fixes a `strip_path` prefix for the rest of the
//! stream, with a one-shot fallback search if that first guess turns out to
//! be wrong (symlinked CVS server roots can do this) and an `Attic/`
//! directory segment always dropped from the tail.

use std::path::PathBuf;

/// Stateful normalizer for one `cvs log`/`rlog` stream. Construct once per
/// invocation and feed it every `RCS file:` path in stream order.
#[derive(Debug, Clone)]
pub struct PathResolver {
    repository_path: String,
    strip_path: Option<String>,
}

impl PathResolver {
    /// `repository_path` is the repository module/subdirectory component to
    /// search for when the configured strip prefix doesn't match (an empty
    /// string disables the alternate search, matching the first file always
    /// fixing the prefix verbatim).
    pub fn new(repository_path: impl Into<String>) -> Self {
        Self {
            repository_path: repository_path.into(),
            strip_path: None,
        }
    }

    /// Resolves one `RCS file:` path (with its trailing `,v` still attached)
    /// to the repository-relative working path, or `None` if it can't be
    /// reconciled with the strip prefix at all (the file is skipped, with a
    /// warning already logged).
    pub fn resolve(&mut self, rcs_file_path: &str) -> Option<PathBuf> {
        let trimmed = strip_comma_v_suffix(rcs_file_path);

        if let Some(prefix) = self.strip_path.clone() {
            if let Some(rest) = trimmed.strip_prefix(prefix.as_str()) {
                return Some(strip_attic(rest));
            }

            if let Some(alt) = self.find_alternate(&trimmed) {
                log::info!("NOTICE: used alternate strip path {}", alt);
                let rest = trimmed.strip_prefix(alt.as_str()).unwrap_or(&trimmed);
                let resolved = strip_attic(rest);
                self.strip_path = Some(alt);
                return Some(resolved);
            }

            log::warn!(
                "file {} doesn't match strip path {}; ignoring",
                trimmed,
                prefix
            );
            None
        } else {
            let prefix = self
                .find_alternate(&trimmed)
                .unwrap_or_else(|| default_prefix(&trimmed));
            let rest = trimmed.strip_prefix(prefix.as_str()).unwrap_or(&trimmed);
            let resolved = strip_attic(rest);
            self.strip_path = Some(prefix);
            Some(resolved)
        }
    }

    /// Finds the final occurrence of the configured repository path
    /// component in `path` and returns everything up to and including it
    /// (plus one trailing separator) as a candidate strip prefix.
    fn find_alternate(&self, path: &str) -> Option<String> {
        if self.repository_path.is_empty() {
            return None;
        }
        let idx = path.rfind(self.repository_path.as_str())?;
        let end = idx + self.repository_path.len();
        Some(format!("{}/", &path[..end]))
    }
}

fn strip_comma_v_suffix(path: &str) -> String {
    path.strip_suffix(",v").unwrap_or(path).to_string()
}

/// The directory containing `path`, including a trailing separator, used
/// as the strip prefix when no repository component was configured at all.
fn default_prefix(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..=idx].to_string(),
        None => String::new(),
    }
}

fn strip_attic(rest: &str) -> PathBuf {
    let rest = rest.trim_start_matches('/');
    let path = PathBuf::from(rest);

    let mut components: Vec<_> = path.components().collect();
    if components.len() >= 2 {
        let attic_idx = components.len() - 2;
        if components[attic_idx].as_os_str() == "Attic" {
            components.remove(attic_idx);
            return components.iter().collect();
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_basic_with_repository_component() {
        let mut resolver = PathResolver::new("proj");
        let got = resolver
            .resolve("/home/cvsroot/proj/foo.c,v")
            .expect("should resolve");
        assert_eq!(got, PathBuf::from("foo.c"));
    }

    #[test]
    fn test_resolve_strips_attic() {
        let mut resolver = PathResolver::new("proj");
        let got = resolver
            .resolve("/home/cvsroot/proj/sub/Attic/foo.c,v")
            .expect("should resolve");
        assert_eq!(got, PathBuf::from("sub/foo.c"));
    }

    #[test]
    fn test_resolve_fixes_prefix_from_first_file() {
        let mut resolver = PathResolver::new("");
        let first = resolver.resolve("/home/cvsroot/proj/foo.c,v").unwrap();
        assert_eq!(first, PathBuf::from("foo.c"));

        let second = resolver.resolve("/home/cvsroot/proj/bar.c,v").unwrap();
        assert_eq!(second, PathBuf::from("bar.c"));
    }

    #[test]
    fn test_resolve_alternate_prefix_on_symlinked_server() {
        let mut resolver = PathResolver::new("proj");
        // First file establishes a strip prefix under /home/cvsroot/.
        resolver.resolve("/home/cvsroot/proj/foo.c,v").unwrap();

        // A later file arrives via a different, symlinked mount that still
        // contains the repository component further down the path.
        let got = resolver
            .resolve("/mnt/alt-root/cvsroot/proj/bar.c,v")
            .expect("alternate strip path should be found");
        assert_eq!(got, PathBuf::from("bar.c"));
    }

    #[test]
    fn test_resolve_gives_up_when_no_match() {
        let mut resolver = PathResolver::new("proj");
        resolver.resolve("/home/cvsroot/proj/foo.c,v").unwrap();

        assert!(resolver.resolve("/totally/unrelated/path/bar.c,v").is_none());
    }
}
