use codegraph_core::IngestionConfig;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Walks `root` depth-first, honoring `.gitignore`-style exclusion and
/// the configured `exclude_patterns` and `max_depth` (§4.F). Hidden
/// directories (`.git`, etc.) are skipped by `ignore`'s defaults.
pub fn discover_files(root: &Path, config: &IngestionConfig) -> Vec<PathBuf> {
    let globs = build_globset(&config.exclude_patterns);

    WalkBuilder::new(root)
        .max_depth(Some(config.max_depth))
        .hidden(false)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .map(|entry| entry.into_path())
        .filter(|path| match &globs {
            Some(set) => !set.is_match(path),
            None => true,
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> Option<ignore::gitignore::Gitignore> {
    if patterns.is_empty() {
        return None;
    }
    let mut builder = ignore::gitignore::GitignoreBuilder::new("/");
    for pattern in patterns {
        let _ = builder.add_line(None, pattern);
    }
    builder.build().ok()
}

trait GitignoreExt {
    fn is_match(&self, path: &Path) -> bool;
}

impl GitignoreExt for ignore::gitignore::Gitignore {
    fn is_match(&self, path: &Path) -> bool {
        self.matched(path, path.is_dir()).is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn discovers_nested_source_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/nested")).unwrap();
        fs::write(dir.path().join("src/lib.rs"), "fn f() {}").unwrap();
        fs::write(dir.path().join("src/nested/mod.rs"), "fn g() {}").unwrap();

        let config = IngestionConfig::default();
        let files = discover_files(dir.path(), &config);
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn exclude_patterns_filter_matches() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/x.rs"), "fn f() {}").unwrap();
        fs::write(dir.path().join("main.rs"), "fn f() {}").unwrap();

        let mut config = IngestionConfig::default();
        config.exclude_patterns = vec!["vendor/".to_string()];
        let files = discover_files(dir.path(), &config);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.rs"));
    }
}
