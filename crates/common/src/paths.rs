use std::path::PathBuf;

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(dirs) = directories::BaseDirs::new()
    {
        return dirs.home_dir().join(stripped);
    }
    PathBuf::from(path)
}

/// Per-user data directory that holds shared-storage containers when no
/// explicit root is configured.
pub fn default_data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "sharebridge").map(|d| d.data_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_tilde_paths_are_unchanged() {
        assert_eq!(expand_tilde("/var/tmp/x"), PathBuf::from("/var/tmp/x"));
        assert_eq!(expand_tilde("relative/y"), PathBuf::from("relative/y"));
    }

    #[test]
    fn tilde_expands_under_home() {
        let expanded = expand_tilde("~/containers");
        assert!(expanded.ends_with("containers"));
        if directories::BaseDirs::new().is_some() {
            assert!(!expanded.starts_with("~"));
        }
    }
}
