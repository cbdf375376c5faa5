use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Where the game log goes. The terminal belongs to the UI, so logs are
    /// written to a file instead.
    pub fn log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("taboo.log"))
    }

    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("taboo"),
            )
        } else {
            ProjectDirs::from("", "", "taboo")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_ends_with_file_name() {
        if let Some(path) = AppDirs::log_path() {
            assert!(path.ends_with("taboo/taboo.log"));
        }
    }
}
