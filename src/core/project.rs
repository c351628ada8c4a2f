//! Project discovery and structure

use std::path::{Path, PathBuf};
use miette::Diagnostic;
use thiserror::Error;

/// Name of the project marker directory
const FORGE_DIR: &str = ".forge";

/// Database file inside the marker directory
const DATABASE_FILE: &str = "forge.db";

/// Represents a Forge project
#[derive(Debug, Clone)]
pub struct Project {
    /// Root directory of the project (parent of .forge/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir()?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start.canonicalize()?;

        loop {
            if current.join(FORGE_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Use an explicit project root if given, otherwise discover one
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ProjectError> {
        match explicit {
            Some(path) => Self::discover_from(path),
            None => Self::discover(),
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(FORGE_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::write_structure(root)
    }

    /// Force initialization even if .forge/ exists
    ///
    /// The existing database is removed so the project starts empty.
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let db = root.join(FORGE_DIR).join(DATABASE_FILE);
        for file in [db.clone(), db.with_extension("db-wal"), db.with_extension("db-shm")] {
            if file.exists() {
                std::fs::remove_file(&file)?;
            }
        }

        Self::write_structure(root)
    }

    fn write_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let forge_dir = root.join(FORGE_DIR);
        std::fs::create_dir_all(&forge_dir)?;

        std::fs::write(forge_dir.join("config.yaml"), Self::default_config())?;

        // Keep the database out of version control
        std::fs::write(forge_dir.join(".gitignore"), "forge.db*\n")?;

        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Forge Project Configuration

# Company code used when --company is not given
# company: ""

# Unit of measure for new BOM lines when --unit is omitted
# default_unit: pcs

# Maximum BOM depth followed by explode/tree/cost
# max_depth: 64

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .forge configuration directory
    pub fn forge_dir(&self) -> PathBuf {
        self.root.join(FORGE_DIR)
    }

    /// Path to the project database
    pub fn database_path(&self) -> PathBuf {
        self.forge_dir().join(DATABASE_FILE)
    }

    /// Path to the project configuration file
    pub fn config_path(&self) -> PathBuf {
        self.forge_dir().join("config.yaml")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    #[error("not a Forge project (searched from {searched_from:?})")]
    #[diagnostic(
        code(forge::project::not_found),
        help("run 'forge init' to create one, or pass --project PATH")
    )]
    NotFound { searched_from: PathBuf },

    #[error("Forge project already exists at {0:?}")]
    #[diagnostic(code(forge::project::exists))]
    AlreadyExists(PathBuf),

    #[error("project I/O error: {0}")]
    #[diagnostic(code(forge::project::io))]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.forge_dir().is_dir());
        assert!(project.config_path().exists());
        assert!(project.forge_dir().join(".gitignore").exists());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
    }

    #[test]
    fn test_project_init_force_removes_database() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(project.database_path(), b"stale").unwrap();

        let project = Project::init_force(tmp.path()).unwrap();
        assert!(!project.database_path().exists());
    }

    #[test]
    fn test_project_discover_finds_forge_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_forge_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }
}
