//! Shared building blocks for appkeep: platform detection, directory
//! resolution for users and applications, content digests, and JSON
//! configuration files.

pub mod app_dirs;
pub mod error;
pub mod integrity;
pub mod json_file;
pub mod paths;
pub mod platform;
pub mod user_dirs;

pub use app_dirs::{AppDirs, AppDirsBuilder};
pub use error::{DirsError, JsonFileError};
pub use integrity::{DigestKind, IntegrityChecker, IntegrityError};
pub use json_file::{JsonFile, JsonMap};
pub use paths::{DirKind, DirectoryResolver, directory_for, resolver_for};
pub use platform::{Platform, PrivilegeMode, effective_mode, is_elevated};
pub use user_dirs::{UserDirs, UserDirsBuilder};
