use std::fmt;
use std::fs::DirBuilder;

use camino::{Utf8Path, Utf8PathBuf};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::defaults::DEFAULT_SOCKET_PERMISSIONS;

/// Unix permission bits applied to the listening socket after it is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketPermissions(u32);

impl SocketPermissions {
    /// Wraps raw permission bits, rejecting anything outside `0o777`.
    pub const fn new(mode: u32) -> Result<Self, SocketPermissionsError> {
        if mode > 0o777 {
            return Err(SocketPermissionsError::OutOfRange { mode });
        }
        Ok(Self(mode))
    }

    /// Returns the permission bits.
    #[must_use]
    pub const fn mode(self) -> u32 {
        self.0
    }

    /// Parses an octal string such as `"0o660"`, `"0660"` or `"660"`.
    pub fn parse_octal(text: &str) -> Result<Self, SocketPermissionsError> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0o")
            .or_else(|| trimmed.strip_prefix("0O"))
            .unwrap_or(trimmed);
        let mode =
            u32::from_str_radix(digits, 8).map_err(|_| SocketPermissionsError::NotOctal {
                text: trimmed.to_owned(),
            })?;
        Self::new(mode)
    }
}

impl Default for SocketPermissions {
    fn default() -> Self {
        Self(DEFAULT_SOCKET_PERMISSIONS)
    }
}

impl fmt::Display for SocketPermissions {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:#o}", self.0)
    }
}

impl<'de> Deserialize<'de> for SocketPermissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PermissionsVisitor;

        impl Visitor<'_> for PermissionsVisitor {
            type Value = SocketPermissions;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an integer mode or an octal string such as \"0o666\"")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Self::Value, E> {
                let mode = u32::try_from(value).map_err(E::custom)?;
                SocketPermissions::new(mode).map_err(E::custom)
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Self::Value, E> {
                let mode = u32::try_from(value).map_err(E::custom)?;
                SocketPermissions::new(mode).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Self::Value, E> {
                SocketPermissions::parse_octal(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(PermissionsVisitor)
    }
}

/// Errors raised while interpreting `socket_permissions`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SocketPermissionsError {
    /// The mode carries bits beyond the permission triplets.
    #[error("socket permissions {mode:#o} exceed 0o777")]
    OutOfRange {
        /// Mode that was supplied.
        mode: u32,
    },
    /// The string form is not an octal number.
    #[error("socket permissions '{text}' are not an octal number")]
    NotOctal {
        /// Text that failed to parse.
        text: String,
    },
}

/// Location and access mode of the daemon's Unix domain socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketSettings {
    path: Utf8PathBuf,
    permissions: SocketPermissions,
}

impl SocketSettings {
    /// Builds socket settings from a path and permission bits.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, permissions: SocketPermissions) -> Self {
        Self {
            path: path.into(),
            permissions,
        }
    }

    /// Returns the socket path.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the permission bits applied after binding.
    #[must_use]
    pub const fn permissions(&self) -> SocketPermissions {
        self.permissions
    }

    /// Ensures the socket's parent directory exists.
    ///
    /// Missing directories are created with mode `0o755` so that clients
    /// granted access through `socket_permissions` can traverse them.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(parent) = self.path.parent().filter(|dir| !dir.as_str().is_empty()) else {
            return Err(SocketPreparationError::MissingParent {
                path: self.path.clone(),
            });
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }

        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(SocketPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

impl fmt::Display for SocketSettings {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "unix://{}", self.path)
    }
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// Parent directory is missing when creating a Unix socket path.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent {
        /// Socket path lacking a parent.
        path: Utf8PathBuf,
    },
    /// Failed to create the socket directory.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}
