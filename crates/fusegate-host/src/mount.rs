// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Mount descriptors as accepted by the admin API and stored in the mount table

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::manager::SessionError;

/// Who besides the mounting user may access the filesystem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AllowMode {
    #[default]
    Owner,
    Root,
    Other,
}

impl std::str::FromStr for AllowMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(AllowMode::Owner),
            "allow_root" => Ok(AllowMode::Root),
            "allow_other" => Ok(AllowMode::Other),
            other => Err(SessionError::InvalidAllowMode(other.to_string())),
        }
    }
}

/// One mount request. Field names match the persisted JSON format.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountArgs {
    #[serde(rename = "mountpoint")]
    pub mount_point: PathBuf,

    /// Backend base URL, e.g. `http://127.0.0.1:7777`
    pub target: String,

    /// Source name shown in the mount list
    #[serde(default)]
    pub fsname: String,

    /// Shown as `fuse.<subtype>` in the mount list
    #[serde(default)]
    pub subtype: String,

    /// Volume name; only macOS shows it
    #[serde(default)]
    pub name: String,

    /// `""`, `allow_root` or `allow_other`
    #[serde(default)]
    pub allow: String,

    /// Non-zero makes the mount read-only
    #[serde(default)]
    pub readonly: i32,
}

impl MountArgs {
    pub fn new(mount_point: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            mount_point: mount_point.into(),
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn allow_mode(&self) -> Result<AllowMode, SessionError> {
        self.allow.parse()
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly != 0
    }

    pub fn target_url(&self) -> Result<Url, SessionError> {
        Url::parse(&self.target).map_err(|err| SessionError::InvalidTarget {
            target: self.target.clone(),
            reason: err.to_string(),
        })
    }

    /// Reject descriptors that cannot be mounted before touching the kernel.
    pub fn validate(&self) -> Result<(), SessionError> {
        self.allow_mode()?;
        self.target_url()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_persisted_field_names() {
        let args: MountArgs = serde_json::from_str(
            r#"{"mountpoint":"/mnt/a","target":"http://127.0.0.1:7777","fsname":"qbs","allow":"allow_other","readonly":1}"#,
        )
        .unwrap();
        assert_eq!(args.mount_point, PathBuf::from("/mnt/a"));
        assert_eq!(args.fsname, "qbs");
        assert_eq!(args.allow_mode().unwrap(), AllowMode::Other);
        assert!(args.is_readonly());
        assert!(args.subtype.is_empty());

        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["mountpoint"], "/mnt/a");
    }

    #[test]
    fn rejects_unknown_allow_mode() {
        let mut args = MountArgs::new("/mnt/a", "http://127.0.0.1:7777");
        assert!(args.validate().is_ok());

        args.allow = "allow_everyone".into();
        assert!(matches!(
            args.validate(),
            Err(SessionError::InvalidAllowMode(mode)) if mode == "allow_everyone"
        ));
    }

    #[test]
    fn rejects_unparseable_target() {
        let args = MountArgs::new("/mnt/a", "not a url");
        assert!(matches!(
            args.validate(),
            Err(SessionError::InvalidTarget { .. })
        ));
    }
}
