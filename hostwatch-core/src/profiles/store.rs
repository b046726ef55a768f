//! Durable registry of server profiles
//!
//! Profiles are kept in insertion order and rewritten wholesale to a JSON
//! file on every mutation. A mutation is only committed in memory after the
//! file write succeeded, so memory and disk never disagree.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{ProfileError, ProfileResult};
use crate::models::{ProfilePatch, SavedServerProfile};

/// Current on-disk format version
pub const PROFILE_STORE_VERSION: u32 = 1;

/// File name of the profile store inside the config directory
pub const PROFILE_STORE_FILENAME: &str = "server_profiles.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfileFile {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    profiles: Vec<SavedServerProfile>,
}

/// Registry of saved server profiles
#[derive(Debug)]
pub struct ProfileStore {
    /// Backing file; `None` keeps the store in memory only
    path: Option<PathBuf>,
    profiles: RwLock<Vec<SavedServerProfile>>,
    changes: watch::Sender<Vec<SavedServerProfile>>,
}

impl ProfileStore {
    /// Creates an empty store that never touches disk
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_profiles(None, Vec::new())
    }

    /// Loads the store from `path`.
    ///
    /// A missing or empty file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::Corrupt`] if the file exists but cannot be
    /// decoded, or [`ProfileError::Persistence`] if it cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> ProfileResult<Self> {
        let path = path.into();
        let _span = tracing::debug_span!(
            crate::tracing::span_names::PROFILES_LOAD,
            path = %path.display()
        )
        .entered();

        let profiles = read_profiles(&path)?;
        tracing::debug!(count = profiles.len(), "Loaded server profiles");
        Ok(Self::from_profiles(Some(path), profiles))
    }

    fn from_profiles(path: Option<PathBuf>, profiles: Vec<SavedServerProfile>) -> Self {
        let (changes, _) = watch::channel(profiles.clone());
        Self {
            path,
            profiles: RwLock::new(profiles),
            changes,
        }
    }

    /// Path of the backing file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Adds a profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::DuplicateId`] if the id is taken,
    /// [`ProfileError::Invalid`] if the profile fails validation, or
    /// [`ProfileError::Persistence`] if the store cannot be written.
    pub fn add(&self, profile: impl Into<SavedServerProfile>) -> ProfileResult<()> {
        let profile = profile.into();
        profile.profile.validate()?;

        self.mutate(|profiles| {
            if profiles.iter().any(|p| p.id() == profile.id()) {
                return Err(ProfileError::DuplicateId(profile.id().to_string()));
            }
            tracing::info!(profile_id = %profile.id(), name = %profile.name(), "Profile added");
            profiles.push(profile);
            Ok(())
        })
    }

    /// Applies `patch` to the profile with `id` and returns the result.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] if absent, [`ProfileError::Invalid`]
    /// if the patched profile fails validation, or
    /// [`ProfileError::Persistence`] if the store cannot be written.
    pub fn update(&self, id: &str, patch: ProfilePatch) -> ProfileResult<SavedServerProfile> {
        self.mutate(|profiles| {
            let entry = profiles
                .iter_mut()
                .find(|p| p.id() == id)
                .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
            patch.apply_to(entry);
            entry.profile.validate()?;
            tracing::debug!(profile_id = %id, "Profile updated");
            Ok(entry.clone())
        })
    }

    /// Removes the profile with `id` and returns it.
    ///
    /// Disconnecting a removed active profile is the caller's job; see
    /// `SessionFacade::remove_profile`.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileError::NotFound`] if absent or
    /// [`ProfileError::Persistence`] if the store cannot be written.
    pub fn remove(&self, id: &str) -> ProfileResult<SavedServerProfile> {
        self.mutate(|profiles| {
            let index = profiles
                .iter()
                .position(|p| p.id() == id)
                .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
            tracing::info!(profile_id = %id, "Profile removed");
            Ok(profiles.remove(index))
        })
    }

    /// All profiles in insertion order
    #[must_use]
    pub fn list(&self) -> Vec<SavedServerProfile> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Looks up one profile
    #[must_use]
    pub fn get(&self, id: &str) -> Option<SavedServerProfile> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id() == id)
            .cloned()
    }

    /// Profiles flagged `connect_on_startup`, in insertion order
    #[must_use]
    pub fn startup_candidates(&self) -> Vec<SavedServerProfile> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| p.connect_on_startup)
            .cloned()
            .collect()
    }

    /// Number of profiles
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if the store holds no profiles
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to the profile list; a new value is published after every
    /// committed mutation
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<SavedServerProfile>> {
        self.changes.subscribe()
    }

    /// Records a successful connect. Only the session manager calls this.
    pub(crate) fn mark_connected(&self, id: &str, at: DateTime<Utc>) -> ProfileResult<()> {
        self.mutate(|profiles| {
            let entry = profiles
                .iter_mut()
                .find(|p| p.id() == id)
                .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
            entry.last_connected = Some(at);
            Ok(())
        })
    }

    /// Runs `f` on a copy of the list, persists the copy, then commits it.
    fn mutate<T>(
        &self,
        f: impl FnOnce(&mut Vec<SavedServerProfile>) -> ProfileResult<T>,
    ) -> ProfileResult<T> {
        let mut guard = self
            .profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone();
        let out = f(&mut next)?;

        if let Some(ref path) = self.path {
            write_profiles(path, &next)?;
        }

        *guard = next;
        self.changes.send_replace(guard.clone());
        Ok(out)
    }
}

fn read_profiles(path: &Path) -> ProfileResult<Vec<SavedServerProfile>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ProfileError::Persistence(format!(
                "Failed to read '{}': {e}",
                path.display()
            )));
        }
    };

    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let file: ProfileFile = serde_json::from_str(&content)
        .map_err(|e| ProfileError::Corrupt(format!("'{}': {e}", path.display())))?;

    if file.version > PROFILE_STORE_VERSION {
        tracing::warn!(
            version = file.version,
            supported = PROFILE_STORE_VERSION,
            "Profile store was written by a newer version"
        );
    }

    // First occurrence of an id wins
    let mut profiles: Vec<SavedServerProfile> = Vec::with_capacity(file.profiles.len());
    for profile in file.profiles {
        if profiles.iter().any(|p| p.id() == profile.id()) {
            tracing::warn!(profile_id = %profile.id(), "Dropping duplicate profile id from store");
            continue;
        }
        profiles.push(profile);
    }
    Ok(profiles)
}

fn write_profiles(path: &Path, profiles: &[SavedServerProfile]) -> ProfileResult<()> {
    let _span = tracing::debug_span!(
        crate::tracing::span_names::PROFILES_SAVE,
        count = profiles.len()
    )
    .entered();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            ProfileError::Persistence(format!(
                "Failed to create directory '{}': {e}",
                parent.display()
            ))
        })?;
    }

    let file = ProfileFile {
        version: PROFILE_STORE_VERSION,
        profiles: profiles.to_vec(),
    };
    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| ProfileError::Persistence(format!("Failed to serialize profiles: {e}")))?;

    // Write-then-rename so a crash never leaves a truncated store behind
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| {
        ProfileError::Persistence(format!("Failed to write '{}': {e}", tmp.display()))
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        ProfileError::Persistence(format!("Failed to replace '{}': {e}", path.display()))
    })
}
