//! Memoized user profiles and spooled avatar files.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::api::{ApiClient, ApiError, Group, UserProfile};

/// Id that resolves to the authenticated user.
pub const CURRENT_USER: i64 = -1;

/// Id of the synthetic group standing for private messages.
pub const PRIVATE_GROUP_ID: i64 = -1;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Failed to fetch {what} for user {id}: {source}")]
    Api {
        id: i64,
        what: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("No avatar data for user {0}")]
    NoAvatarData(i64),

    #[error("Failed to spool avatar for user {id}: {source}")]
    Spool {
        id: i64,
        #[source]
        source: io::Error,
    },
}

/// A resolved user: profile, avatar bytes and, for the current user only,
/// the groups the user is a member of.
#[derive(Debug)]
pub struct Identity {
    pub profile: UserProfile,
    pub avatar: Vec<u8>,
    /// `Some` only for the current user; ends with the private pseudo-group.
    pub groups: Option<Vec<Group>>,
}

impl Identity {
    pub fn id(&self) -> i64 {
        self.profile.id
    }

    /// Full name, falling back to the user name.
    pub fn display_name(&self) -> &str {
        if self.profile.full_name.is_empty() {
            &self.profile.name
        } else {
            &self.profile.full_name
        }
    }

    pub fn groups(&self) -> &[Group] {
        self.groups.as_deref().unwrap_or_default()
    }
}

/// Cache of identities by id. Entries are never evicted or refreshed.
pub struct IdentityDirectory {
    client: ApiClient,
    /// Where avatar files are spooled to.
    scratch_dir: PathBuf,
    cache: HashMap<i64, Arc<Identity>>,
    avatar_files: HashMap<i64, PathBuf>,
}

impl IdentityDirectory {
    pub fn new(client: ApiClient, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            scratch_dir: scratch_dir.into(),
            cache: HashMap::new(),
            avatar_files: HashMap::new(),
        }
    }

    /// Cached identity, without touching the network.
    pub fn cached(&self, id: i64) -> Option<Arc<Identity>> {
        self.cache.get(&id).cloned()
    }

    /// Resolve the authenticated user together with its groups.
    pub async fn current_user(&mut self) -> Result<Arc<Identity>, DirectoryError> {
        self.get_identity(CURRENT_USER).await
    }

    /// Resolve `id` to a full identity.
    ///
    /// Cached identities are returned without any request. Otherwise the
    /// profile and the avatar are fetched; an unreachable avatar fails the
    /// whole lookup. Groups are only resolved for [`CURRENT_USER`].
    pub async fn get_identity(&mut self, id: i64) -> Result<Arc<Identity>, DirectoryError> {
        if let Some(identity) = self.cache.get(&id) {
            return Ok(Arc::clone(identity));
        }

        let api_err =
            |what: &'static str| move |source: ApiError| DirectoryError::Api { id, what, source };

        let path = if id == CURRENT_USER {
            "users/current.json".to_string()
        } else {
            format!("users/{id}.json")
        };
        let request = self.client.get(&path, &[]).map_err(api_err("profile"))?;
        let profile: UserProfile = self
            .client
            .execute(request)
            .await
            .map_err(api_err("profile"))?;

        let avatar = self
            .client
            .fetch_binary(&profile.mugshot_url)
            .await
            .map_err(api_err("avatar"))?;

        let groups = if id == CURRENT_USER {
            let path = format!("groups/for_user/{}.json", profile.id);
            let request = self.client.get(&path, &[]).map_err(api_err("groups"))?;
            let mut groups: Vec<Group> = self
                .client
                .execute(request)
                .await
                .map_err(api_err("groups"))?;
            groups.push(private_group());
            Some(groups)
        } else {
            None
        };

        debug!(
            "resolved user {} ({}) with {} avatar bytes",
            profile.id,
            profile.full_name,
            avatar.len()
        );

        let identity = Arc::new(Identity {
            profile,
            avatar,
            groups,
        });
        self.cache.insert(id, Arc::clone(&identity));
        if id == CURRENT_USER {
            // later sender lookups use the numeric id
            self.cache.insert(identity.id(), Arc::clone(&identity));
        }

        Ok(identity)
    }

    /// Path of an image file holding the identity's avatar.
    ///
    /// A file spooled earlier is reused as long as it still exists.
    pub fn get_avatar_file(&mut self, identity: &Identity) -> Result<PathBuf, DirectoryError> {
        if let Some(path) = self.avatar_files.get(&identity.id())
            && path.exists()
        {
            return Ok(path.clone());
        }

        let path = self.spool_avatar(identity)?;
        self.avatar_files.insert(identity.id(), path.clone());
        Ok(path)
    }

    fn spool_avatar(&self, identity: &Identity) -> Result<PathBuf, DirectoryError> {
        let id = identity.id();
        if identity.avatar.is_empty() {
            return Err(DirectoryError::NoAvatarData(id));
        }
        let spool_err = |source: io::Error| DirectoryError::Spool { id, source };

        let prefix = format!("yammer-notify_{id}_");
        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".jpg")
            .tempfile_in(&self.scratch_dir)
            .map_err(spool_err)?;
        file.write_all(&identity.avatar).map_err(spool_err)?;

        let (_, path) = file.keep().map_err(|e| spool_err(e.error))?;
        debug!("spooled avatar of user {} to {}", id, path.display());
        Ok(path)
    }
}

fn private_group() -> Group {
    Group {
        id: PRIVATE_GROUP_ID,
        full_name: "Private".to_string(),
        ..Group::default()
    }
}
