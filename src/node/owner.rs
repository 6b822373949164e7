//! User and group names for the owner columns and sort keys.
//!
//! Each id is looked up at most once per [`Owners`]. Names come from the
//! system user database; an id without an entry is shown numerically.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::trace;

use crate::config::Constants;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Group,
}

impl Entity {
    pub fn key(self) -> &'static str {
        match self {
            Entity::User => "user",
            Entity::Group => "group",
        }
    }
}

/// The user or group owning a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub entity: Entity,
    pub id: u32,
    pub name: Option<String>,
    /// The user running `pls`, or a group that user belongs to.
    pub is_current: bool,
}

impl Owner {
    /// The name, falling back to the numeric id.
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    /// Style tokens from `constants.owner.<user|group>.<current|other>`.
    pub fn style<'c>(&self, constants: &'c Constants) -> Option<&'c str> {
        let which = if self.is_current { "current" } else { "other" };
        constants.lookup(&["owner", self.entity.key(), which])
    }
}

/// Memoized owner lookups.
pub struct Owners {
    db: Database,
    users: RefCell<HashMap<u32, Owner>>,
    groups: RefCell<HashMap<u32, Owner>>,
}

impl Default for Owners {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Owners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Owners")
            .field("users", &self.users.borrow().len())
            .field("groups", &self.groups.borrow().len())
            .finish()
    }
}

impl Owners {
    pub fn new() -> Self {
        Self {
            db: Database::new(),
            users: RefCell::new(HashMap::new()),
            groups: RefCell::new(HashMap::new()),
        }
    }

    pub fn user(&self, uid: u32) -> Owner {
        if let Some(owner) = self.users.borrow().get(&uid) {
            return owner.clone();
        }
        let owner = Owner {
            entity: Entity::User,
            id: uid,
            name: self.db.user_name(uid),
            is_current: self.db.is_current_user(uid),
        };
        trace!(uid, name = ?owner.name, "looked up user");
        self.users.borrow_mut().insert(uid, owner.clone());
        owner
    }

    pub fn group(&self, gid: u32) -> Owner {
        if let Some(owner) = self.groups.borrow().get(&gid) {
            return owner.clone();
        }
        let owner = Owner {
            entity: Entity::Group,
            id: gid,
            name: self.db.group_name(gid),
            is_current: self.db.is_current_group(gid),
        };
        trace!(gid, name = ?owner.name, "looked up group");
        self.groups.borrow_mut().insert(gid, owner.clone());
        owner
    }
}

#[cfg(unix)]
struct Database {
    cache: uzers::UsersCache,
    current_uid: u32,
    current_gid: u32,
    current_name: Option<std::ffi::OsString>,
}

#[cfg(unix)]
impl Database {
    fn new() -> Self {
        use uzers::{Groups, Users};

        let cache = uzers::UsersCache::new();
        let current_uid = cache.get_current_uid();
        let current_gid = cache.get_current_gid();
        let current_name = cache
            .get_user_by_uid(current_uid)
            .map(|user| user.name().to_os_string());
        Self {
            cache,
            current_uid,
            current_gid,
            current_name,
        }
    }

    fn user_name(&self, uid: u32) -> Option<String> {
        use uzers::Users;

        self.cache
            .get_user_by_uid(uid)
            .map(|user| user.name().to_string_lossy().into_owned())
    }

    fn group_name(&self, gid: u32) -> Option<String> {
        use uzers::Groups;

        self.cache
            .get_group_by_gid(gid)
            .map(|group| group.name().to_string_lossy().into_owned())
    }

    fn is_current_user(&self, uid: u32) -> bool {
        uid == self.current_uid
    }

    fn is_current_group(&self, gid: u32) -> bool {
        use uzers::os::unix::GroupExt;
        use uzers::Groups;

        if gid == self.current_gid {
            return true;
        }
        let (Some(name), Some(group)) = (&self.current_name, self.cache.get_group_by_gid(gid))
        else {
            return false;
        };
        group.members().iter().any(|member| member == name)
    }
}

#[cfg(not(unix))]
struct Database;

#[cfg(not(unix))]
impl Database {
    fn new() -> Self {
        Database
    }

    fn user_name(&self, _uid: u32) -> Option<String> {
        None
    }

    fn group_name(&self, _gid: u32) -> Option<String> {
        None
    }

    fn is_current_user(&self, _uid: u32) -> bool {
        false
    }

    fn is_current_group(&self, _gid: u32) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn label_falls_back_to_id() {
        let named = Owner {
            entity: Entity::User,
            id: 420,
            name: Some("user".into()),
            is_current: true,
        };
        assert_eq!(named.label(), "user");
        let nameless = Owner { name: None, ..named };
        assert_eq!(nameless.label(), "420");
    }

    #[test]
    fn style_depends_on_entity_and_current() {
        let constants = Config::built_in().unwrap().constants;
        let mut owner = Owner {
            entity: Entity::User,
            id: 1,
            name: None,
            is_current: true,
        };
        assert_eq!(owner.style(&constants), Some("blue bold"));
        owner.is_current = false;
        assert_eq!(owner.style(&constants), Some("dim"));
        owner.entity = Entity::Group;
        owner.is_current = true;
        assert_eq!(owner.style(&constants), Some("blue"));
    }

    #[cfg(unix)]
    #[test]
    fn current_user_is_marked_and_cached() {
        let owners = Owners::new();
        let uid = uzers::get_current_uid();
        let me = owners.user(uid);
        assert!(me.is_current);
        assert_eq!(me.id, uid);
        assert_eq!(owners.user(uid), me);
        assert_eq!(owners.users.borrow().len(), 1);

        assert!(owners.group(uzers::get_current_gid()).is_current);
    }

    #[cfg(unix)]
    #[test]
    fn root_has_a_name() {
        let owners = Owners::new();
        assert_eq!(owners.user(0).name.as_deref(), Some("root"));
        assert!(owners.user(u32::MAX - 7).name.is_none());
    }
}
