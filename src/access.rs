//! Authorization boundary.
//!
//! Authentication and team membership live outside this crate. Operations only
//! ask yes/no capability questions about the calling [`Actor`].

use crate::error::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// The caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor {
    pub user_id: String,
}

impl Actor {
    /// An actor identified by user id.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
pub trait AccessControl: Send + Sync {
    async fn is_system_admin(&self, actor: &Actor) -> bool;
    async fn is_team_admin(&self, actor: &Actor, team_id: &str) -> bool;
    async fn is_team_member(&self, actor: &Actor, team_id: &str) -> bool;
}

/// Grants every capability. Used by the operator CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedOperator;

#[async_trait]
impl AccessControl for TrustedOperator {
    async fn is_system_admin(&self, _actor: &Actor) -> bool {
        true
    }

    async fn is_team_admin(&self, _actor: &Actor, _team_id: &str) -> bool {
        true
    }

    async fn is_team_member(&self, _actor: &Actor, _team_id: &str) -> bool {
        true
    }
}

/// Fixed capability table. Team admins are implicitly members.
#[derive(Debug, Clone, Default)]
pub struct StaticAccess {
    system_admins: HashSet<String>,
    team_admins: HashSet<(String, String)>,
    team_members: HashSet<(String, String)>,
}

impl StaticAccess {
    /// An empty table that grants nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant system admin to `user_id`.
    pub fn system_admin(mut self, user_id: &str) -> Self {
        self.system_admins.insert(user_id.to_string());
        self
    }

    /// Make `user_id` an admin of `team_id`.
    pub fn team_admin(mut self, user_id: &str, team_id: &str) -> Self {
        self.team_admins
            .insert((user_id.to_string(), team_id.to_string()));
        self
    }

    /// Make `user_id` a member of `team_id`.
    pub fn team_member(mut self, user_id: &str, team_id: &str) -> Self {
        self.team_members
            .insert((user_id.to_string(), team_id.to_string()));
        self
    }

    fn key(actor: &Actor, team_id: &str) -> (String, String) {
        (actor.user_id.clone(), team_id.to_string())
    }
}

#[async_trait]
impl AccessControl for StaticAccess {
    async fn is_system_admin(&self, actor: &Actor) -> bool {
        self.system_admins.contains(&actor.user_id)
    }

    async fn is_team_admin(&self, actor: &Actor, team_id: &str) -> bool {
        self.team_admins.contains(&Self::key(actor, team_id))
    }

    async fn is_team_member(&self, actor: &Actor, team_id: &str) -> bool {
        let key = Self::key(actor, team_id);
        self.team_members.contains(&key) || self.team_admins.contains(&key)
    }
}

/// Display names for teams, used by reporting views.
#[async_trait]
pub trait TeamDirectory: Send + Sync {
    async fn team_name(&self, team_id: &str) -> Result<Option<String>>;
}

#[async_trait]
impl TeamDirectory for HashMap<String, String> {
    async fn team_name(&self, team_id: &str) -> Result<Option<String>> {
        Ok(self.get(team_id).cloned())
    }
}
