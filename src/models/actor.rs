//! The user acting on a match, as seen by the access policy.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a user.
pub type UserId = Uuid;

/// Unique identifier for a team.
pub type TeamId = Uuid;

/// Site-wide role granted to a user.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Referee,
    Caster,
}

/// An authenticated user with their roles and the teams they lead.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Teams in which this user holds the leader rank.
    #[serde(default)]
    pub leads: Vec<TeamId>,
}

impl Actor {
    /// A user with no roles and no led teams.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            roles: Vec::new(),
            leads: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
        self
    }

    pub fn leading(mut self, team: TeamId) -> Self {
        self.leads.push(team);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    pub fn is_leader_of(&self, team: TeamId) -> bool {
        self.leads.contains(&team)
    }
}
