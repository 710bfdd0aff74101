//! Team roster.
//!
//! Keeps teams in creation order and enforces that a buzzer belongs to at
//! most one team.

use std::sync::atomic::{AtomicU64, Ordering};

use buzzhub_core::{Color, DeviceAddress};
use parking_lot::RwLock;
use tracing::info;

use crate::error::{RosterError, RosterResult};
use crate::team::{PointLimit, Team};

/// Partial update of one team. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TeamUpdate {
    pub primary_color: Option<Color>,
    pub secondary_color: Option<Color>,
    pub point: Option<u32>,
    pub addresses: Option<Vec<DeviceAddress>>,
}

/// All teams of the current game.
pub struct TeamRoster {
    teams: RwLock<Vec<Team>>,
    default_limit: PointLimit,
    next_id: AtomicU64,
}

impl TeamRoster {
    pub fn new(default_limit: PointLimit) -> Self {
        Self {
            teams: RwLock::new(Vec::new()),
            default_limit,
            next_id: AtomicU64::new(1),
        }
    }

    /// Snapshot of every team.
    pub fn list(&self) -> Vec<Team> {
        self.teams.read().clone()
    }

    pub fn get(&self, name: &str) -> Option<Team> {
        self.teams.read().iter().find(|t| t.name == name).cloned()
    }

    /// Look a team up by its stable id.
    pub fn get_by_id(&self, id: u64) -> Option<Team> {
        self.teams.read().iter().find(|t| t.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.teams.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.read().is_empty()
    }

    /// Team owning `address`, if any.
    pub fn team_for_address(&self, address: &DeviceAddress) -> Option<Team> {
        self.teams.read().iter().find(|t| t.owns(address)).cloned()
    }

    /// Point limit shared by every team.
    pub fn point_limit(&self) -> PointLimit {
        self.teams
            .read()
            .first()
            .map_or(self.default_limit, |t| t.point_limit)
    }

    /// Create a team with no buzzers. It inherits the current point limit.
    pub fn create(
        &self,
        name: &str,
        primary_color: Color,
        secondary_color: Color,
    ) -> RosterResult<Team> {
        if name.is_empty() {
            return Err(RosterError::EmptyName);
        }

        let mut teams = self.teams.write();
        if teams.iter().any(|t| t.name == name) {
            return Err(RosterError::TeamExists(name.to_string()));
        }

        let limit = teams.first().map_or(self.default_limit, |t| t.point_limit);
        let mut team = Team::new(name, primary_color, secondary_color, limit);
        team.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        teams.push(team.clone());
        info!("Team {} created", name);
        Ok(team)
    }

    pub fn delete(&self, name: &str) -> RosterResult<Team> {
        let mut teams = self.teams.write();
        let index = teams
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| RosterError::TeamNotFound(name.to_string()))?;
        info!("Team {} deleted", name);
        Ok(teams.remove(index))
    }

    pub fn rename(&self, old_name: &str, new_name: &str) -> RosterResult<()> {
        if new_name.is_empty() {
            return Err(RosterError::EmptyName);
        }

        let mut teams = self.teams.write();
        if !teams.iter().any(|t| t.name == old_name) {
            return Err(RosterError::TeamNotFound(old_name.to_string()));
        }
        if teams.iter().any(|t| t.name == new_name) {
            return Err(RosterError::TeamExists(new_name.to_string()));
        }

        if let Some(team) = teams.iter_mut().find(|t| t.name == old_name) {
            team.name = new_name.to_string();
        }
        info!("Team {} renamed to {}", old_name, new_name);
        Ok(())
    }

    /// Apply a partial update. Nothing changes if any field is rejected.
    ///
    /// New buzzer addresses must be in `connected` and must not belong to
    /// another team.
    pub fn update(
        &self,
        name: &str,
        update: TeamUpdate,
        connected: &[DeviceAddress],
    ) -> RosterResult<Team> {
        let mut teams = self.teams.write();
        let index = teams
            .iter()
            .position(|t| t.name == name)
            .ok_or_else(|| RosterError::TeamNotFound(name.to_string()))?;

        if let Some(addresses) = &update.addresses {
            for address in addresses {
                if let Some(owner) = teams.iter().find(|t| t.name != name && t.owns(address)) {
                    return Err(RosterError::AddressTaken {
                        address: *address,
                        team: owner.name.clone(),
                    });
                }
                if !connected.contains(address) {
                    return Err(RosterError::NotConnected(*address));
                }
            }
        }

        let limit = teams[index].point_limit.value();
        if let Some(point) = update.point {
            if point > limit {
                return Err(RosterError::InvalidPoint { point, limit });
            }
        }

        let team = &mut teams[index];
        if let Some(mut addresses) = update.addresses {
            addresses.sort();
            addresses.dedup();
            team.addresses = addresses;
        }
        if let Some(point) = update.point {
            team.point = point;
        }
        if let Some(color) = update.primary_color {
            team.primary_color = color;
        }
        if let Some(color) = update.secondary_color {
            team.secondary_color = color;
        }
        Ok(team.clone())
    }

    /// Add one point to a team, saturating at its limit.
    pub fn award_point(&self, name: &str) -> RosterResult<u32> {
        let mut teams = self.teams.write();
        let team = teams
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| RosterError::TeamNotFound(name.to_string()))?;
        Ok(team.award_point())
    }

    /// Add one point to the team with `id`. Returns the updated team, or
    /// `None` if it was deleted.
    pub fn award_point_by_id(&self, id: u64) -> Option<Team> {
        let mut teams = self.teams.write();
        let team = teams.iter_mut().find(|t| t.id == id)?;
        team.award_point();
        Some(team.clone())
    }

    /// Change the point limit of every team. Scores above the new limit are
    /// lowered to it.
    pub fn set_point_limit(&self, limit: u32) -> RosterResult<PointLimit> {
        let limit = PointLimit::try_from(limit)?;
        let mut teams = self.teams.write();
        for team in teams.iter_mut() {
            team.point_limit = limit;
            team.point = team.point.min(limit.value());
        }
        info!("Point limit set to {}", limit);
        Ok(limit)
    }

    /// Set every score back to zero.
    pub fn reset_points(&self) {
        for team in self.teams.write().iter_mut() {
            team.point = 0;
        }
        info!("All points reset");
    }
}

impl Default for TeamRoster {
    fn default() -> Self {
        Self::new(PointLimit::Eight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> DeviceAddress {
        DeviceAddress::new([0, 0, 0, 0, 0, last])
    }

    fn roster_with(names: &[&str]) -> TeamRoster {
        let roster = TeamRoster::default();
        for name in names {
            roster.create(name, Color::RED, Color::WHITE).unwrap();
        }
        roster
    }

    #[test]
    fn test_create_rejects_duplicates() {
        let roster = roster_with(&["RED"]);
        assert_eq!(
            roster.create("RED", Color::GREEN, Color::WHITE),
            Err(RosterError::TeamExists("RED".to_string()))
        );
        assert_eq!(roster.create("", Color::GREEN, Color::WHITE), Err(RosterError::EmptyName));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_new_teams_inherit_point_limit() {
        let roster = roster_with(&["RED"]);
        roster.set_point_limit(16).unwrap();
        let team = roster.create("BLUE", Color::GREEN, Color::WHITE).unwrap();
        assert_eq!(team.point_limit, PointLimit::Sixteen);
        assert_eq!(roster.point_limit(), PointLimit::Sixteen);
    }

    #[test]
    fn test_set_point_limit_validates_and_clamps() {
        let roster = roster_with(&["RED"]);
        roster
            .update(
                "RED",
                TeamUpdate {
                    point: Some(8),
                    ..Default::default()
                },
                &[],
            )
            .unwrap();

        assert_eq!(roster.set_point_limit(7), Err(RosterError::InvalidPointLimit(7)));
        roster.set_point_limit(5).unwrap();
        assert_eq!(roster.get("RED").unwrap().point, 5);
    }

    #[test]
    fn test_address_belongs_to_one_team() {
        let roster = roster_with(&["RED", "BLUE"]);
        let connected = [addr(1), addr(2)];

        let red = TeamUpdate {
            addresses: Some(vec![addr(1)]),
            ..Default::default()
        };
        roster.update("RED", red, &connected).unwrap();

        let blue = TeamUpdate {
            addresses: Some(vec![addr(2), addr(1)]),
            ..Default::default()
        };
        assert_eq!(
            roster.update("BLUE", blue, &connected),
            Err(RosterError::AddressTaken {
                address: addr(1),
                team: "RED".to_string()
            })
        );
        assert!(roster.get("BLUE").unwrap().addresses.is_empty());
        assert_eq!(roster.team_for_address(&addr(1)).unwrap().name, "RED");
        assert!(roster.team_for_address(&addr(3)).is_none());
    }

    #[test]
    fn test_update_requires_connected_buzzers() {
        let roster = roster_with(&["RED"]);
        let update = TeamUpdate {
            addresses: Some(vec![addr(9)]),
            ..Default::default()
        };
        assert_eq!(
            roster.update("RED", update, &[addr(1)]),
            Err(RosterError::NotConnected(addr(9)))
        );
    }

    #[test]
    fn test_update_rejects_point_above_limit() {
        let roster = roster_with(&["RED"]);
        let update = TeamUpdate {
            point: Some(9),
            primary_color: Some(Color::GREEN),
            ..Default::default()
        };
        assert_eq!(
            roster.update("RED", update, &[]),
            Err(RosterError::InvalidPoint { point: 9, limit: 8 })
        );
        assert_eq!(roster.get("RED").unwrap().primary_color, Color::RED);
    }

    #[test]
    fn test_rename_and_delete() {
        let roster = roster_with(&["RED", "BLUE"]);
        assert_eq!(
            roster.rename("RED", "BLUE"),
            Err(RosterError::TeamExists("BLUE".to_string()))
        );
        assert_eq!(
            roster.rename("GREEN", "TEAL"),
            Err(RosterError::TeamNotFound("GREEN".to_string()))
        );
        let id = roster.get("RED").unwrap().id;
        roster.rename("RED", "CRIMSON").unwrap();
        assert_eq!(roster.get_by_id(id).unwrap().name, "CRIMSON");

        roster.delete("CRIMSON").unwrap();
        assert!(roster.get_by_id(id).is_none());
        assert_eq!(roster.list().len(), 1);
        assert!(roster.delete("CRIMSON").is_err());
    }

    #[test]
    fn test_award_and_reset_points() {
        let roster = roster_with(&["RED"]);
        assert_eq!(roster.award_point("RED"), Ok(1));
        assert_eq!(roster.award_point("RED"), Ok(2));
        roster.reset_points();
        assert_eq!(roster.get("RED").unwrap().point, 0);
        assert!(roster.award_point("NOPE").is_err());
    }

    #[test]
    fn test_ids_are_unique_and_follow_the_team() {
        let roster = roster_with(&["RED", "BLUE"]);
        let red = roster.get("RED").unwrap().id;
        let blue = roster.get("BLUE").unwrap().id;
        assert_ne!(red, blue);

        roster.rename("RED", "CRIMSON").unwrap();
        let team = roster.award_point_by_id(red).unwrap();
        assert_eq!((team.name.as_str(), team.point), ("CRIMSON", 1));

        roster.delete("BLUE").unwrap();
        assert!(roster.award_point_by_id(blue).is_none());
    }
}
