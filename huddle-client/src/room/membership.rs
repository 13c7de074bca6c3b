use huddle_core::ParticipantId;
use std::collections::HashSet;

/// Change between two membership views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDiff {
    pub joined: Vec<ParticipantId>,
    pub left: Vec<ParticipantId>,
}

impl MembershipDiff {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// This client's view of who is in the room, in server broadcast order.
#[derive(Debug, Clone, Default)]
pub struct RoomMembership {
    members: Vec<ParticipantId>,
}

impl RoomMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the view with a server snapshot and reports what changed.
    /// Repeated ids in `snapshot` keep their first position.
    pub fn apply_membership_update(&mut self, snapshot: &[ParticipantId]) -> MembershipDiff {
        let mut seen = HashSet::with_capacity(snapshot.len());
        let next: Vec<ParticipantId> = snapshot
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect();

        let previous: HashSet<&ParticipantId> = self.members.iter().collect();
        let joined = next
            .iter()
            .filter(|id| !previous.contains(id))
            .cloned()
            .collect();
        let left = self
            .members
            .iter()
            .filter(|id| !seen.contains(id))
            .cloned()
            .collect();

        self.members = next;
        MembershipDiff { joined, left }
    }

    /// Returns false if `id` was already a member.
    pub fn note_joined(&mut self, id: &ParticipantId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.members.push(id.clone());
        true
    }

    /// Returns false if `id` was not a member.
    pub fn note_left(&mut self, id: &ParticipantId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != id);
        self.members.len() != before
    }

    pub fn members(&self) -> &[ParticipantId] {
        &self.members
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.members.contains(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn display_names(&self, local: &ParticipantId) -> Vec<String> {
        self.members
            .iter()
            .map(|id| {
                if id == local {
                    "You".to_owned()
                } else {
                    format!("User {}", id.short())
                }
            })
            .collect()
    }
}
