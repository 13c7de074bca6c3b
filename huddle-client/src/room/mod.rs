mod membership;

pub use membership::{MembershipDiff, RoomMembership};
