//! Party and command channel boundary
//!
//! Parties and command channels are owned by the game world. Command handlers
//! only query membership, detach a party from its channel and send system
//! messages, so that is all these traits expose.

use std::fmt;

pub type PlayerId = u32;
pub type PartyId = u32;
pub type ChannelId = u32;

/// Membership queries and mutations on the party / channel model
pub trait PartyService {
    fn party_of(&self, player: PlayerId) -> Option<PartyId>;
    fn is_leader(&self, party: PartyId, player: PlayerId) -> bool;
    /// The command channel a party belongs to, if any
    fn channel_of(&self, party: PartyId) -> Option<ChannelId>;
    fn remove_party(&mut self, channel: ChannelId, party: PartyId);
    /// Display name of the party's first member
    fn leader_name(&self, party: PartyId) -> Option<String>;
}

/// Message delivery to every member of a group
pub trait Broadcast {
    fn to_party(&mut self, party: PartyId, message: &SystemMessage);
    fn to_channel(&mut self, channel: ChannelId, message: &SystemMessage);
}

/// System messages sent by user commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemMessage {
    PartyLeftChannel,
    OtherPartyLeftChannel { leader: String },
}

impl fmt::Display for SystemMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemMessage::PartyLeftChannel => write!(f, "Your party has left the CommandChannel."),
            SystemMessage::OtherPartyLeftChannel { leader } => {
                write!(f, "{}'s party has left the CommandChannel.", leader)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text() {
        assert_eq!(
            SystemMessage::PartyLeftChannel.to_string(),
            "Your party has left the CommandChannel."
        );
        let msg = SystemMessage::OtherPartyLeftChannel { leader: "Aria".to_string() };
        assert_eq!(msg.to_string(), "Aria's party has left the CommandChannel.");
    }
}
