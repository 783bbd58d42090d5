//! `/channelleave`: a party leader takes the party out of its command channel

use super::party::SystemMessage;
use super::{CommandContext, CommandId, PlayerId, UserCommandHandler};

static COMMAND_IDS: [CommandId; 1] = [96];

#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelLeave;

impl UserCommandHandler for ChannelLeave {
    fn command_ids(&self) -> &[CommandId] {
        &COMMAND_IDS
    }

    fn use_command(&self, id: CommandId, actor: PlayerId, ctx: &mut CommandContext<'_>) -> bool {
        if !COMMAND_IDS.contains(&id) {
            return false;
        }

        let Some(party) = ctx.parties.party_of(actor) else {
            return false;
        };
        if !ctx.parties.is_leader(party, actor) {
            return false;
        }
        let Some(channel) = ctx.parties.channel_of(party) else {
            return false;
        };

        let leader = ctx.parties.leader_name(party).unwrap_or_default();
        ctx.parties.remove_party(channel, party);
        ctx.broadcast.to_party(party, &SystemMessage::PartyLeftChannel);
        ctx.broadcast
            .to_channel(channel, &SystemMessage::OtherPartyLeftChannel { leader });
        log::debug!("Party {} left command channel {}", party, channel);
        true
    }
}
