//! User commands
//!
//! Numbered commands a player issues from the client. Each handler lists the
//! ids it serves; [`CommandHandlers`] routes an id to its handler.

pub mod party;
pub mod channel_leave;

use indexmap::IndexMap;

pub use channel_leave::ChannelLeave;
pub use party::{Broadcast, ChannelId, PartyId, PartyService, PlayerId, SystemMessage};

/// Client command id
pub type CommandId = u32;

/// World services a handler may touch while running
pub struct CommandContext<'a> {
    pub parties: &'a mut dyn PartyService,
    pub broadcast: &'a mut dyn Broadcast,
}

pub trait UserCommandHandler: Send + Sync {
    /// Ids this handler serves
    fn command_ids(&self) -> &[CommandId];

    /// Run the command for `actor`; false if it did not apply
    fn use_command(&self, id: CommandId, actor: PlayerId, ctx: &mut CommandContext<'_>) -> bool;
}

/// Command id to handler table
#[derive(Default)]
pub struct CommandHandlers {
    handlers: IndexMap<CommandId, Box<dyn UserCommandHandler>>,
}

impl CommandHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with every built-in handler registered
    pub fn with_defaults() -> Self {
        let mut handlers = Self::new();
        handlers.register(ChannelLeave);
        handlers
    }

    /// Register a handler under each of its ids. A later handler replaces an
    /// earlier one for a shared id.
    pub fn register<H: UserCommandHandler + Clone + 'static>(&mut self, handler: H) {
        for &id in handler.command_ids() {
            if self.handlers.contains_key(&id) {
                log::warn!("User command {} already has a handler, replacing it", id);
            }
            self.handlers.insert(id, Box::new(handler.clone()));
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn ids(&self) -> Vec<CommandId> {
        self.handlers.keys().copied().collect()
    }

    /// Run a command; false for unknown ids or when the handler declines
    pub fn dispatch(&self, id: CommandId, actor: PlayerId, ctx: &mut CommandContext<'_>) -> bool {
        match self.handlers.get(&id) {
            Some(handler) => handler.use_command(id, actor, ctx),
            None => {
                log::debug!("No handler for user command {}", id);
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Mailbox, World};
    use super::*;

    #[derive(Clone)]
    struct Echo;

    impl UserCommandHandler for Echo {
        fn command_ids(&self) -> &[CommandId] {
            &[1, 2]
        }

        fn use_command(&self, id: CommandId, _actor: PlayerId, _ctx: &mut CommandContext<'_>) -> bool {
            id == 1
        }
    }

    #[test]
    fn test_dispatch() {
        let mut handlers = CommandHandlers::with_defaults();
        handlers.register(Echo);
        assert_eq!(handlers.ids(), vec![96, 1, 2]);

        let mut parties = World::default();
        let mut broadcast = Mailbox::default();
        let mut ctx = CommandContext { parties: &mut parties, broadcast: &mut broadcast };

        assert!(handlers.dispatch(1, 7, &mut ctx));
        assert!(!handlers.dispatch(2, 7, &mut ctx));
        assert!(!handlers.dispatch(55, 7, &mut ctx));
        // Known id, but the actor has no party
        assert!(!handlers.dispatch(96, 7, &mut ctx));
    }
}
