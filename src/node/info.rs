use crate::Id;

use super::actor::Actor;

/// Information and statistics about a [crate::Node].
#[derive(Debug, Clone)]
pub struct Info {
    id: Id,
    routing_table_size: usize,
    stored_values: usize,
}

impl Info {
    /// This Node's [Id]
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Number of peers in this node's routing table.
    pub fn routing_table_size(&self) -> usize {
        self.routing_table_size
    }

    /// Number of values held in this node's local store.
    pub fn stored_values(&self) -> usize {
        self.stored_values
    }
}

impl From<&Actor> for Info {
    fn from(actor: &Actor) -> Self {
        Self {
            id: *actor.id(),
            routing_table_size: actor.routing_table().size(),
            stored_values: actor.stored_values(),
        }
    }
}
