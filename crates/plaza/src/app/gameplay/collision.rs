use std::collections::{BTreeSet, HashMap};

use engine::{EntityId, PhysicsWorld, Vec2};
use tracing::debug;

use super::actor::Actor;
use super::wander::WanderAi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContactKind {
    PlayerCritter,
    CritterCritter,
}

/// One overlapping pair this tick. `axis` is the unit vector from `a` toward `b`
/// measured before separation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Contact {
    pub(crate) kind: ContactKind,
    pub(crate) a: EntityId,
    pub(crate) b: EntityId,
    pub(crate) axis: Vec2,
}

/// Collider registry. Static membership means "blocked by solid tiles";
/// pairs are stored in ascending id order so each is checked once per tick.
#[derive(Debug, Default)]
pub(crate) struct CollisionBroker {
    static_members: BTreeSet<EntityId>,
    pairs: BTreeSet<(EntityId, EntityId)>,
}

impl CollisionBroker {
    pub(crate) fn wire_static(&mut self, id: EntityId) -> bool {
        self.static_members.insert(id)
    }

    pub(crate) fn wire_pair(&mut self, a: EntityId, b: EntityId) -> bool {
        if a == b {
            return false;
        }
        self.pairs.insert((a.min(b), a.max(b)))
    }

    pub(crate) fn collides_with_static(&self, id: EntityId) -> bool {
        self.static_members.contains(&id)
    }

    #[cfg(test)]
    pub(crate) fn is_paired(&self, a: EntityId, b: EntityId) -> bool {
        self.pairs.contains(&(a.min(b), a.max(b)))
    }

    pub(crate) fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub(crate) fn forget(&mut self, id: EntityId) {
        self.static_members.remove(&id);
        self.pairs.retain(|(a, b)| *a != id && *b != id);
    }

    pub(crate) fn clear(&mut self) {
        self.static_members.clear();
        self.pairs.clear();
    }

    /// Separates every wired pair that overlaps and reports it.
    pub(crate) fn detect(
        &self,
        physics: &mut dyn PhysicsWorld,
        player: &mut Actor,
        critters: &mut [WanderAi],
    ) -> Vec<Contact> {
        let slots: HashMap<EntityId, usize> = critters
            .iter()
            .enumerate()
            .map(|(slot, critter)| (critter.actor().id(), slot))
            .collect();
        let player_id = player.id();
        let mut contacts = Vec::new();

        for &(a, b) in &self.pairs {
            let contact = if a == player_id || b == player_id {
                let other = if a == player_id { b } else { a };
                let Some(&slot) = slots.get(&other) else {
                    continue;
                };
                touch(
                    physics,
                    player,
                    critters[slot].actor_mut(),
                    ContactKind::PlayerCritter,
                )
            } else {
                let (Some(&first), Some(&second)) = (slots.get(&a), slots.get(&b)) else {
                    continue;
                };
                let Some((first, second)) = pair_mut(critters, first, second) else {
                    continue;
                };
                touch(
                    physics,
                    first.actor_mut(),
                    second.actor_mut(),
                    ContactKind::CritterCritter,
                )
            };
            if let Some(contact) = contact {
                debug!(a = contact.a.0, b = contact.b.0, kind = ?contact.kind, "contact");
                contacts.push(contact);
            }
        }
        contacts
    }
}

fn touch(
    physics: &mut dyn PhysicsWorld,
    a: &mut Actor,
    b: &mut Actor,
    kind: ContactKind,
) -> Option<Contact> {
    let axis = (b.position() - a.position())
        .normalized()
        .unwrap_or(Vec2::new(1.0, 0.0));
    if !physics.separate(a.body_mut(), b.body_mut()) {
        return None;
    }
    Some(Contact {
        kind,
        a: a.id(),
        b: b.id(),
        axis,
    })
}

fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> Option<(&mut T, &mut T)> {
    if i == j || i >= items.len() || j >= items.len() {
        return None;
    }
    if i < j {
        let (head, tail) = items.split_at_mut(j);
        Some((&mut head[i], &mut tail[0]))
    } else {
        let (head, tail) = items.split_at_mut(i);
        Some((&mut tail[0], &mut head[j]))
    }
}
