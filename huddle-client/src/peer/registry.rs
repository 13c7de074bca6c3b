use crate::error::NegotiationError;
use crate::peer::link::PeerLink;
use huddle_core::ParticipantId;
use std::collections::HashMap;
use std::future::Future;

/// At most one link per remote participant.
#[derive(Default)]
pub struct PeerRegistry {
    links: HashMap<ParticipantId, PeerLink>,
    next_generation: u64,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the existing link for `peer`, or builds one with `create`.
    /// The flag tells whether the link is new. `create` receives the
    /// generation of the link it must build.
    pub async fn get_or_create<F, Fut>(
        &mut self,
        peer: &ParticipantId,
        create: F,
    ) -> Result<(&PeerLink, bool), NegotiationError>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = Result<PeerLink, NegotiationError>>,
    {
        if self.links.contains_key(peer) {
            return Ok((&self.links[peer], false));
        }

        self.next_generation += 1;
        let link = create(self.next_generation).await?;
        Ok((self.links.entry(peer.clone()).or_insert(link), true))
    }

    pub fn get(&self, peer: &ParticipantId) -> Option<&PeerLink> {
        self.links.get(peer)
    }

    pub fn contains(&self, peer: &ParticipantId) -> bool {
        self.links.contains_key(peer)
    }

    /// Shuts the link down and forgets it. Returns whether one existed.
    pub async fn remove(&mut self, peer: &ParticipantId) -> bool {
        match self.links.remove(peer) {
            Some(link) => {
                link.shutdown().await;
                true
            }
            None => false,
        }
    }

    pub fn for_each_link(&self, mut f: impl FnMut(&PeerLink)) {
        for link in self.links.values() {
            f(link);
        }
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        let mut ids: Vec<_> = self.links.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Shuts every link down. Returns the participants whose links were closed.
    pub async fn close_all(&mut self) -> Vec<ParticipantId> {
        let mut closed = Vec::with_capacity(self.links.len());
        for (peer, link) in self.links.drain() {
            link.shutdown().await;
            closed.push(peer);
        }
        closed.sort();
        closed
    }
}
