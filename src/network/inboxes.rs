use super::*;

pub struct Inboxes<'a>(pub(super) &'a mut Network);

impl Network {
    /// Used by the server to push notices out to connected actors
    pub fn inboxes(&mut self) -> Inboxes<'_> {
        Inboxes(self)
    }
}

impl Inboxes<'_> {
    /// Queues `response` on every connection `name` is logged in on.
    /// Returns how many connections got it.
    pub fn notify(&mut self, name: Name, response: Response) -> usize {
        self.for_each(|_, mut inbox, actor| {
            if actor == Some(name) {
                inbox.submit(response.clone());
                1
            } else {
                0
            }
        })
    }
    fn for_each(&mut self, mut deliver: impl FnMut(usize, client::Inbox, Option<Name>) -> usize) -> usize {
        let network = &mut *self.0;
        let mut delivered = 0;
        for (key, client) in network.clients.iter_mut() {
            let was_waiting_for_write = client.waiting_for_write;
            let actor = client.actor();
            delivered += deliver(key.index(), client.inbox(), actor);
            if client.waiting_for_write && !was_waiting_for_write {
                if let Err(e) = network.poller.modify(client.conn(), polling::Event::all(key.index())) {
                    log::warn!("could not wake client {}: {e}", key.index());
                    network.broken.push(key);
                }
            }
        }
        delivered
    }
}
