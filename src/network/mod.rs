use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

use crate::prelude::*;
use crate::Server;

mod inboxes;
mod response;
pub mod client;
pub mod wire;

pub use inboxes::Inboxes;
pub use response::Response;

/// The client has to go: it hung up, errored, or broke the framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnection;

/// The admin console: a line-based TCP listener and its clients.
#[derive(Debug)]
pub struct Network {
    pub(super) listener: TcpListener,

    pub(super) poller: polling::Poller,
    pub(super) events: Vec<polling::Event>,

    pub(super) clients: SlotMap<client::Client>,
    /// Clients that failed outside of `process_until`, dropped on its next call
    pub(super) broken: Vec<Key>,
}

const LISTENER: usize = usize::MAX - 1;
impl Network {
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let poller = polling::Poller::new()?;

        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        poller.add(&listener, polling::Event::readable(LISTENER))?;
        Ok(Self {
            listener,

            poller,
            events: vec![],

            clients: SlotMap::new(),
            broken: vec![],
        })
    }
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
    pub fn connected(&self) -> usize {
        self.clients.len()
    }

    /// Handles console traffic until `deadline`.
    pub fn process_until(&mut self, deadline: time::Instant, server: &mut Server) -> io::Result<()> {
        for key in std::mem::take(&mut self.broken) {
            self.drop_client(key, server);
        }
        loop {
            let Some(timeout) = deadline.checked_duration_since(time::Instant::now()) else {
                return Ok(());
            };
            match self.poller.wait(&mut self.events, Some(timeout)) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
            while let Some(event) = self.events.pop() {
                if event.key == LISTENER {
                    self.poller.modify(&self.listener, polling::Event::readable(LISTENER))?;
                    self.accept_clients();
                    continue;
                }
                let Some(key) = self.clients.key_at(event.key) else {
                    log::trace!("event for departed client {}", event.key);
                    continue;
                };
                let Some(client) = self.clients.get_mut(key) else { continue };

                let mut result = Ok(());
                if event.readable {
                    result = client.read(server);
                }
                if result.is_ok() && (event.writable || client.waiting_for_write) {
                    result = client.write();
                }
                if result.is_ok() {
                    result = self.poller.modify(client.conn(), polling::Event {
                        key: event.key,
                        readable: true,
                        writable: client.waiting_for_write,
                    }).map_err(|e| {
                        log::warn!("could not rearm client {}: {e}", event.key);
                        Disconnection
                    });
                }
                if result.is_err() {
                    self.drop_client(key, server);
                }
            }
        }
    }
    fn accept_clients(&mut self) {
        loop {
            match self.listener.accept() {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::warn!("failed to accept console connection: {e}");
                    break;
                }
                Ok((conn, addr)) => {
                    let client = match client::Client::accept(conn) {
                        Ok(client) => client,
                        Err(e) => {
                            log::warn!("failed to set up console connection from {addr}: {e}");
                            continue;
                        }
                    };
                    let idx = self.clients.next_key().index();
                    if let Err(e) = self.poller.add(client.conn(), polling::Event::readable(idx)) {
                        log::warn!("failed to watch console connection from {addr}: {e}");
                        continue;
                    }
                    self.clients.insert(client);
                    log::debug!("console client {idx} connected from {addr}");
                },
            };
        }
    }
    fn drop_client(&mut self, key: Key, server: &mut Server) {
        if let Some(client) = self.clients.release(key) {
            log::debug!("console client {} disconnected", key.index());
            let _ = self.poller.delete(client.conn());
            if let Some(name) = client.actor() {
                server.disconnect(name);
            }
        }
    }
}
