use std::collections::VecDeque;
use std::io::{Read, Write};

use super::{wire, Disconnection, Response};
use crate::prelude::*;
use crate::Server;

#[derive(Debug)]
pub struct Inbox<'a>(&'a mut Client);
impl Inbox<'_> {
    pub fn submit(&mut self, response: Response) {
        self.0.queue.push_back(response);
        self.0.waiting_for_write = true;
    }
}

pub struct Client {
    conn: TcpStream,
    actor: Option<Name>,
    received: Vec<u8>,
    queue: VecDeque<Response>,
    pending_bytes: Vec<u8>,
    pending_byte_cursor: usize,

    pub(super) waiting_for_write: bool,
}
impl Client {
    pub fn accept(conn: TcpStream) -> io::Result<Self> {
        conn.set_nonblocking(true)?;
        Ok(Self {
            conn,
            actor: None,
            received: vec![],
            queue: Default::default(),
            pending_bytes: vec![],
            pending_byte_cursor: 0,
            waiting_for_write: false,
        })
    }
    pub(super) fn conn(&self) -> &TcpStream {
        &self.conn
    }
    pub(super) fn actor(&self) -> Option<Name> {
        self.actor
    }
    pub(super) fn inbox(&mut self) -> Inbox<'_> {
        Inbox(self)
    }
    /// Reads whatever arrived and runs each complete line as a command.
    pub fn read(&mut self, server: &mut Server) -> Result<(), Disconnection> {
        let mut scratch = [0; wire::MAX_LINE];
        loop {
            match self.conn.read(&mut scratch) {
                Ok(0) => return Err(Disconnection),
                Ok(n) => self.received.extend_from_slice(&scratch[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::debug!("read failed: {e}");
                    return Err(Disconnection);
                }
            }
        }
        let mut consumed = 0;
        while let Some((line, rem)) = wire::line(&self.received[consumed..]) {
            let text = String::from_utf8_lossy(line).into_owned();
            consumed = self.received.len() - rem.len();
            log::trace!("{:?} ran {text:?}", self.actor);
            match server.run_command(&mut self.actor, &text) {
                Ok(lines) => lines.into_iter().for_each(|l| self.inbox().submit(Response::Reply(l))),
                Err(refusal) => self.inbox().submit(Response::Refusal(refusal.to_string())),
            }
        }
        self.received.drain(..consumed);
        if self.received.len() >= wire::MAX_LINE {
            log::debug!("{:?} sent an overlong line", self.actor);
            return Err(Disconnection);
        }
        Ok(())
    }
    /// Sends as much as the socket takes. Leftovers wait for the next writable event.
    pub fn write(&mut self) -> Result<(), Disconnection> {
        if self.pending_byte_cursor == self.pending_bytes.len() {
            self.pending_bytes.clear();
            self.pending_byte_cursor = 0;
        }
        while let Some(response) = self.queue.pop_front() {
            response.write(&mut self.pending_bytes);
        }
        while self.pending_byte_cursor < self.pending_bytes.len() {
            match self.conn.write(&self.pending_bytes[self.pending_byte_cursor..]) {
                Ok(0) => return Err(Disconnection),
                Ok(n) => self.pending_byte_cursor += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.waiting_for_write = true;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::debug!("write failed: {e}");
                    return Err(Disconnection);
                }
            }
        }
        self.waiting_for_write = false;
        Ok(())
    }
}
impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields = f.debug_struct("Client");
        if let Ok(addr) = self.conn.peer_addr() {
            fields.field("conn", &addr);
        }
        fields.field("actor", &self.actor);
        fields.finish()
    }
}
