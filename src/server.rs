use std::collections::HashMap;

use crate::config::Config;
use crate::prelude::*;
use crate::session::Sessions;
use crate::timer::{Ticks, TickScheduler};
use crate::transfer::{JobEvent, JobHandle, TransferOptions};
use crate::world::{BlockId, Generator, World, Worlds};

/// A transfer and who asked for it.
pub(crate) struct RunningJob {
    pub(crate) owner: Name,
    pub(crate) handle: JobHandle,
}

/// Everything the console commands act on. Transfers run on `timer` with
/// the worlds as their copier.
pub struct Server {
    pub(crate) worlds: Worlds,
    pub(crate) timer: TickScheduler<Worlds>,
    pub(crate) sessions: Sessions,
    pub(crate) positions: HashMap<Name, (WorldId, BlockPos)>,
    /// Live connections per logged in actor
    connections: HashMap<Name, usize>,
    pub(crate) jobs: Vec<RunningJob>,
    pub(crate) options: TransferOptions,
    pub(crate) max_chunks: Option<u64>,
    pub(crate) tick_millis: u64,
}
impl Server {
    pub fn new(config: &Config) -> Self {
        let mut worlds = Worlds::new();
        for name in &config.worlds {
            worlds.add(World::new(name.as_str(), Generator::Flat { surface: BlockId::GRASS }));
        }
        Self::with_worlds(config, worlds)
    }
    pub fn with_worlds(config: &Config, worlds: Worlds) -> Self {
        Self {
            worlds,
            timer: TickScheduler::new(),
            sessions: Sessions::new(config.expiry_policy()),
            positions: HashMap::new(),
            connections: HashMap::new(),
            jobs: vec![],
            options: config.transfer_options(),
            max_chunks: config.max_chunks,
            tick_millis: config.tick_millis,
        }
    }
    pub fn worlds(&self) -> &Worlds {
        &self.worlds
    }
    pub fn worlds_mut(&mut self) -> &mut Worlds {
        &mut self.worlds
    }
    pub fn next_tick(&self) -> Ticks {
        self.timer.next_tick()
    }
    /// When the next tick should run, counting from `start`.
    pub fn next_tick_due(&self, start: time::Instant) -> time::Instant {
        tick_due(start, self.tick_millis, self.next_tick())
    }
    pub fn tick_until(&mut self, tickn: Ticks) {
        self.timer.tick_until(tickn, &mut self.worlds);
    }
    pub fn running_jobs(&self) -> usize {
        self.jobs.len()
    }
    /// Some connection logged in as `name`.
    pub fn connect(&mut self, name: Name) {
        *self.connections.entry(name).or_default() += 1;
    }
    /// Some connection stopped being `name`. The selection expiry policy
    /// only applies once the last one is gone.
    pub fn disconnect(&mut self, name: Name) {
        let Some(count) = self.connections.get_mut(&name) else {
            return;
        };
        *count -= 1;
        if *count > 0 {
            log::debug!("{name} dropped a connection, {count} left");
            return;
        }
        self.connections.remove(&name);
        log::debug!("{name} disconnected");
        self.sessions.disconnect(name);
    }
    pub fn is_online(&self, name: Name) -> bool {
        self.connections.contains_key(&name)
    }
    /// Turns pending job events into messages for their owners. Jobs are
    /// forgotten once they report completion or cancellation.
    pub fn notifications(&mut self) -> Vec<(Name, String)> {
        let mut out = vec![];
        let worlds = &self.worlds;
        self.jobs.retain(|job| {
            let source = worlds.get(job.handle.source()).map_or("?", World::name);
            let mut finished = false;
            for event in job.handle.events().try_iter() {
                let message = match event {
                    JobEvent::ItemFailed { item, error } => {
                        format!("Could not copy chunk {}: {error}", item.pos())
                    }
                    JobEvent::Completed { copied, failed: 0 } => {
                        finished = true;
                        format!("Transfer from {source} finished, {copied} chunks copied.")
                    }
                    JobEvent::Completed { copied, failed } => {
                        finished = true;
                        format!("Transfer from {source} finished, {copied} chunks copied and {failed} failed.")
                    }
                    JobEvent::Cancelled { remaining } => {
                        finished = true;
                        format!("Transfer from {source} cancelled, {remaining} chunks left untouched.")
                    }
                };
                out.push((job.owner, message));
            }
            !finished
        });
        out
    }
}

fn tick_due(start: time::Instant, tick_millis: u64, tick: Ticks) -> time::Instant {
    let since_start = time::Duration::from_millis(tick_millis.saturating_mul(tick));
    // only unreachable deadlines overflow; run as soon as possible instead
    start.checked_add(since_start).unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Corner;

    #[test]
    fn deadlines_do_not_overflow() {
        let start = time::Instant::now();
        assert_eq!(tick_due(start, 50, 3), start + time::Duration::from_millis(150));
        // past u32::MAX ticks nothing is truncated
        let tick = u32::MAX as u64 + 2;
        assert_eq!(tick_due(start, 1, tick), start + time::Duration::from_millis(tick));
        assert!(tick_due(start, 60_000, u64::MAX) >= start);
    }

    #[test]
    fn selections_expire_with_the_last_connection() {
        let config = Config { forget_selection_on_disconnect: true, ..Config::default() };
        let mut server = Server::new(&config);
        let dann = Name::new("dann").unwrap();
        server.connect(dann);
        server.connect(dann);
        server.sessions.select(dann, Corner::A, ChunkPos::new(0, 0));

        server.disconnect(dann);
        assert!(server.is_online(dann));
        assert!(server.sessions.region(dann).is_some());
        server.disconnect(dann);
        assert!(!server.is_online(dann));
        assert!(server.sessions.region(dann).is_none());
        // stray disconnects are ignored
        server.disconnect(dann);
    }
}
