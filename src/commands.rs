//! The console verbs. Every precondition is checked here, so the transfer
//! machinery only ever sees a complete region and two real worlds.
use crate::error::CommandError;
use crate::prelude::*;
use crate::region::{Corner, MAX_REGION_CHUNKS};
use crate::server::{RunningJob, Server};
use crate::transfer::start_transfer;
use crate::world::World;

const USAGE_LOGIN: &str = "login [name]";
const USAGE_GOTO: &str = "goto [world] [x] [y] [z]";
const USAGE_SELECT: &str = "select [a/b], where 'a' and 'b' are the two corners of the region";
const USAGE_TRANSFER: &str = "transferfrom [sourceWorld]";

const HELP: &[&str] = &[
    USAGE_LOGIN,
    USAGE_GOTO,
    USAGE_SELECT,
    USAGE_TRANSFER,
    "cancel - stop your running transfers",
    "jobs - list your running transfers",
    "worlds - list the worlds",
];

impl Server {
    /// Runs one console line for whoever is logged in on that connection.
    pub fn run_command(&mut self, actor: &mut Option<Name>, line: &str) -> Result<Vec<String>, CommandError> {
        let mut args = line.split_whitespace();
        let Some(verb) = args.next() else {
            return Ok(vec![]);
        };
        let args: Vec<&str> = args.collect();
        let verb = verb.to_ascii_lowercase();
        match verb.as_str() {
            "help" => Ok(HELP.iter().map(|s| s.to_string()).collect()),
            "login" => self.login(actor, &args),
            "worlds" => Ok(vec![format!("Worlds: {}", self.worlds.names().collect::<Vec<_>>().join(", "))]),
            "goto" => self.goto(actor.ok_or(CommandError::NotLoggedIn)?, &args),
            "select" => self.select(actor.ok_or(CommandError::NotLoggedIn)?, &args),
            "transferfrom" => self.transfer_from(actor.ok_or(CommandError::NotLoggedIn)?, &args),
            "cancel" => self.cancel(actor.ok_or(CommandError::NotLoggedIn)?),
            "jobs" => Ok(self.list_jobs(actor.ok_or(CommandError::NotLoggedIn)?)),
            _ => Err(CommandError::UnknownCommand(verb)),
        }
    }
    fn login(&mut self, actor: &mut Option<Name>, args: &[&str]) -> Result<Vec<String>, CommandError> {
        let [name] = args else {
            return Err(CommandError::Usage(USAGE_LOGIN));
        };
        let name = Name::new(name).ok_or(CommandError::BadName)?;
        match actor.replace(name) {
            Some(previous) if previous == name => {}
            Some(previous) => {
                self.disconnect(previous);
                self.connect(name);
            }
            None => self.connect(name),
        }
        log::info!("{name} logged in");
        Ok(vec![format!("Logged in as {name}.")])
    }
    fn goto(&mut self, name: Name, args: &[&str]) -> Result<Vec<String>, CommandError> {
        let [world, x, y, z] = args else {
            return Err(CommandError::Usage(USAGE_GOTO));
        };
        let id = self.worlds.id(world).ok_or_else(|| CommandError::UnknownWorld(world.to_string()))?;
        let coord = |s: &str| s.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or(CommandError::Usage(USAGE_GOTO));
        let pos = BlockPos { x: coord(*x)?, y: coord(*y)?, z: coord(*z)? };
        self.positions.insert(name, (id, pos));
        let world = self.worlds.get(id).map_or("?", World::name);
        Ok(vec![format!("Moved to {} {} {} in {world}, chunk {}.", pos.x, pos.y, pos.z, pos.chunk())])
    }
    fn select(&mut self, name: Name, args: &[&str]) -> Result<Vec<String>, CommandError> {
        let corner = match args {
            [c] if c.eq_ignore_ascii_case("a") => Corner::A,
            [c] if c.eq_ignore_ascii_case("b") => Corner::B,
            _ => return Err(CommandError::Usage(USAGE_SELECT)),
        };
        let (_, pos) = self.positions.get(&name).ok_or(CommandError::NoPosition)?;
        let chunk = pos.chunk();
        self.sessions.select(name, corner, chunk);
        let letter = match corner {
            Corner::A => 'a',
            Corner::B => 'b',
        };
        Ok(vec![format!("Point '{letter}' was set here, chunk {chunk}.")])
    }
    fn transfer_from(&mut self, name: Name, args: &[&str]) -> Result<Vec<String>, CommandError> {
        let region = self.sessions.region(name).ok_or(CommandError::NoSelection)?;
        let (Some(a), Some(b)) = (region.a, region.b) else {
            return Err(CommandError::IncompleteSelection);
        };
        let Some(source_name) = args.first() else {
            return Err(CommandError::Usage(USAGE_TRANSFER));
        };
        let source = self.worlds.id(source_name).ok_or_else(|| CommandError::UnknownWorld(source_name.to_string()))?;
        let (destination, _) = *self.positions.get(&name).ok_or(CommandError::NoPosition)?;
        let chunks = region.bounds().and_then(|bounds| bounds.chunk_count());
        let limit = self.max_chunks.map_or(MAX_REGION_CHUNKS, |limit| limit.min(MAX_REGION_CHUNKS));
        let chunks = match chunks {
            Some(chunks) if chunks <= limit => chunks,
            _ => return Err(CommandError::RegionTooLarge { chunks, limit }),
        };

        let handle = start_transfer(&mut self.timer, source, destination, a, b, self.options);
        self.jobs.push(RunningJob { owner: name, handle });
        let seconds = self.options.interval.saturating_mul(self.tick_millis) as f64 / 1000.0;
        Ok(vec![format!("Started region transfer of {chunks} chunks. This will take ~{seconds} seconds per chunk.")])
    }
    fn cancel(&mut self, name: Name) -> Result<Vec<String>, CommandError> {
        let cancelled = self.jobs.iter()
            .filter(|job| job.owner == name)
            .filter(|job| job.handle.cancel())
            .count();
        if cancelled == 0 {
            return Err(CommandError::NothingToCancel);
        }
        Ok(vec![format!("Cancelled {cancelled} transfer(s).")])
    }
    fn list_jobs(&self, name: Name) -> Vec<String> {
        let world = |id| self.worlds.get(id).map_or("?", World::name);
        let lines: Vec<_> = self.jobs.iter()
            .filter(|job| job.owner == name)
            .map(|job| {
                let bounds = job.handle.bounds();
                let (done, total) = job.handle.progress();
                format!(
                    "{} -> {}: ({}, {}) to ({}, {}), {done}/{total}, {:?}",
                    world(job.handle.source()),
                    world(job.handle.destination()),
                    bounds.min_x, bounds.min_z, bounds.max_x, bounds.max_z,
                    job.handle.state(),
                )
            })
            .collect();
        if lines.is_empty() {
            vec!["You have no running transfers.".to_string()]
        } else {
            lines
        }
    }
}
