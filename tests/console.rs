use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use chunkferry::network::Response;
use chunkferry::types::Name;
use chunkferry::world::BlockId;
use chunkferry::{Config, Network, Server};

struct Harness {
    server: Server,
    network: Network,
}
impl Harness {
    fn new(config: Config) -> Self {
        let server = Server::new(&config);
        let network = Network::bind("127.0.0.1:0").unwrap();
        Self { server, network }
    }
    fn connect(&mut self) -> (TcpStream, BufReader<TcpStream>) {
        let conn = TcpStream::connect(self.network.local_addr().unwrap()).unwrap();
        conn.set_read_timeout(Some(Duration::from_millis(50))).unwrap();
        let reader = BufReader::new(conn.try_clone().unwrap());
        self.pump();
        (conn, reader)
    }
    fn pump(&mut self) {
        self.network.process_until(Instant::now() + Duration::from_millis(50), &mut self.server).unwrap();
    }
    /// Sends `line` and collects every line the console answers with.
    fn send(&mut self, conn: &mut (TcpStream, BufReader<TcpStream>), line: &str) -> Vec<String> {
        writeln!(conn.0, "{line}").unwrap();
        self.collect(&mut conn.1)
    }
    fn collect(&mut self, reader: &mut BufReader<TcpStream>) -> Vec<String> {
        let mut lines = vec![];
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            self.pump();
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => lines.push(line.trim_end().to_string()),
                Err(_) if !lines.is_empty() => break,
                Err(_) => {}
            }
        }
        lines
    }
    fn tick(&mut self, ticks: u64) {
        let target = self.server.next_tick() - 1 + ticks;
        self.server.tick_until(target);
        let mut inboxes = self.network.inboxes();
        for (name, message) in self.server.notifications() {
            inboxes.notify(name, Response::Notice(message));
        }
    }
}

#[test]
fn select_and_transfer_over_the_wire() {
    let config = Config { ticks_between_chunks: 1, ..Config::default() };
    let mut h = Harness::new(config);
    let mut conn = h.connect();

    assert_eq!(h.send(&mut conn, "select a"), ["! Log in first using login [name]."]);
    assert_eq!(h.send(&mut conn, "login dann"), ["Logged in as dann."]);
    assert_eq!(h.send(&mut conn, "transferfrom world_nether"), [
        "! You need to select a region first using select [a/b].",
    ]);
    h.send(&mut conn, "goto world 0 64 0");
    assert_eq!(h.send(&mut conn, "select a"), ["Point 'a' was set here, chunk (0, 0)."]);
    h.send(&mut conn, "goto world 20 64 20");
    assert_eq!(h.send(&mut conn, "select b"), ["Point 'b' was set here, chunk (1, 1)."]);
    assert_eq!(h.send(&mut conn, "transferfrom the_moon"), ["! World the_moon doesn't exist."]);

    let nether = h.server.worlds().id("world_nether").unwrap();
    h.server.worlds_mut().get_mut(nether).unwrap().set_block(17, 100, 17, BlockId(1234));
    assert_eq!(h.send(&mut conn, "transferfrom world_nether"), [
        "Started region transfer of 4 chunks. This will take ~0.05 seconds per chunk.",
    ]);
    assert_eq!(h.send(&mut conn, "jobs"), ["world_nether -> world: (0, 0) to (1, 1), 0/4, Idle"]);

    h.tick(4);
    assert_eq!(h.collect(&mut conn.1), ["* Transfer from world_nether finished, 4 chunks copied."]);
    assert_eq!(h.server.running_jobs(), 0);
    let world = h.server.worlds().id("world").unwrap();
    assert_eq!(h.server.worlds_mut().get_mut(world).unwrap().block(17, 100, 17), BlockId(1234));
}

#[test]
fn cancel_over_the_wire() {
    let mut h = Harness::new(Config::default());
    let mut conn = h.connect();
    h.send(&mut conn, "login dann");
    h.send(&mut conn, "goto world_the_end 0 64 0");
    h.send(&mut conn, "select a");
    h.send(&mut conn, "goto world_the_end 100 64 0");
    h.send(&mut conn, "select b");
    h.send(&mut conn, "transferfrom world");

    h.tick(11);
    assert_eq!(h.send(&mut conn, "cancel"), ["Cancelled 1 transfer(s)."]);
    assert_eq!(h.send(&mut conn, "cancel"), ["! You have no running transfers."]);
    h.tick(1);
    assert_eq!(h.collect(&mut conn.1), ["* Transfer from world cancelled, 5 chunks left untouched."]);
    assert_eq!(h.send(&mut conn, "jobs"), ["You have no running transfers."]);
}

#[test]
fn selections_survive_reconnects() {
    let mut h = Harness::new(Config::default());
    let mut conn = h.connect();
    h.send(&mut conn, "login dann");
    h.send(&mut conn, "goto world 0 64 0");
    h.send(&mut conn, "select a");
    h.send(&mut conn, "select b");
    drop(conn);
    h.pump();
    assert_eq!(h.network.connected(), 0);

    let mut conn = h.connect();
    h.send(&mut conn, "login dann");
    assert_eq!(h.send(&mut conn, "transferfrom world")[0], "Started region transfer of 1 chunks. This will take ~0.5 seconds per chunk.");
}

#[test]
fn selections_can_expire_on_disconnect() {
    let config = Config { forget_selection_on_disconnect: true, ..Config::default() };
    let mut h = Harness::new(config);
    let mut conn = h.connect();
    h.send(&mut conn, "login dann");
    h.send(&mut conn, "goto world 0 64 0");
    h.send(&mut conn, "select a");
    drop(conn);
    h.pump();

    let mut conn = h.connect();
    h.send(&mut conn, "login dann");
    assert_eq!(h.send(&mut conn, "transferfrom world"), [
        "! You need to select a region first using select [a/b].",
    ]);
}

#[test]
fn selections_expire_with_the_last_connection() {
    let config = Config { forget_selection_on_disconnect: true, ..Config::default() };
    let mut h = Harness::new(config);
    let mut first = h.connect();
    let mut second = h.connect();
    h.send(&mut first, "login dann");
    h.send(&mut second, "login dann");
    h.send(&mut first, "goto world 0 64 0");
    h.send(&mut first, "select a");
    h.send(&mut first, "select b");

    // the other connection is still logged in as dann
    drop(second);
    h.pump();
    assert_eq!(h.network.connected(), 1);
    assert_eq!(h.send(&mut first, "transferfrom world")[0], "Started region transfer of 1 chunks. This will take ~0.5 seconds per chunk.");

    let mut second = h.connect();
    h.send(&mut second, "login dann");
    assert_eq!(h.send(&mut second, "login other"), ["Logged in as other."]);
    assert!(h.server.is_online(Name::new("dann").unwrap()));
    h.send(&mut first, "select a");

    drop(first);
    h.pump();
    assert!(!h.server.is_online(Name::new("dann").unwrap()));
    h.send(&mut second, "login dann");
    assert_eq!(h.send(&mut second, "transferfrom world"), [
        "! You need to select a region first using select [a/b].",
    ]);
}

#[test]
fn overlong_lines_disconnect() {
    let mut h = Harness::new(Config::default());
    let mut conn = h.connect();
    conn.0.write_all(&[b'x'; 2048]).unwrap();
    h.pump();
    h.pump();
    assert_eq!(h.network.connected(), 0);
}

#[test]
fn offline_actors_get_nothing() {
    let mut h = Harness::new(Config::default());
    let mut inboxes = h.network.inboxes();
    assert_eq!(inboxes.notify(Name::new("nobody").unwrap(), Response::Notice("hi".into())), 0);
}
