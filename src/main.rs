use std::time::*;

use chunkferry::{Config, Network, Server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let config = match std::env::args_os().nth(1) {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };

    let mut server = Server::new(&config);
    let mut network = Network::bind(config.bind.as_str())?;
    let addr = network.local_addr()?;
    match local_ip_address::local_ip() {
        Ok(ip) if addr.ip().is_unspecified() => log::info!("console listening on {ip}:{}", addr.port()),
        Ok(_) => log::info!("console listening on {addr}"),
        Err(e) => log::info!("console listening on {addr} (no LAN address: {e})"),
    }
    log::info!("worlds: {}", config.worlds.join(", "));

    let tick = Duration::from_millis(config.tick_millis);
    let starttime = Instant::now();
    loop {
        let next_tick_due = server.next_tick_due(starttime);
        network.process_until(next_tick_due, &mut server)?;

        let time_passed_in_ticks = (Instant::now() - starttime).as_millis() / tick.as_millis();
        server.tick_until(time_passed_in_ticks as u64);

        let mut inboxes = network.inboxes();
        for (name, message) in server.notifications() {
            if inboxes.notify(name, chunkferry::network::Response::Notice(message.clone())) == 0 {
                log::info!("{name} is offline: {message}");
            }
        }
    }
}
