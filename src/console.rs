use std::fmt::Write;

use crate::router::Router;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Attach { process_ip: String, process_port: u16, simulated_ip: String },
    Connect { process_ip: String, process_port: u16, simulated_ip: String },
    Disconnect { slot: usize },
    Detect { destination: String },
    Neighbors,
    Start,
    Database,
    Help,
    Quit,
}

pub const HELP: &str = "Available commands:
- attach [Process IP] [Process Port] [IP Address]
- connect [Process IP] [Process Port] [IP Address]
- disconnect [Port Number]
- detect [IP Address]
- neighbors
- start
- dd
- quit";

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["attach", ip, port, sim] => Ok(Command::Attach {
                process_ip: ip.to_string(),
                process_port: parse_port(port)?,
                simulated_ip: sim.to_string(),
            }),
            ["connect", ip, port, sim] => Ok(Command::Connect {
                process_ip: ip.to_string(),
                process_port: parse_port(port)?,
                simulated_ip: sim.to_string(),
            }),
            ["disconnect", slot] => slot
                .parse()
                .map(|slot| Command::Disconnect { slot })
                .map_err(|_| format!("invalid port number: {}", slot)),
            ["detect", destination] => Ok(Command::Detect {
                destination: destination.to_string(),
            }),
            ["neighbors"] => Ok(Command::Neighbors),
            ["start"] => Ok(Command::Start),
            ["dd"] => Ok(Command::Database),
            ["help"] => Ok(Command::Help),
            ["quit"] => Ok(Command::Quit),
            [] => Err("empty command".to_string()),
            _ => Err(format!("Invalid command: {}\n{}", line.trim(), HELP)),
        }
    }
}

fn parse_port(raw: &str) -> Result<u16, String> {
    raw.parse().map_err(|_| format!("invalid process port: {}", raw))
}

/// Runs one command against the router and renders its result for the terminal.
pub async fn execute(router: &Router, command: Command) -> String {
    match command {
        Command::Attach { process_ip, process_port, simulated_ip } => {
            match router.attach(&process_ip, process_port, &simulated_ip).await {
                Ok(slot) => format!("attached {} on port {}", simulated_ip, slot),
                Err(e) => format!("attach failed: {}", e),
            }
        }
        Command::Connect { process_ip, process_port, simulated_ip } => {
            match router.connect(&process_ip, process_port, &simulated_ip).await {
                Ok(slot) => format!("connected {} on port {}", simulated_ip, slot),
                Err(e) => format!("connect failed: {}", e),
            }
        }
        Command::Disconnect { slot } => match router.disconnect(slot).await {
            Ok(remote) => format!("disconnected {} from port {}", remote.simulated_ip, slot),
            Err(e) => format!("disconnect failed: {}", e),
        },
        Command::Detect { destination } => router.detect(&destination).await.to_string(),
        Command::Neighbors => render_neighbors(router).await,
        Command::Start => match router.start().await {
            Ok(()) => "router started".to_string(),
            Err(e) => format!("start failed: {}", e),
        },
        Command::Database => render_database(router).await,
        Command::Help => HELP.to_string(),
        Command::Quit => {
            router.shutdown();
            "bye".to_string()
        }
    }
}

async fn render_neighbors(router: &Router) -> String {
    let neighbors = router.neighbors().await;
    if neighbors.is_empty() {
        return "Router has no current neighbors".to_string();
    }

    let mut output = String::new();
    let _ = writeln!(
        output,
        "{:<6} {:<16} {:<22} {:<8} {:<10}",
        "Port", "IP Address", "Process", "State", "Since"
    );
    for link in neighbors {
        let age = link.time_in_state().num_seconds();
        let _ = writeln!(
            output,
            "{:<6} {:<16} {:<22} {:<8} {:<10}",
            link.slot,
            link.remote.simulated_ip,
            link.remote.transport_addr(),
            link.state.to_string(),
            format!("{}s ago", age)
        );
    }
    output.trim_end().to_string()
}

async fn render_database(router: &Router) -> String {
    let mut output = String::new();
    for lsa in router.database().await {
        let _ = write!(output, "{}({}):\t", lsa.origin, lsa.sequence);
        for link in &lsa.links {
            let _ = write!(output, "{},{}\t", link.neighbor_id, link.port_num);
        }
        output.push('\n');
    }
    output.trim_end().to_string()
}
