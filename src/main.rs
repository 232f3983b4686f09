use anyhow::{Context, Result, bail};
use clap::Parser;
use env_logger::Env;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Builder;

use sospf_router::console::{self, Command};
use sospf_router::{Router, RouterConfig};

#[derive(Parser)]
#[command(name = "sospf", about = "Simulated link-state router process")]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated IP identifying this router
    #[arg(long)]
    simulated_ip: Option<String>,

    /// Process port to listen on (0 picks a free one)
    #[arg(long)]
    port: Option<u16>,

    #[arg(long)]
    process_ip: Option<String>,

    #[arg(long)]
    connect_timeout_ms: Option<u64>,

    #[arg(long)]
    read_timeout_ms: Option<u64>,
}

impl Cli {
    fn into_config(self) -> Result<RouterConfig> {
        let mut config = match &self.config {
            Some(path) => RouterConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => {
                let Some(simulated_ip) = self.simulated_ip.clone() else {
                    bail!("either --config or --simulated-ip is required");
                };
                RouterConfig::new(simulated_ip, self.port.unwrap_or(0))
            }
        };

        if let Some(simulated_ip) = self.simulated_ip {
            config.simulated_ip = simulated_ip;
        }
        if let Some(port) = self.port {
            config.process_port = port;
        }
        if let Some(process_ip) = self.process_ip {
            config.process_ip = process_ip;
        }
        if self.connect_timeout_ms.is_some() {
            config.connect_timeout_ms = self.connect_timeout_ms;
        }
        if self.read_timeout_ms.is_some() {
            config.read_timeout_ms = self.read_timeout_ms;
        }
        Ok(config)
    }
}

fn prompt() {
    print!(">> ");
    let _ = std::io::stdout().flush();
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let config = Cli::parse().into_config()?;

    let rt = Builder::new_multi_thread().enable_all().build()?;

    rt.block_on(async {
        let router = Router::bind(config.clone())
            .await
            .with_context(|| format!("binding {}:{}", config.process_ip, config.process_port))?;
        println!(
            "Router {} listening on {}",
            router.identity().simulated_ip,
            router.local_addr()
        );

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        prompt();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                prompt();
                continue;
            }
            match Command::parse(&line) {
                Ok(Command::Quit) => {
                    println!("{}", console::execute(&router, Command::Quit).await);
                    break;
                }
                Ok(command) => println!("{}", console::execute(&router, command).await),
                Err(message) => println!("{}", message),
            }
            prompt();
        }

        router.shutdown();
        Ok(())
    })
}
