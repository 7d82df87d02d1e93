use clap::{Parser, Subcommand};
use log::{error, info};

use q2query::{Config, Dialect, PlayerRecord, QueryError, RconClient, ServerAddress, StatusQuery};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query a server's public status
    Status {
        /// host:port or quake2://host:port
        address: ServerAddress,
        /// Parse player lines in the legacy Quake I layout
        #[arg(long)]
        quake1: bool,
    },
    /// Run a raw rcon command and print the reply
    Rcon {
        address: ServerAddress,
        #[arg(short, long, env = "Q2_RCON_PASSWORD", default_value = "")]
        password: String,
        #[arg(required = true, num_args = 1..)]
        command: Vec<String>,
    },
    /// List connected clients through rcon
    Players {
        address: ServerAddress,
        #[arg(short, long, env = "Q2_RCON_PASSWORD", default_value = "")]
        password: String,
    },
    /// List maps available on the server
    Maps {
        address: ServerAddress,
        #[arg(short, long, env = "Q2_RCON_PASSWORD", default_value = "")]
        password: String,
    },
    /// Dump the server's serverinfo settings
    Serverinfo {
        address: ServerAddress,
        #[arg(short, long, env = "Q2_RCON_PASSWORD", default_value = "")]
        password: String,
    },
    /// Change the current map
    Map {
        address: ServerAddress,
        #[arg(short, long, env = "Q2_RCON_PASSWORD", default_value = "")]
        password: String,
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let config = Config::from_env();

    if let Err(e) = run(args.command, &config).await {
        error!("{} ({:?})", e, e.kind());
        return Err(e.into());
    }
    Ok(())
}

async fn run(command: Command, config: &Config) -> Result<(), QueryError> {
    match command {
        Command::Status { address, quake1 } => {
            let dialect = if quake1 { Dialect::Quake1 } else { Dialect::Quake2 };
            let state = StatusQuery::new(dialect)
                .query(&address, Some(config.query_timeout))
                .await?;

            println!("hostname: {}", state.hostname.as_deref().unwrap_or("-"));
            println!("map:      {}", state.map.as_deref().unwrap_or("-"));
            println!(
                "players:  {}/{}",
                state.num_players,
                state.max_players.as_deref().unwrap_or("?")
            );
            for player in state.players.iter().chain(&state.bots) {
                print_player(player);
            }
        }
        Command::Rcon { address, password, command } => {
            let client = RconClient::connect_with(address, &password, config).await?;
            print!("{}", client.execute(&command.join(" ")).await?);
            client.close().await;
        }
        Command::Players { address, password } => {
            let client = RconClient::connect_with(address, &password, config).await?;
            let (map, rows) = client.status().await?;
            println!("map: {}", map);
            for row in rows {
                println!(
                    "{:>3} {:>5} {:>4} {:<15} {:<21} {}",
                    row.slot, row.score, row.ping, row.name, row.ip_address, row.rate_pps
                );
            }
            client.close().await;
        }
        Command::Maps { address, password } => {
            let client = RconClient::connect_with(address, &password, config).await?;
            for map in client.map_list().await? {
                println!("{}", map);
            }
            client.close().await;
        }
        Command::Serverinfo { address, password } => {
            let client = RconClient::connect_with(address, &password, config).await?;
            for (key, value) in client.server_info().await? {
                println!("{:<20} {}", key, value);
            }
            client.close().await;
        }
        Command::Map { address, password, name } => {
            let client = RconClient::connect_with(address, &password, config).await?;
            client.change_map(&name).await?;
            info!("{} is now on {}", client.address(), name);
            client.close().await;
        }
    }
    Ok(())
}

fn print_player(player: &PlayerRecord) {
    let tag = if player.is_bot() { " (bot)" } else { "" };
    match player {
        PlayerRecord::Quake2 { frags, ping, name, address } => println!(
            "  {:<16} {:>4} frags {:>4} ms {}{}",
            name.as_deref().unwrap_or("?"),
            frags,
            ping,
            address.as_deref().unwrap_or(""),
            tag
        ),
        PlayerRecord::Quake1 { name, score, ping, time, .. } => {
            println!("  {:<16} {:>4} score {:>4} ms {:>5} s{}", name, score, ping, time, tag)
        }
    }
}
