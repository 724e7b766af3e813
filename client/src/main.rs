use clap::Parser;
use client::commands::{self, Command, HELP};
use client::network::Connection;
use client::view::RoomView;
use log::info;
use shared::ClientEvent;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Identity token for a persistent profile
    #[arg(short = 't', long)]
    token: Option<String>,

    /// Player name used when creating or joining a room
    #[arg(short = 'n', long, default_value = "Player")]
    name: String,

    /// Avatar to use as a guest
    #[arg(short = 'a', long)]
    avatar: Option<String>,

    /// Room code to join; a new room is created when omitted
    #[arg(short = 'r', long)]
    room: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Connecting to: {}", args.server);

    let mut connection = Connection::connect(&args.server, args.token.clone()).await?;
    let mut view = RoomView::new(connection.player_id());
    if connection.welcome().needs_display_name {
        println!("Signed in without a profile. Use /profile <name> to create one.");
    }

    let first = match &args.room {
        Some(room_id) => ClientEvent::JoinRoom {
            room_id: room_id.clone(),
            player_name: args.name.clone(),
            avatar: args.avatar.clone(),
        },
        None => ClientEvent::CreateRoom {
            player_name: args.name.clone(),
            avatar: args.avatar.clone(),
        },
    };
    connection.send_event(first).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = connection.recv() => {
                match event {
                    Some(event) => {
                        for line in view.apply(event) {
                            println!("{}", line);
                        }
                    }
                    None => {
                        println!("Server closed the connection");
                        break;
                    }
                }
            }
            line = lines.next_line() => {
                let line = match line? {
                    Some(line) => line,
                    None => break,
                };
                if line.trim().is_empty() {
                    continue;
                }
                match commands::parse(&line, &args.name, args.avatar.as_deref()) {
                    Ok(Command::Event(event)) => connection.send_event(event).await?,
                    Ok(Command::Request(request)) => {
                        let id = connection.send_request(request).await?;
                        println!("#{} sent", id);
                    }
                    Ok(Command::Help) => println!("{}", HELP),
                    Ok(Command::Quit) => break,
                    Err(message) => println!("{}", message),
                }
            }
        }
    }

    info!("Bye");
    Ok(())
}
