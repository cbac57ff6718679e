use std::time::Duration;

use shared::protocol::ServerMessage;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:12345".to_string());
    let room = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "Arena1".to_string());

    println!("Connecting to {}", server_addr);
    let stream = TcpStream::connect(&server_addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    println!("Selecting room {}", room);
    write_half
        .write_all(format!("MAPSELECT {}\n", room).as_bytes())
        .await?;

    // Join phase: wait out the lobby until the match starts
    let mut player_id = String::new();
    loop {
        let Some(line) = lines.next_line().await? else {
            println!("Server closed the connection");
            return Ok(());
        };
        match ServerMessage::parse(&line) {
            Ok(ServerMessage::Settings(settings)) => {
                println!(
                    "Settings: {}x{} field, {}x{} players",
                    settings.field_width,
                    settings.field_height,
                    settings.player_width,
                    settings.player_height
                );
            }
            Ok(ServerMessage::Connected { player_id: id, room }) => {
                println!("Connected to room {} as {}", room, id);
                player_id = id;
                write_half.write_all(b"READY\n").await?;
                println!("Sent READY");
            }
            Ok(ServerMessage::Waiting) => println!("Waiting for an opponent..."),
            Ok(ServerMessage::MapFull) => {
                println!("Room {} is full", room);
                return Ok(());
            }
            Ok(ServerMessage::GameStart) => {
                println!("Match started");
                break;
            }
            Ok(other) => println!("Unexpected message: {:?}", other),
            Err(e) => println!("Failed to parse line {:?}: {}", line, e),
        }
    }

    // Play phase: drift upfield firing missiles, printing every snapshot
    let mut x = 180;
    let mut y = 600;
    for _ in 0..20 {
        x = (x + 15).min(410);
        y = (y - 10).max(300);
        write_half
            .write_all(format!("MOVE {} {}\n", x, y).as_bytes())
            .await?;
        write_half
            .write_all(format!("MISSILE {} {}\n", x + 40, y - 30).as_bytes())
            .await?;

        loop {
            let Some(line) = lines.next_line().await? else {
                println!("Server closed the connection");
                return Ok(());
            };
            match ServerMessage::parse(&line) {
                Ok(ServerMessage::GameState(frame)) => {
                    println!(
                        "State: {} players, {} missiles, {} obstacles, {} items",
                        frame.players.len(),
                        frame.missiles.len(),
                        frame.obstacles.len(),
                        frame.items.len()
                    );
                    if let Some(me) = frame.players.iter().find(|p| p.id == player_id) {
                        println!("  {} at ({}, {}) health {}", me.id, me.x, me.y, me.health);
                    }
                    break;
                }
                Ok(ServerMessage::Defeat) => {
                    println!("Defeated");
                    return Ok(());
                }
                Ok(ServerMessage::Victory) => {
                    println!("Victory!");
                    return Ok(());
                }
                Ok(other) => println!("Unexpected message: {:?}", other),
                Err(e) => println!("Failed to parse line {:?}: {}", line, e),
            }
        }

        sleep(Duration::from_millis(500)).await;
    }

    // Outcome phase: keep draining snapshots until the match resolves
    println!("Script finished, waiting for the outcome");
    while let Some(line) = lines.next_line().await? {
        match ServerMessage::parse(&line) {
            Ok(ServerMessage::GameState(_)) => {}
            Ok(ServerMessage::Defeat) => {
                println!("Defeated");
                break;
            }
            Ok(ServerMessage::Victory) => {
                println!("Victory!");
                break;
            }
            Ok(other) => println!("Unexpected message: {:?}", other),
            Err(e) => println!("Failed to parse line {:?}: {}", line, e),
        }
    }

    println!("Test client finished");
    Ok(())
}
