//! # Game Server Library
//!
//! This library provides the authoritative server implementation for a
//! two-player shooting game. It hosts any number of independent rooms,
//! advances each running match on a fixed simulation tick, and broadcasts
//! state snapshots tailored to each connected player.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! All game rules run here. Clients only report where their ship is and
//! where they fired; missile movement, collision resolution, health and the
//! win/loss decision are made by the server and pushed back out.
//!
//! ### Matchmaking
//! Players pick a room by name. The first two connections to name the same
//! room become Player1 and Player2 of that room; a third is turned away.
//! Once a match finishes its room name frees up for a brand new session.
//!
//! ### Mirrored State Broadcasting
//! Both players play "upward" from the bottom of their own screen. The
//! server keeps one canonical coordinate space and mirrors the opponent,
//! every missile the opponent fired and all neutral entities into each
//! recipient's frame of reference when it encodes a snapshot. Collision
//! checks use the same transform, so what a player sees is exactly what
//! gets hit.
//!
//! ## Architecture Design
//!
//! ### Shared Tick Scheduler
//! A single scheduler task advances every room at the configured cadence
//! (50ms by default). Each tick moves missiles, resolves missile, obstacle
//! and item collisions, then broadcasts one snapshot per player. Rooms
//! whose match ended are swept from the registry on the tick that ended
//! them.
//!
//! ### Line-Based TCP Communication
//! Clients speak a newline-terminated ASCII protocol over TCP. Each
//! connection gets a reader loop and a decoupled writer task, so a slow or
//! stalled client cannot hold up the simulation.
//!
//! ### Per-Room Timers
//! Obstacles and items spawn and drift on their own timers, independent of
//! the simulation tick. Both stop the moment their match ends.
//!
//! ## Module Organization
//!
//! ### Session Module (`session`)
//! The heart of the server. Owns the per-room state machine from waiting
//! through the ready handshake to the running match and its terminal
//! outcome, plus the tick pipeline and the per-recipient mirroring.
//!
//! ### Registry Module (`registry`)
//! Maps room names to live sessions, hands out player slots, and recycles
//! names once their match is over.
//!
//! ### Connection Module (`connection`)
//! Per-client protocol handling. Parses commands, relays them into the
//! player's session and tears the player down on disconnect.
//!
//! ### Scheduler Module (`scheduler`)
//! The fixed-rate driver that ticks every registered session.
//!
//! ### Obstacles and Items Modules (`obstacles`, `items`)
//! Neutral entity simulators. Obstacles damage whichever player they drift
//! into; items grant a doubled-missile power-up when collected.
//!
//! ### Network Module (`network`)
//! Binds the listener, accepts sockets and wires each one to a connection
//! handler.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::GameServer;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Bind the listener with a 50ms simulation tick and the default
//!     // obstacle cap per room.
//!     let server = GameServer::bind(
//!         "127.0.0.1:12345",
//!         Duration::from_millis(50),
//!         10,
//!     )
//!     .await?;
//!
//!     // Run the accept loop. The shared tick scheduler is spawned
//!     // internally; every accepted socket gets its own handler task.
//!     server.run().await;
//!
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod items;
pub mod network;
pub mod obstacles;
pub mod registry;
pub mod scheduler;
pub mod session;
