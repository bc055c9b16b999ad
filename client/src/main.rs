use clap::Parser;
use client::game::ClientWorld;
use client::input::InputManager;
use client::network::{self, NetworkEvent};
use client::rendering::Renderer;
use log::{error, info, warn};
use macroquad::prelude::*;
use shared::ClientMessage;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Player name shown above your blobs
    #[arg(short = 'n', long, default_value = "")]
    name: String,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: usize,
}

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Blob Arena".to_owned(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Controls: move the pointer away from the centre to steer");

    let handle = match network::connect(&args.server) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start network thread: {}", e);
            return;
        }
    };
    handle.send(ClientMessage::Spawn {
        name: args.name.clone(),
    });

    let mut world = ClientWorld::new();
    let mut input = InputManager::new();
    let mut renderer = Renderer::new(args.width, args.height);
    let mut connected = false;

    loop {
        input.update();

        let now = Instant::now();
        for event in handle.drain() {
            match event {
                NetworkEvent::Connected => connected = true,
                NetworkEvent::Message(message) => {
                    if world.apply(message, now) && !handle.send(input.move_message()) {
                        connected = false;
                    }
                }
                NetworkEvent::Disconnected(reason) => {
                    warn!("Disconnected: {}", reason);
                    connected = false;
                }
            }
        }

        world.sample(Instant::now());
        renderer.render(&world, connected);

        next_frame().await
    }
}
