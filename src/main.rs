//! Top-down automap of the built-in demo level.
//!
//! ```bash
//! cargo run --release --bin adjoin_rs -- --zoom 8
//! ```

use clap::Parser;
use log::info;
use minifb::{Key, Window, WindowOptions};

use adjoin_rs::{
    renderer::{Renderer, Software},
    world::{Camera, TextureBank, demo_level},
};

const WIDTH: usize = 1024;
const HEIGHT: usize = 768;

#[derive(Parser, Debug)]
#[command(about = "Automap viewer")]
struct Args {
    /// Pixels per map unit.
    #[arg(long, default_value_t = 8.0)]
    zoom: f32,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut bank = TextureBank::default_with_checker();
    let (level, start, yaw) = demo_level(&mut bank)?;
    info!("{}", level.name);

    let mut camera = Camera::new(start, yaw, 90_f32.to_radians());
    let mut zoom = args.zoom.max(0.25);
    let mut renderer = Software::default();
    let mut rgb = vec![0u32; WIDTH * HEIGHT];

    let mut window = Window::new("adjoin_rs map", WIDTH, HEIGHT, WindowOptions::default())?;
    window.set_target_fps(35);
    while window.is_open() && !window.is_key_down(Key::Escape) {
        // ─────────── pan / turn / zoom ────────────
        let pan = 4.0 / zoom;
        if window.is_key_down(Key::W) || window.is_key_down(Key::Up) {
            camera.step(pan, 0.0);
        }
        if window.is_key_down(Key::S) || window.is_key_down(Key::Down) {
            camera.step(-pan, 0.0);
        }
        if window.is_key_down(Key::A) {
            camera.step(0.0, -pan);
        }
        if window.is_key_down(Key::D) {
            camera.step(0.0, pan);
        }
        if window.is_key_down(Key::Left) {
            camera.turn(0.05);
        }
        if window.is_key_down(Key::Right) {
            camera.turn(-0.05);
        }
        if window.is_key_down(Key::Equal) {
            zoom = (zoom * 1.05).min(64.0);
        }
        if window.is_key_down(Key::Minus) {
            zoom = (zoom / 1.05).max(0.25);
        }

        renderer.begin_frame(WIDTH, HEIGHT);
        renderer.draw_automap(&level, &camera, zoom);
        renderer.end_frame(|fb, _, _| bank.palette().convert(fb, &mut rgb));
        window.update_with_buffer(&rgb, WIDTH, HEIGHT)?;
    }
    Ok(())
}
