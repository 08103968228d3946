//! First-person software view of the built-in demo level.
//!
//! ```bash
//! cargo run --release -- --width 640 --height 400 --scale 2
//! ```

use clap::Parser;
use glam::Vec3;
use log::info;
use minifb::{Key, KeyRepeat, Scale, Window, WindowOptions};
use std::time::{Duration, Instant};

use adjoin_rs::{
    renderer::{RenderConfig, Renderer, Software},
    world::{Camera, Level, TextureBank, demo_level},
};

const EYE_HEIGHT: f32 = 5.0;
const WALK_SPEED: f32 = 0.5;
const TURN_SPEED: f32 = 0.05;
const LOOK_SPEED: f32 = 0.02;

#[derive(Parser, Debug)]
#[command(about = "Portal renderer demo")]
struct Args {
    #[arg(long, default_value_t = 320)]
    width: usize,
    #[arg(long, default_value_t = 200)]
    height: usize,
    /// Window pixels per framebuffer pixel (1, 2, 4 or 8).
    #[arg(long, default_value_t = 2)]
    scale: u8,
    /// Horizontal field of view in degrees.
    #[arg(long, default_value_t = 90.0)]
    fov: f32,
    /// Stretch rows so 320×200 looks 4:3.
    #[arg(long)]
    aspect_correct: bool,
    /// Camera light offset, 0 = brightest, 31 = off.
    #[arg(long, default_value_t = 31)]
    ambient: i32,
    #[arg(long)]
    headlamp: bool,
}

fn window_scale(s: u8) -> Scale {
    match s {
        0 | 1 => Scale::X1,
        2 => Scale::X2,
        3 | 4 => Scale::X4,
        _ => Scale::X8,
    }
}

/// Walk by `forward`/`side`, refusing steps that leave the map, and keep
/// the eye above the floor of whichever sector we end up in.
fn walk(camera: &mut Camera, level: &Level, forward: f32, side: f32) {
    let mut next = *camera;
    next.step(forward, side);
    if let Some(z) = eye_at(level, next.pos) {
        next.pos.z = z;
        *camera = next;
    }
}

fn eye_at(level: &Level, p: Vec3) -> Option<f32> {
    let id = level.sector_at(p.truncate())?;
    level.sector(id).map(|s| s.floor_height + EYE_HEIGHT)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut bank = TextureBank::default_with_checker();
    let (mut level, start, yaw) = demo_level(&mut bank)?;
    info!(
        "level {}: {} sectors, {} textures",
        level.name,
        level.sectors.len(),
        bank.len()
    );

    let mut camera = Camera::new(start, yaw, args.fov.to_radians());
    let mut renderer = Software::new(RenderConfig {
        width: args.width,
        height: args.height,
        aspect_correct: args.aspect_correct,
        world_ambient: args.ambient,
        camera_light: args.headlamp,
        ..RenderConfig::default()
    })?;

    let (w, h) = (args.width, args.height);
    let mut win = Window::new(
        "adjoin_rs software view",
        w,
        h,
        WindowOptions {
            scale: window_scale(args.scale),
            ..WindowOptions::default()
        },
    )?;
    win.set_target_fps(35);

    let mut rgb = vec![0u32; w * h];
    let mut headlamp = args.headlamp;

    // ────────────────── benchmarking state ──────────────────────────────
    let mut acc_time = Duration::ZERO; // cumulated render time
    let mut acc_frames = 0usize; // frames in the current window
    let mut last_print = Instant::now(); // when we printed last

    while win.is_open() && !win.is_key_down(Key::Escape) {
        let t0 = Instant::now();

        /* movement --------------------------------------------------------- */
        let run = if win.is_key_down(Key::LeftShift) || win.is_key_down(Key::RightShift) {
            2.0
        } else {
            1.0
        };
        let mut forward = 0.0;
        let mut side = 0.0;
        if win.is_key_down(Key::Up) || win.is_key_down(Key::W) {
            forward += WALK_SPEED * run;
        }
        if win.is_key_down(Key::Down) || win.is_key_down(Key::S) {
            forward -= WALK_SPEED * run;
        }
        if win.is_key_down(Key::A) {
            side -= WALK_SPEED * run;
        }
        if win.is_key_down(Key::D) {
            side += WALK_SPEED * run;
        }
        if win.is_key_down(Key::Left) {
            camera.turn(TURN_SPEED * run);
        }
        if win.is_key_down(Key::Right) {
            camera.turn(-TURN_SPEED * run);
        }
        if win.is_key_down(Key::PageUp) {
            camera.look(LOOK_SPEED);
        }
        if win.is_key_down(Key::PageDown) {
            camera.look(-LOOK_SPEED);
        }
        if win.is_key_pressed(Key::End, KeyRepeat::No) {
            camera.pitch = 0.0;
        }
        if win.is_key_pressed(Key::L, KeyRepeat::No) {
            headlamp = !headlamp;
            renderer.set_camera_light(headlamp);
            info!("headlamp {}", if headlamp { "on" } else { "off" });
        }
        if forward != 0.0 || side != 0.0 {
            walk(&mut camera, &level, forward, side);
        }

        /* draw */
        renderer.begin_frame(w, h);
        renderer.draw_level(&mut level, &camera, &bank);
        renderer.end_frame(|fb, _, _| {
            bank.palette().convert(fb, &mut rgb);
        });
        acc_time += t0.elapsed();
        acc_frames += 1;
        win.update_with_buffer(&rgb, w, h)?;

        // ─────────── report every ~3 s ────────────────────
        if last_print.elapsed() >= Duration::from_secs(3) {
            let avg_ms = acc_time.as_secs_f64() * 1000.0 / acc_frames.max(1) as f64;
            let stats = renderer.stats();
            info!(
                "avg render: {:.2} ms ({:.1} FPS), {} sectors, {} segments, depth {}",
                avg_ms,
                1000.0 / avg_ms.max(f64::EPSILON),
                stats.sectors_drawn,
                stats.segments_drawn,
                stats.max_depth,
            );
            acc_time = Duration::ZERO;
            acc_frames = 0;
            last_print = Instant::now();
        }
    }
    Ok(())
}
