//! Synthetic demo - runs the engine on a generated input stream
//!
//! Feeds a bouncing white square into the engine, exercises every effect and
//! both panel modes, and writes periodic PNG snapshots so the output can be
//! eyeballed without a camera or LED hardware attached.
//!
//! Usage: `synthetic_demo [output_dir]` (default `demo_out/`).

use std::path::{Path, PathBuf};

use ambient_matrix::effects::ambient::OvalChain;
use ambient_matrix::{Effect, Engine, EngineConfig, Frame, SystemMode};

const WIDTH: u32 = 192;
const HEIGHT: u32 = 64;
const FRAMES_PER_EFFECT: u32 = 120;
const SNAPSHOT_EVERY: u32 = 40;

/// Bouncing square stand-in for a person moving in front of the camera.
struct SyntheticCamera {
    x: f32,
    y: f32,
    dx: f32,
    dy: f32,
    frame: Frame,
}

impl SyntheticCamera {
    fn new() -> Self {
        Self {
            x: 20.0,
            y: 12.0,
            dx: 1.6,
            dy: 0.9,
            frame: Frame::zeros(WIDTH, HEIGHT),
        }
    }

    fn capture(&mut self) -> &Frame {
        const SIZE: f32 = 26.0;
        self.x += self.dx;
        self.y += self.dy;
        if self.x < 0.0 || self.x + SIZE >= WIDTH as f32 {
            self.dx = -self.dx;
            self.x += self.dx;
        }
        if self.y < 0.0 || self.y + SIZE >= HEIGHT as f32 {
            self.dy = -self.dy;
            self.y += self.dy;
        }
        self.frame.clear();
        // dim static backdrop so the model has something to learn
        self.frame.fill([24, 18, 12]);
        for y in self.y as u32..((self.y + SIZE) as u32).min(HEIGHT) {
            for x in self.x as u32..((self.x + SIZE) as u32).min(WIDTH) {
                self.frame.set_pixel(x, y, [230, 230, 230]);
            }
        }
        &self.frame
    }
}

fn save_png(frame: &Frame, path: &Path) -> Result<(), String> {
    let mut rgb = image::RgbImage::new(frame.width(), frame.height());
    for (x, y, px) in rgb.enumerate_pixels_mut() {
        let [b, g, r] = frame.pixel(x, y);
        *px = image::Rgb([r, g, b]);
    }
    rgb.save(path).map_err(|e| format!("saving {path:?}: {e}"))
}

fn run() -> Result<(), String> {
    let out_dir: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demo_out".into())
        .into();
    std::fs::create_dir_all(&out_dir).map_err(|e| format!("creating {out_dir:?}: {e}"))?;

    let config = EngineConfig {
        width: WIDTH,
        height: HEIGHT,
        num_panels: 3,
        auto_cycle: false,
        ..EngineConfig::default()
    };
    let mut engine = Engine::new(&config)?;
    let controls = engine.controls();
    let mut camera = SyntheticCamera::new();
    let mut out = Frame::zeros(WIDTH, HEIGHT);

    let tour: &[(SystemMode, Effect)] = &[
        (SystemMode::Active, Effect::FilledSilhouette),
        (SystemMode::Active, Effect::Outline),
        (SystemMode::Active, Effect::MotionTrails),
        (SystemMode::Active, Effect::RainbowTrails),
        (SystemMode::Active, Effect::DoubleExposure),
        (SystemMode::Active, Effect::GeometricAbstraction),
        (SystemMode::Ambient, Effect::ProceduralShapes),
        (SystemMode::Ambient, Effect::WavePatterns),
        (SystemMode::Ambient, Effect::MandelbrotVeins),
    ];

    for (mode, effect) in tour {
        controls.set_system_mode(*mode);
        controls.set_effect(*effect);
        log::info!("running {}", effect.display_name());
        for frame_no in 0..FRAMES_PER_EFFECT {
            let input = camera.capture();
            engine.process_frame(input, &mut out);
            if frame_no % SNAPSHOT_EVERY == SNAPSHOT_EVERY - 1 {
                let name = format!(
                    "{}_{frame_no:03}.png",
                    effect.display_name().to_lowercase().replace(' ', "_")
                );
                save_png(&out, &out_dir.join(name))?;
            }
        }
        let status = engine.status();
        println!(
            "{}",
            serde_json::to_string(&status).map_err(|e| e.to_string())?
        );
    }

    // the chain generator is driven standalone; it has no selector number
    let mut chain = OvalChain::new();
    let mut chain_frame = Frame::zeros(WIDTH, HEIGHT);
    for frame_no in 0..FRAMES_PER_EFFECT {
        chain.process(&mut chain_frame, WIDTH, HEIGHT);
        if frame_no % SNAPSHOT_EVERY == SNAPSHOT_EVERY - 1 {
            save_png(&chain_frame, &out_dir.join(format!("oval_chain_{frame_no:03}.png")))?;
        }
    }

    log::info!("snapshots written to {out_dir:?}");
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}
