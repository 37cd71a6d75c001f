use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};

use neon_void::{
    ColorKind, FrameOutcome, HeadlessGpu, RenderSettings, Renderer, ShaderSourceBundle, ShapeKind,
};

const USAGE: &str = "Usage: neon-void [--frames N] [--size WxH] [--shape S] [--color C] \
[--zoom D] [--resize-at F:WxH] [--settings FILE] [--shaders DIR] [--fail-bloom]";

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;

    let mut settings = match &options.settings {
        Some(path) => {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings {}", path.display()))?;
            RenderSettings::from_xml(&xml)
                .with_context(|| format!("failed to parse settings {}", path.display()))?
        }
        None => RenderSettings::default(),
    };
    if let Some(shape) = options.shape {
        settings.shape = shape;
    }
    if let Some(color) = &options.color {
        settings.color = ColorKind::from_name(color);
    }

    let sources = match &options.shaders {
        Some(dir) => ShaderSourceBundle::from_dir(dir)?,
        None => ShaderSourceBundle::builtin(),
    };

    let (width, height) = options.size;
    let mut gpu = HeadlessGpu::new(width, height);
    if options.fail_bloom {
        gpu.fail_offscreen(true);
    }
    let mut renderer = Renderer::new(gpu, &sources, settings, width, height)
        .context("failed to initialize renderer")?;
    if let Some(delta) = options.zoom {
        renderer.adjust_zoom(delta);
    }

    info!("rendering {} frame(s) at {width}x{height}", options.frames);
    for frame in 0..options.frames {
        for (_, (width, height)) in options.resizes.iter().filter(|(at, _)| *at == frame) {
            renderer.on_viewport_resized(*width, *height);
        }
        let outcome = renderer
            .render()
            .with_context(|| format!("frame {frame} failed"))?;
        debug!("frame {frame}: {outcome:?}");
    }

    print_summary(&renderer);
    Ok(())
}

fn print_summary(renderer: &Renderer<HeadlessGpu>) {
    let stats = renderer.stats();
    println!(
        "Rendered {} frame(s): {} bloom, {} direct, {} skipped",
        stats.frames, stats.bloom, stats.direct, stats.skipped
    );
    println!("Shape: {}", renderer.shape());
    let color = renderer.material().color;
    println!(
        "Color: {} ({:.2}, {:.2}, {:.2})",
        renderer.color(),
        color.x,
        color.y,
        color.z
    );
    println!("Camera distance: {:.2}", renderer.camera().base_distance());
    let angles = renderer.rotation().angles;
    println!(
        "Rotation: ({:.3}, {:.3}, {:.3})",
        angles.x, angles.y, angles.z
    );
    let (width, height) = renderer.surface_size();
    println!("Surface: {width}x{height}");
    match renderer.targets() {
        Some(targets) => {
            let (width, height) = targets.size();
            println!("Targets: {width}x{height}");
        }
        None => println!("Targets: none"),
    }
    let last = renderer
        .gpu()
        .last_surface_draw()
        .map(|draw| {
            if renderer.bloom().programs()[2] == &draw.program {
                FrameOutcome::Bloom
            } else {
                FrameOutcome::Direct
            }
        });
    match last {
        Some(outcome) => println!("Last surface pass: {outcome:?}"),
        None => println!("Last surface pass: none"),
    }
}

struct CliOptions {
    frames: u32,
    size: (u32, u32),
    shape: Option<ShapeKind>,
    color: Option<String>,
    zoom: Option<f32>,
    resizes: Vec<(u32, (u32, u32))>,
    settings: Option<PathBuf>,
    shaders: Option<PathBuf>,
    fail_bloom: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        Self::from_args(env::args().skip(1))
    }

    fn from_args(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self {
            frames: 60,
            size: (800, 600),
            shape: None,
            color: None,
            zoom: None,
            resizes: Vec::new(),
            settings: None,
            shaders: None,
            fail_bloom: false,
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} needs a value\n{USAGE}"))
            };
            match arg.as_str() {
                "--frames" => {
                    let raw = value("--frames")?;
                    options.frames = raw
                        .parse()
                        .with_context(|| format!("invalid frame count {raw:?}"))?;
                }
                "--size" => options.size = parse_size(&value("--size")?)?,
                "--shape" => {
                    let shape = value("--shape")?.parse::<ShapeKind>()?;
                    options.shape = Some(shape);
                }
                "--color" => options.color = Some(value("--color")?),
                "--zoom" => {
                    let raw = value("--zoom")?;
                    let delta = raw
                        .parse()
                        .with_context(|| format!("invalid zoom delta {raw:?}"))?;
                    options.zoom = Some(delta);
                }
                "--resize-at" => {
                    let raw = value("--resize-at")?;
                    let (frame, size) = raw
                        .split_once(':')
                        .ok_or_else(|| anyhow!("expected F:WxH, got {raw:?}"))?;
                    let frame = frame
                        .parse()
                        .with_context(|| format!("invalid frame index {frame:?}"))?;
                    options.resizes.push((frame, parse_size(size)?));
                }
                "--settings" => options.settings = Some(PathBuf::from(value("--settings")?)),
                "--shaders" => options.shaders = Some(PathBuf::from(value("--shaders")?)),
                "--fail-bloom" => options.fail_bloom = true,
                other => bail!("Unknown argument: {other}\n{USAGE}"),
            }
        }
        Ok(options)
    }
}

fn parse_size(raw: &str) -> Result<(u32, u32)> {
    let parsed = raw
        .split_once(['x', 'X'])
        .and_then(|(w, h)| Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?)));
    match parsed {
        Some((width, height)) if width > 0 && height > 0 => Ok((width, height)),
        _ => Err(anyhow!("invalid size {raw:?}, expected WxH")),
    }
}
