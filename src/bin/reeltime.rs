use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "reeltime", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print duration, start time and video layout of a timeline.
    Info(InfoArgs),
    /// Decode one frame, flatten its layers and write a PNG.
    Frame(FrameArgs),
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Composition JSON or a media file.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Composition JSON or a media file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Frame index, counted from the timeline's global start.
    #[arg(long)]
    frame: i64,

    /// Video layer passed to the readers.
    #[arg(long, default_value_t = 0)]
    layer: u16,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// How long to wait for the frame.
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Info(args) => cmd_info(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &std::path::Path) -> anyhow::Result<reeltime::Timeline> {
    reeltime::Timeline::from_path(path, reeltime::Context::default())
        .with_context(|| format!("open timeline '{}'", path.display()))
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let timeline = open(&args.in_path)?;
    let comp = timeline.composition();
    println!("name: {}", comp.name);
    println!("duration: {}", timeline.duration());
    println!("global start: {}", timeline.global_start_time());
    println!("range: {}", timeline.time_range());
    println!("tracks: {}", comp.tracks.len());
    println!("clips: {}", comp.clips().count());
    let video = timeline.video_info();
    if video.is_empty() {
        println!("video: none");
    }
    for (i, info) in video.iter().enumerate() {
        println!(
            "video {i}: {}x{} {:?}",
            info.width, info.height, info.pixel_type
        );
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let timeline = open(&args.in_path)?;
    let start = timeline.global_start_time();
    let time = start + reeltime::RationalTime::new(args.frame as f64, start.rate);
    timeline.set_active_ranges(vec![reeltime::TimeRange::new(
        time,
        reeltime::RationalTime::new(1.0, start.rate),
    )]);

    let future = timeline.get_frame(time, args.layer, None);
    if !future.wait_for(Duration::from_millis(args.timeout_ms)) {
        anyhow::bail!("frame {} not ready after {} ms", args.frame, args.timeout_ms);
    }
    let frame = future
        .wait()
        .with_context(|| format!("frame {} was abandoned", args.frame))?;

    let image = reeltime::flatten(&frame)?
        .with_context(|| format!("frame {} at {time} has no image", args.frame))?;
    let rgba = reeltime::to_rgba_image(&image)?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    rgba.save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
