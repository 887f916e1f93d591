use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reedline::{DefaultPrompt, Prompt, Reedline, Signal};
use vplotter_geom::{Axis, MachineGeometry};
use vplotter_motion::{sim::Recorder, MotionController};

use crate::script::Cmd;

mod illustrate;
mod script;

type Controller = MotionController<Recorder>;

const PROGRESS_TEMPLATE: &str = "{wide_bar} {pos}/{len} {msg}";

/// Runs drawing commands on a simulated v-plotter.
#[derive(Parser)]
struct Args {
    /// A file of commands. Without one, commands are read from a prompt.
    script: Option<PathBuf>,

    /// Machine geometry, as JSON.
    #[arg(long)]
    geometry: Option<PathBuf>,

    /// Where to draw a picture of what the pen did.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Feed rate for moves that don't specify one, in mm/min.
    #[arg(long, default_value_t = 1000.0)]
    feed: f64,
}

fn load_geometry(path: Option<&Path>) -> anyhow::Result<MachineGeometry> {
    let Some(path) = path else {
        return Ok(MachineGeometry::default());
    };
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let geom = serde_json::from_str(&data)
        .with_context(|| format!("invalid geometry in {}", path.display()))?;
    log::info!("loaded geometry from {}", path.display());
    Ok(geom)
}

fn run(ctrl: &mut Controller, cmd: Cmd, default_feed: f64) -> anyhow::Result<()> {
    match cmd {
        Cmd::MoveTo { x, y, feed } => ctrl.move_to(x, y, feed.unwrap_or(default_feed))?,
        Cmd::PenUp => ctrl.pen_up()?,
        Cmd::PenDown => ctrl.pen_down()?,
        Cmd::Quit => {}
    }
    Ok(())
}

fn send_file(ctrl: &mut Controller, path: &Path, feed: f64) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mut cmds = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let cmd = script::parse_line(line)
            .with_context(|| format!("{}, line {}", path.display(), idx + 1))?;
        cmds.extend(cmd);
    }

    let bar = ProgressBar::new(cmds.len() as u64)
        .with_style(ProgressStyle::with_template(PROGRESS_TEMPLATE)?);
    for cmd in cmds {
        if cmd == Cmd::Quit {
            break;
        }
        run(ctrl, cmd, feed)?;
        bar.inc(1);
    }
    bar.finish_with_message("done!");
    Ok(())
}

fn read_cmd(reed: &mut Reedline, prompt: &dyn Prompt) -> anyhow::Result<Option<String>> {
    match reed.read_line(prompt)? {
        Signal::Success(s) => Ok(Some(s)),
        Signal::CtrlC | Signal::CtrlD => Ok(None),
    }
}

fn command_mode(ctrl: &mut Controller, feed: f64) -> anyhow::Result<()> {
    let mut reed = Reedline::create();
    let prompt = DefaultPrompt::default();
    while let Some(line) = read_cmd(&mut reed, &prompt)? {
        match script::parse_line(&line) {
            Ok(None) => {}
            Ok(Some(Cmd::Quit)) => break,
            Ok(Some(cmd)) => {
                run(ctrl, cmd, feed)?;
                let pos = ctrl.position();
                eprintln!("at ({:.2}, {:.2})", pos.x, pos.y);
            }
            Err(e) => eprintln!("error: {e}"),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    let geometry = load_geometry(args.geometry.as_deref())?;
    let mut ctrl = MotionController::initialize(geometry, Recorder::default())?;

    if let Some(path) = &args.script {
        send_file(&mut ctrl, path, args.feed)?;
    } else {
        command_mode(&mut ctrl, args.feed)?;
    }

    let rec = ctrl.actuator();
    eprintln!(
        "{} left steps, {} right steps, {:.1}s",
        rec.steps(Axis::Left),
        rec.steps(Axis::Right),
        rec.elapsed_us as f64 / 1e6
    );

    if let Some(out) = &args.svg {
        let paths = illustrate::pen_paths(ctrl.geometry(), ctrl.pen_config(), &rec.events);
        illustrate::write_svg(out, ctrl.geometry(), &paths)?;
        eprintln!("wrote {}", out.display());
    }

    Ok(())
}
