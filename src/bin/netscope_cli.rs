//! netscope-cli: render update events to SVG without a browser.
//!
//! Reads the same JSON update events the training backend streams, runs them
//! through a `NetworkView` and writes the resulting scenes to disk.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use serde_json::json;
use tracing::{info, warn};

use netscope::prelude::*;

fn usage() -> ! {
    eprintln!("netscope-cli (renders training update events as SVG)");
    eprintln!("Usage: netscope-cli [--tier scalar|simd|parallel] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  render <event.json|-> [--out file.svg] [--no-weights]");
    eprintln!("         [--inspect <layer> <neuron> [--overlay file.svg]]");
    eprintln!("                               Render one event; optionally inspect a neuron");
    eprintln!("  grids <event.json|->         Print a per-layer receptive-field summary as JSON");
    eprintln!("  replay <events.jsonl> --out-dir <dir>");
    eprintln!("                               Render one SVG per weight update");
    process::exit(1);
}

fn parse_tier(s: &str) -> Option<ExecutionTier> {
    match s.trim().to_ascii_lowercase().as_str() {
        "scalar" => Some(ExecutionTier::Scalar),
        "simd" => Some(ExecutionTier::Simd),
        "parallel" => Some(ExecutionTier::Parallel),
        "auto" => Some(ExecutionTier::auto()),
        _ => None,
    }
}

fn parse_args() -> (ExecutionTier, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut tier = ExecutionTier::Scalar;
    if args.len() >= 2 && args[0] == "--tier" {
        tier = parse_tier(&args[1]).unwrap_or_else(|| usage());
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (tier, args)
}

fn read_input(path: &str) -> Result<String, String> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| format!("read stdin: {e}"))?;
        Ok(buf)
    } else {
        fs::read_to_string(path).map_err(|e| format!("read {path}: {e}"))
    }
}

fn write_output(path: &Path, contents: &str) -> Result<(), String> {
    fs::write(path, contents).map_err(|e| format!("write {}: {e}", path.display()))
}

fn load_event(path: &str) -> Result<UpdateEvent, String> {
    let text = read_input(path)?;
    UpdateEvent::from_json(&text).map_err(|e| e.to_string())
}

struct RenderArgs {
    input: String,
    out: PathBuf,
    draw_weights: bool,
    inspect: Option<NeuronHandle>,
    overlay: Option<PathBuf>,
}

fn parse_render(args: &[String]) -> Result<RenderArgs, String> {
    let input = args.first().cloned().ok_or("render needs an input file")?;
    let mut parsed = RenderArgs {
        input,
        out: PathBuf::from("network.svg"),
        draw_weights: true,
        inspect: None,
        overlay: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--out" => {
                let path = args.get(i + 1).ok_or("--out needs a path")?;
                parsed.out = PathBuf::from(path);
                i += 2;
            }
            "--no-weights" => {
                parsed.draw_weights = false;
                i += 1;
            }
            "--inspect" => {
                let layer = args
                    .get(i + 1)
                    .and_then(|s| s.parse::<usize>().ok())
                    .ok_or("--inspect needs <layer> <neuron>")?;
                let neuron = args
                    .get(i + 2)
                    .and_then(|s| s.parse::<usize>().ok())
                    .ok_or("--inspect needs <layer> <neuron>")?;
                parsed.inspect = Some(NeuronHandle::new(layer, neuron));
                i += 3;
            }
            "--overlay" => {
                let path = args.get(i + 1).ok_or("--overlay needs a path")?;
                parsed.overlay = Some(PathBuf::from(path));
                i += 2;
            }
            other => return Err(format!("unknown render option: {other}")),
        }
    }

    if parsed.overlay.is_some() && parsed.inspect.is_none() {
        return Err("--overlay requires --inspect".to_string());
    }
    Ok(parsed)
}

fn cmd_render(tier: ExecutionTier, args: &[String]) -> Result<(), String> {
    let args = parse_render(args)?;
    let event = load_event(&args.input)?;
    if !event.has_weights() {
        return Err(format!("{}: event carries no weights", args.input));
    }

    let config = ViewConfig::default()
        .with_tier(tier)
        .with_draw_weights(args.draw_weights)
        .with_trigger(Trigger::Click);
    let mut view = NetworkView::new(config);
    view.apply_update(event);

    write_output(&args.out, &view.scene().to_svg())?;
    let stats = view.scene().stats();
    info!(
        path = %args.out.display(),
        rects = stats.rects,
        lines = stats.lines,
        circles = stats.circles,
        "diagram written"
    );

    if let Some(handle) = args.inspect {
        let node = view
            .scene()
            .node(handle)
            .ok_or_else(|| format!("no node for {handle}"))?;
        view.pointer_click(node.cx, node.cy);
        let overlay = view
            .overlay()
            .ok_or_else(|| format!("no receptive field for {handle}"))?;
        println!("{}", overlay.label());
        if let Some(path) = &args.overlay {
            write_output(path, &overlay.swatch().to_svg())?;
            info!(path = %path.display(), "overlay written");
        }
    }

    for line in view.status().lines() {
        println!("{line}");
    }
    Ok(())
}

fn cmd_grids(tier: ExecutionTier, args: &[String]) -> Result<(), String> {
    let input = args.first().ok_or("grids needs an input file")?;
    let event = load_event(input)?;
    let weights = event
        .weights
        .ok_or_else(|| format!("{input}: event carries no weights"))?;

    let grids = compute_layer_grids_with(&weights, tier);
    let layers: Vec<_> = grids
        .layers()
        .iter()
        .enumerate()
        .map(|(l, layer)| {
            let zero = layer.iter().filter(|g| g.is_zero()).count();
            let peaks: Vec<_> = layer
                .iter()
                .map(|g| g.peak().map(|(pixel, value)| json!({ "pixel": pixel, "value": value })))
                .collect();
            json!({
                "layer": l,
                "neurons": layer.len(),
                "zero_grids": zero,
                "peaks": peaks,
            })
        })
        .collect();
    let faults: Vec<_> = grids
        .faults()
        .iter()
        .map(|f| {
            json!({
                "layer": f.handle.layer,
                "neuron": f.handle.neuron,
                "fault": f.fault.to_string(),
            })
        })
        .collect();

    let summary = json!({
        "tier": format!("{:?}", tier.effective()),
        "layers": layers,
        "faults": faults,
    });
    let text = serde_json::to_string_pretty(&summary).map_err(|e| format!("serialize: {e}"))?;
    println!("{text}");
    Ok(())
}

fn cmd_replay(tier: ExecutionTier, args: &[String]) -> Result<(), String> {
    let input = args.first().ok_or("replay needs an input file")?;
    let out_dir = match args.get(1).map(String::as_str) {
        Some("--out-dir") => args.get(2).ok_or("--out-dir needs a directory")?,
        _ => return Err("replay needs --out-dir <dir>".to_string()),
    };
    let out_dir = PathBuf::from(out_dir);
    fs::create_dir_all(&out_dir).map_err(|e| format!("create {}: {e}", out_dir.display()))?;

    let text = read_input(input)?;
    let mut view = NetworkView::new(ViewConfig::default().with_tier(tier));
    let mut frames = 0usize;

    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let event = match UpdateEvent::from_json(line) {
            Ok(event) => event,
            Err(err) => {
                warn!(line = lineno + 1, %err, "skipping event");
                continue;
            }
        };
        if !view.apply_update(event) {
            continue;
        }

        let path = out_dir.join(format!("frame_{frames:05}.svg"));
        write_output(&path, &view.scene().to_svg())?;
        frames += 1;

        let status = view.status();
        info!(
            frame = frames,
            epoch = ?status.epoch,
            batch = ?status.batch,
            "frame written"
        );
    }

    for line in view.status().lines() {
        println!("{line}");
    }
    info!(frames, dir = %out_dir.display(), "replay finished");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let (tier, args) = parse_args();
    let cmd = args[0].as_str();
    let rest = &args[1..];

    let result = match cmd {
        "render" => cmd_render(tier, rest),
        "grids" => cmd_grids(tier, rest),
        "replay" => cmd_replay(tier, rest),
        _ => usage(),
    };

    if let Err(msg) = result {
        eprintln!("{msg}");
        process::exit(1);
    }
}
