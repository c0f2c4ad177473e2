//! swf-cli - Tool for inspecting and exporting SWF scene documents.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use swf_scene::dict::{EntryKind, EntryPayload};
use swf_scene::export::{export_svg, ExportOptions, ExportStats};
use swf_scene::playback::{DrawCommand, Timeline};
use swf_scene::Document;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        "info" | "i" => required(&filtered_args, 1, "swf-cli info <doc.json>").and_then(cmd_info),
        "dict" | "d" => required(&filtered_args, 1, "swf-cli dict <doc.json>").and_then(cmd_dict),
        "dump" => required(&filtered_args, 1, "swf-cli dump <doc.json> [sprite_id] [--frame N]")
            .and_then(|doc| cmd_dump(doc, &filtered_args[2..])),
        "export" | "e" => {
            if filtered_args.len() < 3 {
                usage("swf-cli export <doc.json> <out.svg> [--frame N] [--config opts.json]")
            } else {
                cmd_export(filtered_args[1], filtered_args[2], &filtered_args[3..])
            }
        }
        "batch" | "b" => {
            if filtered_args.len() < 3 {
                usage("swf-cli batch <out_dir> <doc.json>...")
            } else {
                cmd_batch(filtered_args[1], &filtered_args[2..])
            }
        }
        "play" | "p" => required(&filtered_args, 1, "swf-cli play <doc.json> [--frames N]")
            .and_then(|doc| cmd_play(doc, &filtered_args[2..])),
        "--version" | "-V" | "version" => {
            println!(
                "swf-cli {} (built {} {})",
                env!("CARGO_PKG_VERSION"),
                env!("SWF_BUILD_DATE"),
                env!("SWF_BUILD_TIME")
            );
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }
        // Default: if file exists, show info; otherwise error
        other => {
            if Path::new(other).exists() {
                cmd_info(other)
            } else {
                eprintln!("Unknown command: {}", other);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn required<'a>(args: &[&'a str], index: usize, usage_line: &str) -> Result<&'a str> {
    match args.get(index) {
        Some(arg) => Ok(*arg),
        None => usage(usage_line).map(|_| ""),
    }
}

fn usage(line: &str) -> Result<()> {
    bail!("missing arguments\nUsage: {}", line)
}

/// Value following `flag`, parsed.
fn flag_value<T: std::str::FromStr>(args: &[&str], flag: &str) -> Result<Option<T>> {
    let Some(pos) = args.iter().position(|&a| a == flag) else {
        return Ok(None);
    };
    let raw = args.get(pos + 1).with_context(|| format!("{} needs a value", flag))?;
    raw.parse().map(Some).map_err(|_| anyhow::anyhow!("invalid value for {}: {}", flag, raw))
}

/// Arguments that are neither flags nor flag values.
fn positional<'a>(args: &[&'a str], flags: &[&str]) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut skip = false;
    for &arg in args {
        if skip {
            skip = false;
        } else if flags.contains(&arg) {
            skip = true;
        } else {
            out.push(arg);
        }
    }
    out
}

fn load(path: &str) -> Result<Document> {
    tracing::info!("Opening document: {}", path);
    Document::load(path).with_context(|| format!("failed to load {}", path))
}

fn print_help() {
    println!("swf-cli - SWF scene toolkit");
    println!();
    println!("USAGE:");
    println!("    swf-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info   <doc>                         Show header and dictionary counts");
    println!("    d, dict   <doc>                         List dictionary entries");
    println!("    dump      <doc> [sprite] [--frame N]    Decode timeline commands");
    println!("    e, export <doc> <out.svg> [--frame N] [--config opts.json]");
    println!("                                            Export one frame as SVG");
    println!("    b, batch  <out_dir> <doc>...            Export many documents in parallel");
    println!("    p, play   <doc> [--frames N]            Step the main timeline, print draw calls");
    println!("    h, help                                 Show this help");
    println!("    --version                               Show version and build date");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Errors only");
    println!();
    println!("EXAMPLES:");
    println!("    swf-cli info movie.json                 # Quick overview");
    println!("    swf-cli dump movie.json 12 --frame 3    # Commands of sprite 12, frame 3");
    println!("    swf-cli export movie.json movie.svg     # First frame to SVG");
    println!("    swf-cli batch out/ a.json b.json        # Parallel export");
    println!();
    println!("NOTES:");
    println!("    - Passing a document directly is equivalent to 'info'");
    println!("    - RUST_LOG overrides the verbosity flags");
}

fn cmd_info(path: &str) -> Result<()> {
    let doc = load(path)?;
    let counts = doc.dictionary.counts();

    println!("Document: {}", path);
    println!("Version:  {}", doc.version);
    println!("Stage:    {} x {} px", doc.frame_width, doc.frame_height);
    println!("Rate:     {} fps", doc.frame_rate);
    println!("Frames:   {} ({:.2}s)", doc.main.frame_count, doc.duration());
    println!("Commands: {}", doc.main.num_commands());
    println!();
    println!("Dictionary ({} slots):", doc.dictionary.slot_count());
    for kind in EntryKind::ALL {
        let n = counts.get(kind);
        if n > 0 {
            println!("  {:<10} {}", format!("{}:", kind), n);
        }
    }
    println!();
    println!("Total entries: {}", counts.total());

    let cyclic = doc.sprite_graph()?.cyclic_sprites();
    if !cyclic.is_empty() {
        println!("Self-referencing sprites: {:?}", cyclic);
    }
    Ok(())
}

fn cmd_dict(path: &str) -> Result<()> {
    let doc = load(path)?;
    for entry in doc.dictionary.entries() {
        let detail = match &entry.payload {
            EntryPayload::Shape(s) | EntryPayload::Morph(s) => {
                format!("{} fills, {} lines, bounds {:?}", s.fill_draws.len(), s.line_draws.len(), s.start_bounds)
            }
            EntryPayload::Sprite(s) => format!("{} frames, {} commands", s.frame_count, s.num_commands()),
            EntryPayload::Font(f) => format!("'{}', {} glyphs", f.name, f.glyph_codes.len()),
            EntryPayload::Text(t) => format!("{} records", t.records.len()),
            EntryPayload::EditText(t) => format!("font {} size {} '{}'", t.font_id, t.font_size(), t.initial_text),
            EntryPayload::Bitmap(b) => format!("{} x {}", b.width, b.height),
        };
        println!("{:>5}  {:<9} {}", entry.id, entry.kind().name(), detail);
    }
    Ok(())
}

fn cmd_dump(path: &str, rest: &[&str]) -> Result<()> {
    let doc = load(path)?;
    let frame: Option<u32> = flag_value(rest, "--frame")?;
    let sprite_id = match positional(rest, &["--frame"]).first() {
        Some(raw) => Some(raw.parse::<u16>().with_context(|| format!("invalid sprite id: {}", raw))?),
        None => None,
    };
    let sprite = doc.timeline(sprite_id)?;
    let frames = match frame {
        Some(f) => f..f + 1,
        None => 0..sprite.frame_count,
    };

    for f in frames {
        println!("frame {}:", f);
        for (index, cmd) in sprite.frame_commands(f)? {
            match cmd.decode(&sprite.bytes, doc.version) {
                Ok(params) => println!("  [{}] {}", index, serde_json::to_string(&params)?),
                Err(e) => println!("  [{}] {} ({} bytes): {}", index, cmd.tag, cmd.len(), e),
            }
        }
    }
    Ok(())
}

fn export_options(rest: &[&str]) -> Result<ExportOptions> {
    let mut opts = match flag_value::<PathBuf>(rest, "--config")? {
        Some(cfg) => ExportOptions::load(&cfg).with_context(|| format!("failed to read {}", cfg.display()))?,
        None => ExportOptions::default(),
    };
    if let Some(frame) = flag_value(rest, "--frame")? {
        opts.frame = frame;
    }
    Ok(opts)
}

fn print_stats(stats: &ExportStats) {
    println!(
        "  groups: {} ({} shapes, {} morphs, {} sprites, {} texts, {} edit texts)",
        stats.total(),
        stats.shapes,
        stats.morphs,
        stats.sprites,
        stats.texts,
        stats.edit_texts
    );
    println!(
        "  placements: {} ({} skipped), filters: {}, images: {}, gradients: {}",
        stats.placements, stats.skipped_placements, stats.filters, stats.images, stats.gradients
    );
}

fn cmd_export(input: &str, output: &str, rest: &[&str]) -> Result<()> {
    let opts = export_options(rest)?;
    let doc = load(input)?;
    let start = Instant::now();
    let stats = export_svg(&doc, Path::new(output), &opts).with_context(|| format!("failed to export {}", output))?;
    println!("Exported {} -> {} in {:.1?}", input, output, start.elapsed());
    print_stats(&stats);
    Ok(())
}

fn cmd_batch(out_dir: &str, inputs: &[&str]) -> Result<()> {
    let out_dir = Path::new(out_dir);
    std::fs::create_dir_all(out_dir).with_context(|| format!("failed to create {}", out_dir.display()))?;
    let opts = ExportOptions::default();

    let results: Vec<(&str, Result<ExportStats>)> = inputs
        .par_iter()
        .map(|&input| {
            let stem = Path::new(input).file_stem().map(|s| s.to_os_string()).unwrap_or_else(|| "out".into());
            let output = out_dir.join(stem).with_extension("svg");
            let result = load(input).and_then(|doc| {
                export_svg(&doc, &output, &opts).with_context(|| format!("failed to export {}", output.display()))
            });
            (input, result)
        })
        .collect();

    let mut failed = 0;
    for (input, result) in &results {
        match result {
            Ok(stats) => println!("{}: {} groups, {} placements", input, stats.total(), stats.placements),
            Err(e) => {
                failed += 1;
                eprintln!("{}: {:#}", input, e);
            }
        }
    }
    println!("Exported {}/{} documents", results.len() - failed, results.len());
    if failed > 0 {
        bail!("{} document(s) failed", failed);
    }
    Ok(())
}

fn cmd_play(path: &str, rest: &[&str]) -> Result<()> {
    let doc = load(path)?;
    if doc.main.frame_count == 0 {
        println!("Main timeline is empty");
        return Ok(());
    }
    let frames: u32 = flag_value(rest, "--frames")?.unwrap_or(doc.main.frame_count);

    let mut timeline = Timeline::new(&doc);
    for _ in 0..frames {
        let frame = timeline.advance()?;
        let draws = timeline.draw_list();
        let (mut meshes, mut lines, mut texts) = (0, 0, 0);
        for draw in &draws {
            match draw {
                DrawCommand::Mesh { .. } => meshes += 1,
                DrawCommand::Lines { .. } => lines += 1,
                DrawCommand::Text { .. } => texts += 1,
            }
        }
        println!(
            "frame {:>4}: {} objects, {} meshes, {} line strips, {} text runs",
            frame,
            timeline.display_list().len(),
            meshes,
            lines,
            texts
        );
    }
    Ok(())
}
