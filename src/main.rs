use clap::{Args, Parser, Subcommand};
use retouch::config::{self, EditorConfig};
use retouch::editor::{Editor, EditorError, EditorEvent, Upload};
use retouch::imaging::{Filter, Mask};
use retouch::output;
use retouch::services::{ApiKey, FalInpainter, RemoveBgClient};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retouch")]
#[command(about = "Rotate, flip, resize, filter and export a single image")]
#[command(long_about = "\
Rotate, flip, resize, filter and export a single image

Edits are recorded as parameters and only rendered on export, so the
original can always be restored. Exports are PNG files named
<prefix><input name> (prefix \"edited-\" by default).

Examples:

  retouch edit photo.jpg --rotate 90 --filter sepia --intensity 80
  retouch edit photo.jpg --width 800 --flip-h --output out/
  retouch remove-bg photo.jpg --api-key $REMOVE_BG_KEY
  retouch inpaint photo.jpg --mask mask.png --prompt \"a red balloon\" --api-key $FAL_KEY

Diagnostics go to stderr; set RETOUCH_LOG (e.g. RETOUCH_LOG=debug) to
control them. Run 'retouch gen-config' to generate a documented retouch.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./retouch.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug diagnostics
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Where exports are written.
#[derive(Args, Clone)]
struct OutputArgs {
    /// Directory for the exported PNG
    #[arg(long, short, default_value = ".")]
    output: PathBuf,
}

#[derive(Args)]
struct EditArgs {
    /// Image to edit
    input: PathBuf,

    /// Resize to exact dimensions, e.g. 800x600
    #[arg(long, value_parser = parse_size, conflicts_with_all = ["width", "height"])]
    resize: Option<(u32, u32)>,

    /// Resize to a width, keeping the aspect ratio
    #[arg(long, conflicts_with = "height")]
    width: Option<u32>,

    /// Resize to a height, keeping the aspect ratio
    #[arg(long)]
    height: Option<u32>,

    /// Rotate by degrees (repeatable, negative is counter-clockwise)
    #[arg(long, allow_negative_numbers = true)]
    rotate: Vec<i32>,

    /// Flip horizontally
    #[arg(long)]
    flip_h: bool,

    /// Flip vertically
    #[arg(long)]
    flip_v: bool,

    /// Filter: none, grayscale, sepia, blur, brightness, contrast, saturate, invert
    #[arg(long)]
    filter: Option<Filter>,

    /// Filter intensity in percent (0-100)
    #[arg(long, allow_negative_numbers = true)]
    intensity: Option<i32>,

    /// Reset to the original after the other edits
    #[arg(long)]
    reset: bool,

    /// Print the live preview description instead of only exporting
    #[arg(long)]
    preview: bool,

    #[command(flatten)]
    out: OutputArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Apply edits to an image and export it
    Edit(EditArgs),
    /// Remove the background with remove.bg and export the result
    RemoveBg {
        input: PathBuf,
        /// remove.bg API key
        #[arg(long)]
        api_key: String,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// Regenerate a masked region with fal.ai and export the result
    Inpaint {
        input: PathBuf,
        /// Mask image, same size as the input; non-black pixels are regenerated
        #[arg(long)]
        mask: PathBuf,
        /// What to paint into the masked region
        #[arg(long)]
        prompt: String,
        /// fal.ai API key
        #[arg(long)]
        api_key: String,
        #[command(flatten)]
        out: OutputArgs,
    },
    /// List filters and supported input formats
    Filters,
    /// Print a stock retouch.toml with all options documented
    GenConfig,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid dimension '{v}': {e}"))
    };
    Ok((parse(w)?, parse(h)?))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        Command::Filters => {
            output::print_capabilities();
            return Ok(());
        }
        _ => {}
    }

    let cwd = std::env::current_dir()?;
    let config = config::load_config(cli.config.as_deref(), &cwd)?;
    init_thread_pool(&config.processing);

    let (tx, rx) = mpsc::channel();
    let printer = thread::spawn(move || {
        for event in rx {
            output::print_event(&event);
        }
    });
    // The session owns the sender; the printer ends once `run` returns.
    let result = run(cli.command, config, tx);
    if printer.join().is_err() {
        return Err("event printer panicked".into());
    }

    match result {
        Ok(summary) => {
            for line in summary {
                println!("{line}");
            }
            Ok(())
        }
        // Already shown to the user as a failure event
        Err(err) if err.is::<EditorError>() => std::process::exit(1),
        Err(err) => Err(err),
    }
}

/// Run one session. Returns summary lines, printed once every event has been.
fn run(
    command: Command,
    config: EditorConfig,
    tx: Sender<EditorEvent>,
) -> Result<Vec<String>, Box<dyn Error>> {
    let max_bytes = config.upload.max_bytes;
    let mut summary = Vec::new();
    match command {
        Command::Edit(args) => {
            let mut editor = Editor::new(config).with_events(tx);
            editor.upload(Upload::from_path(&args.input, max_bytes)?)?;
            apply_edits(&mut editor, &args)?;
            summary.extend(output::format_document(editor.document()));
            if args.preview {
                if let Some(style) = editor.preview() {
                    summary.extend(output::format_preview(&style));
                }
            }
            export(&editor, &args.out.output)?;
        }
        Command::RemoveBg {
            input,
            api_key,
            out,
        } => {
            let settings = &config.services;
            let remover = RemoveBgClient::new(
                settings.remove_bg.endpoint.clone(),
                settings.remove_bg.size.clone(),
                settings.timeout(),
            );
            let mut editor = Editor::new(config).with_events(tx);
            editor.upload(Upload::from_path(&input, max_bytes)?)?;
            editor.remove_background(&remover, &ApiKey::new(api_key))?;
            export(&editor, &out.output)?;
        }
        Command::Inpaint {
            input,
            mask,
            prompt,
            api_key,
            out,
        } => {
            let settings = &config.services;
            let inpainter =
                FalInpainter::new(settings.inpaint.endpoint.clone(), settings.timeout());
            let mask = Mask::from_encoded(&std::fs::read(&mask)?)?;
            let mut editor = Editor::new(config).with_events(tx);
            editor.upload(Upload::from_path(&input, max_bytes)?)?;
            editor.fill_masked(&inpainter, &mask, &prompt, &ApiKey::new(api_key))?;
            export(&editor, &out.output)?;
        }
        Command::Filters | Command::GenConfig => {}
    }
    Ok(summary)
}

/// Apply edit flags in a fixed order: resize, rotate, flip, filter,
/// intensity, reset.
fn apply_edits(editor: &mut Editor, args: &EditArgs) -> Result<(), EditorError> {
    if let Some((width, height)) = args.resize {
        editor.resize(width, height)?;
    } else if let Some(width) = args.width {
        editor.resize_to_width(width)?;
    } else if let Some(height) = args.height {
        editor.resize_to_height(height)?;
    }
    for &degrees in &args.rotate {
        editor.rotate(degrees)?;
    }
    if args.flip_h {
        editor.flip_horizontal()?;
    }
    if args.flip_v {
        editor.flip_vertical()?;
    }
    if let Some(filter) = args.filter {
        editor.apply_filter(filter)?;
    }
    if let Some(percent) = args.intensity {
        editor.set_filter_intensity(percent)?;
    }
    if args.reset {
        editor.reset_to_original()?;
    }
    Ok(())
}

fn export(editor: &Editor, dir: &Path) -> Result<(), EditorError> {
    let path = editor.export_to(dir)?;
    tracing::info!(path = %path.display(), "export written");
    Ok(())
}

/// Diagnostics to stderr. `--verbose` wins over `RETOUCH_LOG`.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("retouch=debug")
    } else {
        EnvFilter::try_from_env("RETOUCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
