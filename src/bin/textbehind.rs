use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use textbehind::{
    BackgroundRemover, CommandRemover, EditorSession, FileCutout, FileSink, FontBook,
    ImageSource, RemovalStatus, SceneDef,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "textbehind", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene to a PNG with the text placed behind the subject.
    Render(RenderArgs),
    /// Print where each layer lands in the preview and in the output image.
    Layout(LayoutArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Precomputed cutout image; overrides the scene's `cutout`.
    #[arg(long, conflicts_with = "remover_cmd")]
    cutout: Option<PathBuf>,

    /// Background-removal program. `{input}`/`{output}` in its arguments become file paths.
    #[arg(long)]
    remover_cmd: Option<String>,

    /// Argument passed to the removal program (repeatable).
    #[arg(long = "remover-arg", allow_hyphen_values = true)]
    remover_args: Vec<String>,

    /// Extra font file to register (repeatable).
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Draw blurred text shadows.
    #[arg(long)]
    shadows: bool,
}

#[derive(Parser, Debug)]
struct LayoutArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Layout(args) => cmd_layout(args),
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_fonts(scene: &SceneDef, extra: &[PathBuf]) -> anyhow::Result<FontBook> {
    let mut fonts = FontBook::new();
    for path in scene.fonts.iter().chain(extra) {
        fonts
            .register_file(path)
            .with_context(|| format!("register font '{}'", path.display()))?;
    }
    if fonts.is_empty() {
        tracing::warn!("no fonts registered; layers with text cannot be drawn");
    }
    Ok(fonts)
}

fn make_remover(args: &RenderArgs, scene: &SceneDef) -> Option<Arc<dyn BackgroundRemover>> {
    if let Some(program) = &args.remover_cmd {
        if !program.contains(std::path::MAIN_SEPARATOR) && !textbehind::is_program_on_path(program)
        {
            tracing::warn!(program = %program, "removal program not found on PATH");
        }
        return Some(Arc::new(CommandRemover::new(
            program.clone(),
            args.remover_args.clone(),
        )));
    }
    args.cutout
        .clone()
        .or_else(|| scene.cutout.clone())
        .map(|p| Arc::new(FileCutout::new(p)) as Arc<dyn BackgroundRemover>)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let scene = SceneDef::from_path(&args.scene)?;
    let fonts = load_fonts(&scene, &args.fonts)?;

    let mut opts = scene.editor.clone();
    if args.shadows {
        opts.compositor.render_shadows = true;
    }
    let mut session = EditorSession::new(opts, fonts);

    let remover = make_remover(&args, &scene);
    session
        .load_image(ImageSource::path(&scene.source), remover)
        .with_context(|| format!("load source image '{}'", scene.source.display()))?;
    scene.apply_layers(&mut session)?;

    if let RemovalStatus::Failed { message, .. } = session.wait_removal() {
        eprintln!("warning: continuing without cutout: {message}");
    }

    let mut sink = FileSink::at_path(&args.out);
    let out = session.export(Some(scene.preview), &mut sink)?;
    println!(
        "wrote {} ({}x{}, {} bytes)",
        args.out.display(),
        out.width,
        out.height,
        out.bytes.len()
    );
    Ok(())
}

fn cmd_layout(args: LayoutArgs) -> anyhow::Result<()> {
    let scene = SceneDef::from_path(&args.scene)?;
    let mut session = EditorSession::new(scene.editor.clone(), FontBook::new());
    let pair = session
        .load_image(ImageSource::path(&scene.source), None)
        .with_context(|| format!("load source image '{}'", scene.source.display()))?;
    scene.apply_layers(&mut session)?;

    let output = session
        .image()
        .filter(|p| p.id == pair)
        .context("source image missing after load")?
        .output_size()?;
    let report = serde_json::json!({
        "output": output,
        "preview": scene.preview,
        "fit": textbehind::ContainFit::new(scene.preview, output),
        "layers": session.placements(scene.preview)?,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
