use std::io::{self, Read};

use clap::{CommandFactory, Parser};
use colored::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use thought_lens::cli::{Args, OutputFormat};
use thought_lens::render::{self, ParsedReasoning};
use thought_lens::voice::{FileSink, NoticeLevel, PlaybackController, PlaybackEvent, SpeechClient};
use thought_lens::{Explorer, LensConfig, ViewMode};

fn read_input(args: &Args) -> io::Result<String> {
    match &args.input {
        Some(path) if !args.reads_stdin() => std::fs::read_to_string(path),
        _ => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn print_view(args: &Args, explorer: &mut Explorer) -> thought_lens::Result<()> {
    // The terminal tree has no way to expand later.
    if explorer.mode() == ViewMode::Tree {
        explorer.expand_all();
    }
    let points = explorer.timeline().unwrap_or(&[]);
    match args.format {
        OutputFormat::Json => {
            let parsed = ParsedReasoning { timeline: points, tree: explorer.tree() };
            println!("{}", render::to_json(&parsed)?);
        }
        OutputFormat::Svg => {
            if args.view == ViewMode::Tree {
                eprintln!("{}", "  SVG output draws the timeline; ignoring --view tree".yellow());
            }
            print!("{}", render::render_timeline_svg(points, args.svg_layout()));
        }
        OutputFormat::Text => match explorer.mode() {
            ViewMode::Tree => match explorer.tree() {
                Some(root) => print!("{}", render::render_tree(root, explorer.expanded())),
                None => eprintln!("{}", "  No thought tree could be built.".red()),
            },
            ViewMode::Timeline | ViewMode::Graph => print!("{}", render::render_timeline(points)),
        },
    }
    Ok(())
}

async fn speak(args: &Args, config: &LensConfig, text: &str) -> thought_lens::Result<()> {
    let client = SpeechClient::new(&config.voice)?;
    let mut player = PlaybackController::new(FileSink::new(&args.audio_out));
    player.subscribe(|event| {
        if let PlaybackEvent::Notice(n) = event {
            let line = format!("  {}: {}", n.title, n.message);
            match n.level {
                NoticeLevel::Error => eprintln!("{}", line.red()),
                NoticeLevel::Warning => eprintln!("{}", line.yellow()),
                NoticeLevel::Info => eprintln!("{}", line),
            }
        }
    });
    player.set_text(text);

    eprintln!("{}", format!("  Synthesizing speech via {}", client.endpoint()).bright_blue());
    player.speak_once(&client).await?;
    eprintln!(
        "{}",
        format!("  Audio written to {}", player.sink().path().display()).bright_green()
    );
    player.ended();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "thought-lens", &mut io::stdout());
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let config = args.resolve_config()?;

    // Web view mode
    if args.web {
        thought_lens::web::serve(args.port, &config).await?;
        return Ok(());
    }

    let text = read_input(&args)?;
    info!(bytes = text.len(), view = %args.view, "parsing input");

    let mut explorer = Explorer::new(&config);
    explorer.set_mode(args.view);
    explorer.set_content(text.as_str(), 0);
    explorer.flush();
    if let Some(e) = explorer.take_error() {
        return Err(e.into());
    }
    print_view(&args, &mut explorer)?;

    if args.speak {
        speak(&args, &config, &text).await?;
    }

    Ok(())
}
