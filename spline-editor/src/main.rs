use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use kurbo::Size;
use spline_core::controller::DocumentController;
use spline_core::file_io::{self, DocumentRepository};
use std::path::PathBuf;

mod config;
use config::AppConfig;

/// Spline - headless tool for Spline drawing documents
#[derive(Parser, Debug)]
#[command(name = "Spline")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Documents directory (overrides the configured one)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored documents
    List,

    /// List recently opened documents
    Recent {
        /// Forget the recent documents instead of listing them
        #[arg(long)]
        clear: bool,
    },

    /// Create an empty document
    New {
        /// Document name; ".json" is added when it has no extension
        #[arg(default_value = "")]
        name: String,
    },

    /// Print a document's layer list
    Info {
        name: String,

        /// Show collapsed groups' children too
        #[arg(long)]
        expand: bool,
    },

    /// Add shapes to a document and save it
    Add {
        name: String,

        #[arg(value_enum)]
        shape: ShapeArg,

        /// How many shapes to add
        #[arg(long, default_value_t = 1)]
        count: usize,

        /// Canvas size used to centre new shapes, as WIDTHxHEIGHT
        #[arg(long, default_value = "1280x800", value_parser = parse_size)]
        canvas: Size,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShapeArg {
    Rect,
    Oval,
    Triangle,
}

fn parse_size(text: &str) -> Result<Size, String> {
    let (w, h) = text
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {text:?}"))?;
    let width: f64 = w.trim().parse().map_err(|e| format!("bad width {w:?}: {e}"))?;
    let height: f64 = h.trim().parse().map_err(|e| format!("bad height {h:?}: {e}"))?;
    Ok(Size::new(width, height))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = AppConfig::load();
    let dir = args.dir.clone().unwrap_or_else(|| config.documents_dir());
    let repository = DocumentRepository::new(&dir);
    log::debug!("documents directory: {}", dir.display());

    match args.command {
        Command::List => {
            if !dir.exists() {
                return Ok(());
            }
            for name in repository.list().context("listing documents")? {
                println!("{}\t{}", file_io::pretty_name(&name), name);
            }
        }
        Command::Recent { clear: true } => {
            if config.clear_recent_documents() {
                config.save();
            }
        }
        Command::Recent { clear: false } => {
            for name in config.recent_documents_in(&dir) {
                println!("{name}");
            }
        }
        Command::New { name } => {
            let name = repository
                .create(&name)
                .with_context(|| format!("creating document {name:?}"))?;
            config.add_recent_document(&name);
            println!("{}", repository.path(&name).display());
        }
        Command::Info { name, expand } => {
            let mut controller =
                DocumentController::new(repository, name.as_str(), config.interaction.clone());
            controller
                .load()
                .with_context(|| format!("opening document {name:?}"))?;
            config.add_recent_document(&name);
            print_layers(&mut controller, expand);
        }
        Command::Add {
            name,
            shape,
            count,
            canvas,
        } => {
            let name = file_io::normalize_name(&name);
            let mut controller =
                DocumentController::new(repository, name.as_str(), config.interaction.clone());
            controller.open(name.as_str());
            controller.set_viewport_size(canvas);

            for _ in 0..count {
                let id = match shape {
                    ShapeArg::Rect => controller.add_rect(),
                    ShapeArg::Oval => controller.add_oval(),
                    ShapeArg::Triangle => controller.add_triangle(),
                }
                .context("adding shape")?;
                log::info!("added layer {id}");
            }

            controller
                .close()
                .with_context(|| format!("saving document {name:?}"))?;
            config.add_recent_document(&name);
        }
    }

    Ok(())
}

fn print_layers(controller: &mut DocumentController, expand: bool) {
    if expand {
        let tree = controller.document_mut().tree_mut();
        let root = tree.root();
        for id in tree.descendants(&root) {
            tree.open_expanded(&id);
        }
    }

    let document = controller.document();
    println!(
        "{} (viewport {}, {})",
        controller.pretty_name(),
        document.viewport().x,
        document.viewport().y
    );

    for row in controller.layer_list() {
        let marker = if row.selected { '*' } else { ' ' };
        let hidden = if row.visible && row.ancestors_visible { "" } else { " (hidden)" };
        let frame = document
            .tree()
            .bounds(&row.id)
            .map(|f| format!("{} {} {}x{}", f.x, f.y, f.width, f.height))
            .unwrap_or_else(|| "empty".to_string());
        println!(
            "{marker} {:indent$}{}  [{}]{}",
            "",
            row.name,
            frame,
            hidden,
            indent = row.indent * 2
        );
    }
}
