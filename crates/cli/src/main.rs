//! Waypoint CLI - terminal demo of the navigation progress indicators.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use waypoint_core::{EventKind, Location, Timings};
use waypoint_navigation::{
    ClickEvent, MemoryRouter, NavMenu, NavigationLoader, NavigationOutcome, TransitionLink, Window,
};
use waypoint_progress::{use_progress, Overlay, ProgressBar, ProgressProvider, Surface};

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Visual continuity for artificially slow page transitions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Timings file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the link delay
    #[arg(long, global = true)]
    link_delay_ms: Option<u64>,

    /// Override the progress duration
    #[arg(long, global = true)]
    progress_duration_ms: Option<u64>,

    /// Override the loader grace period
    #[arg(long, global = true)]
    grace_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Click a transition link and watch the progress overlay
    Link {
        /// Destination, e.g. /about
        href: String,
        /// Overwrite the current history entry
        #[arg(long)]
        replace: bool,
    },
    /// Run the artificially slow action
    Slow,
    /// Feed window events to a navigation loader
    Loader {
        /// Steps: visibility, hash, pop, unload, or wait:<ms>
        #[arg(required = true)]
        steps: Vec<String>,
    },
    /// Print the effective timings
    Timings,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_timings(cli: &Cli) -> Result<Timings> {
    let mut timings = match &cli.config {
        Some(path) => Timings::from_json_file(path)
            .with_context(|| format!("Failed to load timings from {}", path.display()))?,
        None => Timings::default(),
    };
    if let Some(ms) = cli.link_delay_ms {
        timings.link_delay_ms = ms;
    }
    if let Some(ms) = cli.progress_duration_ms {
        timings.progress_duration_ms = ms;
    }
    if let Some(ms) = cli.grace_ms {
        timings.loader_grace_ms = ms;
    }
    timings.validate()?;
    Ok(timings)
}

/// Draws the overlay on a single terminal line.
struct TerminalSurface {
    out: std::io::Stdout,
    showing: bool,
}

impl TerminalSurface {
    fn new() -> Self {
        Self {
            out: std::io::stdout(),
            showing: false,
        }
    }
}

impl Surface for TerminalSurface {
    fn draw(&mut self, frame: Option<&Overlay>) {
        let mut out = self.out.lock();
        // Terminal output is best effort.
        let _ = match frame {
            Some(overlay) => {
                self.showing = true;
                let filled = usize::from(overlay.value) / 2;
                write!(
                    out,
                    "\r[{}{}] {:>4}",
                    "#".repeat(filled),
                    " ".repeat(50 - filled),
                    overlay.label
                )
            }
            None if self.showing => {
                self.showing = false;
                writeln!(out, "\r{}", " ".repeat(58))
            }
            None => Ok(()),
        };
        let _ = out.flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let timings = load_timings(&cli)?;

    match &cli.command {
        Commands::Link { href, replace } => run_link(&timings, href, *replace).await?,
        Commands::Slow => run_slow(&timings).await?,
        Commands::Loader { steps } => run_loader(&timings, steps).await?,
        Commands::Timings => {
            println!("{}", serde_json::to_string_pretty(&timings)?);
        }
    }

    Ok(())
}

/// Render `bar` in the background until the returned token is cancelled.
fn spawn_renderer(bar: &ProgressBar) -> (CancellationToken, tokio::task::JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let handle = {
        let bar = bar.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut surface = TerminalSurface::new();
            bar.run(&mut surface, cancel).await;
        })
    };
    (cancel, handle)
}

async fn run_link(timings: &Timings, href: &str, replace: bool) -> Result<()> {
    let window = Window::new();
    let router = Arc::new(MemoryRouter::new(Location::root(), window.clone()));
    let provider = ProgressProvider::new(timings.clone());
    let ctx = provider.context();

    let bar = ProgressBar::new(&ctx, "progress-overlay")?;
    let loader = NavigationLoader::mount(window.clone(), router.clone(), timings);
    let menu = NavMenu::new(&ctx, router.clone(), timings)?;

    let link = match menu.links().iter().find(|l| l.href().as_str() == href) {
        Some(link) => link.clone(),
        None => TransitionLink::new(&ctx, router.clone(), href, timings)?,
    }
    .replace(replace);

    let labels: Vec<&str> = menu.links().iter().map(|l| l.text()).collect();
    println!("Menu: {}", labels.join(" | "));
    println!("Clicking \"{}\" -> {}", link.text(), link.href());

    let (cancel, renderer) = spawn_renderer(&bar);
    let outcome = link.activate(&mut ClickEvent::new()).await?;
    tokio::time::sleep(Duration::from_millis(timings.frame_interval_ms)).await;
    cancel.cancel();
    renderer.await?;

    match &outcome {
        NavigationOutcome::Pushed(location) => println!("Pushed {}", location),
        NavigationOutcome::Replaced(location) => println!("Replaced current entry with {}", location),
        NavigationOutcome::Failed(e) => println!("Navigation failed: {}", e),
    }

    println!("History ({} entries, cursor {})", router.len(), router.cursor());
    for (i, entry) in router.entries().iter().enumerate() {
        let marker = if i == router.cursor() { "*" } else { " " };
        println!("  {} {} ({})", marker, entry.location, entry.visited_at.to_rfc3339());
    }
    println!("Loader showing: {}", loader.is_loading());

    loader.unmount();
    Ok(())
}

async fn run_slow(timings: &Timings) -> Result<()> {
    let provider = ProgressProvider::new(timings.clone());
    let ctx = provider.context();
    let bar = ProgressBar::new(&ctx, "progress-overlay")?;
    let trigger = use_progress(&ctx)?;

    let (cancel, renderer) = spawn_renderer(&bar);
    let mut count = 0u32;
    let delay = timings.action_delay();
    count += trigger
        .track(async move {
            tokio::time::sleep(delay).await;
            1
        })
        .await;
    tokio::time::sleep(Duration::from_millis(timings.frame_interval_ms)).await;
    cancel.cancel();
    renderer.await?;

    info!("Slow action finished");
    println!("Count: {}", count);
    Ok(())
}

enum Step {
    Fire(EventKind),
    Wait(Duration),
}

fn parse_step(step: &str) -> Result<Step> {
    if let Some(ms) = step.strip_prefix("wait:") {
        let ms: u64 = ms
            .parse()
            .with_context(|| format!("Invalid wait duration in step `{}`", step))?;
        return Ok(Step::Wait(Duration::from_millis(ms)));
    }
    step.parse::<EventKind>()
        .map(Step::Fire)
        .map_err(|e| anyhow::anyhow!(e))
}

async fn run_loader(timings: &Timings, steps: &[String]) -> Result<()> {
    let steps = steps.iter().map(|s| parse_step(s)).collect::<Result<Vec<_>>>()?;

    let window = Window::new();
    let router = Arc::new(MemoryRouter::new(Location::root(), window.clone()));
    let loader = NavigationLoader::mount(window.clone(), router, timings);

    for step in steps {
        match step {
            Step::Fire(kind) => {
                window.dispatch(kind);
                println!("{:<16} loading={}", kind.as_str(), loader.is_loading());
            }
            Step::Wait(duration) => {
                tokio::time::sleep(duration).await;
                println!("{:<16} loading={}", format!("wait {}ms", duration.as_millis()), loader.is_loading());
            }
        }
    }

    if loader.render().is_some() {
        println!("Spinner still visible at exit");
    }
    loader.unmount();
    Ok(())
}
