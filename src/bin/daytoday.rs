use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use daytoday::config::Config;
use daytoday::host::ProgressHost;
use daytoday::render::{PercentStyle, RenderModel};
use daytoday::store::{JsonFileStore, Preferences, Theme};
use daytoday::{DateOnly, SystemClock};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "daytoday", version, about = "How far today is between two dates")]
struct Cli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    quiet: u8,

    /// Config file (default: platform config dir)
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Preferences file (default: platform data dir)
    #[arg(long = "store", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute once and print the result
    Show {
        #[arg(long, value_parser = parse_date)]
        start: Option<DateOnly>,
        #[arg(long, value_parser = parse_date)]
        today: Option<DateOnly>,
        #[arg(long, value_parser = parse_date)]
        end:   Option<DateOnly>,
        /// Switch to live mode before computing
        #[arg(long)]
        live:  bool,
        /// One-decimal percentage
        #[arg(long)]
        compact: bool,
        /// Print the render model as JSON
        #[arg(long)]
        json:  bool,
    },
    /// Follow the clock in live mode, printing on every tick
    Watch {
        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,
    },
    /// Show or change the colour theme
    Theme { action: Option<ThemeAction> },
    /// Show or change the persisted live flag
    Live { state: Option<Switch> },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ThemeAction {
    Light,
    Dark,
    Toggle,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

fn parse_date(s: &str) -> Result<DateOnly, String> {
    s.parse().map_err(|err| format!("{err}"))
}

fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }
    Ok(())
}

type Host = ProgressHost<JsonFileStore>;

fn open_host(cfg: &Config, store_override: Option<PathBuf>) -> anyhow::Result<Host> {
    let store_path = store_override
        .or_else(|| cfg.store_path())
        .context("no data directory on this platform; pass --store")?;
    info!(store = %store_path.display(), "opening preferences");

    let host = ProgressHost::new(
        cfg.calculator()?,
        Arc::new(SystemClock),
        Preferences::new(JsonFileStore::new(store_path)),
        cfg.tick_interval(),
    );
    Ok(host)
}

fn print_model(model: &RenderModel, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(model)?);
        return Ok(());
    }
    println!("{}% ({})", model.percent_text, model.mode);
    println!("{}", model.status_text);
    println!(
        "{} | {} | {}",
        model.start_label, model.today_label, model.end_label
    );
    println!("colour {}", model.color);
    Ok(())
}

fn render_or_explain(host: &Host, style: PercentStyle) -> anyhow::Result<RenderModel> {
    host.render(style).ok_or_else(|| {
        let inputs = host.inputs();
        anyhow!(
            "incomplete dates: start={:?} today={:?} end={:?}",
            inputs.start,
            inputs.today,
            inputs.end
        )
    })
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = Config::load(cli.config.as_deref())?;
    let mut host = open_host(&cfg, cli.store)?;
    host.restore(cfg.system_prefers_dark);

    match cli.command.unwrap_or(Command::Show {
        start:   None,
        today:   None,
        end:     None,
        live:    false,
        compact: false,
        json:    false,
    }) {
        Command::Show {
            start,
            today,
            end,
            live,
            compact,
            json,
        } => {
            let mut inputs = host.inputs().clone();
            if let Some(d) = start {
                inputs.start = d.to_string();
            }
            if let Some(d) = today {
                inputs.today = d.to_string();
            }
            if let Some(d) = end {
                inputs.end = d.to_string();
            }
            if start.is_some() || today.is_some() || end.is_some() {
                host.set_inputs(inputs);
            }
            if live {
                host.set_live(true);
            }

            let style = if compact { PercentStyle::Compact } else { cfg.percent_style };
            print_model(&render_or_explain(&host, style)?, json)?;
        },
        Command::Watch { ticks } => {
            if ticks == Some(0) {
                bail!("--ticks must be at least 1");
            }
            if !host.mode().is_live() {
                host.set_live(true);
            }
            if !host.is_ticking() {
                bail!("live ticker is not running");
            }

            let timeout = cfg.tick_interval().saturating_mul(10).max(Duration::from_secs(1));
            let mut seen = 0_u64;
            while ticks.is_none_or(|limit| seen < limit) {
                if host.wait_for_tick(timeout) {
                    seen += 1;
                    let model = render_or_explain(&host, cfg.percent_style)?;
                    println!("{}%  {}", model.percent_text, model.status_text);
                }
            }
        },
        Command::Theme { action } => {
            let theme = match action {
                None => host.theme(),
                Some(ThemeAction::Toggle) => host.toggle_theme(),
                Some(ThemeAction::Light) => {
                    host.set_theme(Theme::Light);
                    Theme::Light
                },
                Some(ThemeAction::Dark) => {
                    host.set_theme(Theme::Dark);
                    Theme::Dark
                },
            };
            println!("{theme}");
        },
        Command::Live { state } => {
            if let Some(state) = state {
                host.set_live(matches!(state, Switch::On));
            }
            println!("{}", host.mode());
        },
    }

    host.shutdown();
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.verbose, cli.quiet).and_then(|()| run(cli)) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
