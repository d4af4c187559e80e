use std::io;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste, EventStream};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, enable_raw_mode};
use futures::StreamExt;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::{select, sync::mpsc, time};
use tracing::{error, info};

use jetssh::config::profiles::ProfileStore;
use jetssh::config::settings::{AppSettings, DataPaths, HostKeyPolicy};
use jetssh::config::snippets::SnippetStore;
use jetssh::session::ConnectOptions;
use jetssh::{App, AppEvent, Result, init_panic_hook, init_tracing, restore_tui};

const TICK_RATE: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(name = "jetssh", version, about = "Multi-session SSH terminal client")]
struct Args {
    /// Directory holding config.toml, connections.json and commands.json
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Override the host key policy from config.toml
    #[arg(long, value_enum)]
    host_key_policy: Option<HostKeyPolicy>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let paths = DataPaths::resolve(args.data_dir)?;
    init_tracing(&args.log_level, &paths.dir)?;
    info!("Starting jetssh v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = AppSettings::load(&paths.dir)?;
    if let Some(policy) = args.host_key_policy {
        settings.host_key_policy = policy;
    }
    info!("Host key policy: {}", settings.host_key_policy);
    let options = ConnectOptions::from_settings(&settings)?;
    let profiles = ProfileStore::open(paths.connections())?;
    let snippets = SnippetStore::open(paths.commands())?;

    init_panic_hook();
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let (tx, mut rx) = mpsc::channel::<AppEvent>(settings.event_buffer.max(1));
    spawn_input_task(tx.clone());

    let mut app = App::new(settings, options, profiles, snippets, tx);
    let res = app.run(&mut terminal, &mut rx).await;

    let _ = execute!(terminal.backend_mut(), DisableBracketedPaste);
    restore_tui()?;
    if let Err(e) = &res {
        error!("Application error: {}", e);
    }
    info!("jetssh exited");
    res
}

/// Merge terminal input and the tick timer into the app event channel.
fn spawn_input_task(tx: mpsc::Sender<AppEvent>) {
    tokio::spawn(async move {
        let mut events = EventStream::new();
        let mut ticker = time::interval(TICK_RATE);
        loop {
            let ev = select! {
                event = events.next() => match event {
                    Some(Ok(event)) => AppEvent::Input(event),
                    Some(Err(e)) => {
                        error!("Terminal input error: {}", e);
                        break;
                    }
                    None => break,
                },
                _ = ticker.tick() => AppEvent::Tick,
            };
            if tx.send(ev).await.is_err() {
                break;
            }
        }
    });
}
