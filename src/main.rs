use chrono::Local;
use color_eyre::Result;
use ipgrabber_tui::{
    api::HttpFetcher,
    app::App,
    config::Config,
    events::{Event, EventHandler},
    logging,
    pipeline::{self, PipelineSettings},
    position::DeviceLocator,
    ui,
};
use crossterm::{
    cursor,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use tracing::info;

type Screen = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Config first, but its warnings wait for the log file
    let loaded = Config::load();
    let _log_guard = logging::initialize_logging(&loaded.config.logging);
    loaded.report();
    let config = loaded.config;
    color_eyre::install()?;
    install_panic_hook();

    let fetcher = HttpFetcher::new(config.endpoints.request_timeout())?;
    let locator = DeviceLocator::from_config(&config.position);
    let settings = PipelineSettings::from(&config);

    // Ready terminal and state
    let mut terminal = enter_screen()?;
    let mut app = App::new(&config, Local::now().date_naive());
    let mut events = EventHandler::new(120); // Fast enough for a smooth spinner

    // Lookup chain runs once, in the background
    let pipeline_tx = events.tx.clone();
    tokio::spawn(async move {
        let outcome = pipeline::run(&fetcher, &locator, &settings, &pipeline_tx).await;
        info!("Lookup finished: {:?}", outcome);
    });

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        match events.next().await {
            Some(Event::Tick) => app.on_tick(),
            Some(Event::Input(key)) => app.handle_key(key),
            Some(Event::Update(update)) => app.apply(update),
            None => break,
        }
    }

    leave_screen()?;
    Ok(())
}

fn enter_screen() -> Result<Screen> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

// Shared by the normal exit path and the panic hook.
fn leave_screen() -> io::Result<()> {
    terminal::disable_raw_mode()?;
    crossterm::execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)
}

fn install_panic_hook() {
    let report = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        leave_screen().ok();
        report(panic_info);
    }));
}
