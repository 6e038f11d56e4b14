use std::io::{self, IsTerminal};

use crossterm::{
    ExecutableCommand,
    event::{DisableFocusChange, EnableFocusChange, Event, EventStream},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use ratatui::{Terminal, backend::CrosstermBackend};
use settree::AUTO_REFRESH_INTERVAL;
use tokio::time::MissedTickBehavior;

use crate::{app::App, ui};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Raw mode, alternate screen and focus reporting.
fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableFocusChange)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(DisableFocusChange)?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Run the interactive editor until the user quits.
///
/// The terminal is restored on every exit path, and pending writes are
/// flushed to the store.
pub async fn run(mut app: App) -> anyhow::Result<()> {
    if !io::stdout().is_terminal() {
        bail!("the editor needs an interactive terminal, use --dump to print the settings");
    }

    let mut terminal = setup_terminal()?;
    let result = event_loop(&mut terminal, &mut app).await;
    let restored = restore_terminal(&mut terminal);
    app.sync_store();
    info!("settings editor exited");
    result?;
    restored?;
    Ok(())
}

async fn event_loop(terminal: &mut Term, app: &mut App) -> anyhow::Result<()> {
    let mut ticks = tokio::time::interval(AUTO_REFRESH_INTERVAL);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticks.tick().await;
    let mut events = EventStream::new();

    while !app.should_quit {
        let height = terminal.size()?.height;
        app.viewport_height = height.saturating_sub(ui::CHROME_HEIGHT) as usize;
        app.ensure_cursor_visible();
        terminal.draw(|frame| ui::draw(frame, app))?;

        tokio::select! {
            _ = ticks.tick() => app.on_tick(),
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => app.on_key(key),
                Some(Ok(Event::FocusGained)) => app.on_focus_gained(),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }
    }
    Ok(())
}
