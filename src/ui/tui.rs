//! Terminal status view
//!
//! A small read/command loop over a [`Session`]: renders the four
//! tracks' states and the master bpm, and maps single-key presses to
//! `Press`/`Stop`/`Clear` on the track under the cursor. Intended as a
//! quick-look companion to the CLI, not a full mixing console.

use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use tui::backend::CrosstermBackend;
use tui::layout::{Constraint, Direction, Layout};
use tui::style::{Color, Style};
use tui::text::{Span, Spans};
use tui::widgets::{Block, Borders, List, ListItem, Paragraph};
use tui::Terminal;

use crate::session::coordinator::{Session, SessionCommand, TrackCommand};

fn setup_terminal() -> io::Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    Ok(())
}

/// Run the status view until `q` is pressed. `selected` tracks which of
/// the four rows keyboard commands apply to.
pub fn run(session: &mut Session) -> io::Result<()> {
    let mut terminal = setup_terminal()?;
    let mut selected: usize = 1;
    let mut running = true;

    while running {
        terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(6), Constraint::Length(3)])
                .split(frame.size());

            let items: Vec<ListItem> = (1..=4)
                .map(|i| {
                    let track = session.track(i);
                    let label = match track {
                        Some(t) => format!("Track {i}: {:?}  (divider x{})", t.state(), t.divider()),
                        None => format!("Track {i}: <missing>"),
                    };
                    let style = if i == selected {
                        Style::default().fg(Color::Yellow)
                    } else {
                        Style::default()
                    };
                    ListItem::new(Spans::from(Span::styled(label, style)))
                })
                .collect();
            let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Tracks"));
            frame.render_widget(list, chunks[0]);

            let bpm_text = match session.master_bpm() {
                Some(bpm) => format!("bpm {bpm}  |  1-4 select  p press  s stop  c clear  q quit"),
                None => "no master loop yet  |  1-4 select  p press  s stop  c clear  q quit".to_string(),
            };
            let status = Paragraph::new(bpm_text).block(Block::default().borders(Borders::ALL).title("Transport"));
            frame.render_widget(status, chunks[1]);
        })?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => running = false,
                    KeyCode::Char(c @ '1'..='4') => selected = c.to_digit(10).unwrap() as usize,
                    KeyCode::Char('p') => {
                        session.dispatch(SessionCommand::Track(selected, TrackCommand::Press));
                    }
                    KeyCode::Char('s') => {
                        session.dispatch(SessionCommand::Track(selected, TrackCommand::Stop));
                    }
                    KeyCode::Char('c') => {
                        session.dispatch(SessionCommand::Track(selected, TrackCommand::Clear));
                    }
                    _ => {}
                }
            }
        } else {
            let now = session.now();
            session.tick(now);
        }
    }

    restore_terminal(&mut terminal)
}
