//! Terminal article picker.
//!
//! Every edit of the search line re-queries the match source. Up/Down move
//! the highlight, Enter opens the highlighted article, Esc or Ctrl-C cancels.

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use litwalk_core::{Article, ArticleId, ArticlePicker, MatchSource, SearchResult};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame, Terminal,
};
use std::io::Stdout;

/// How a picker session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Chosen(ArticleId),
    Cancelled,
}

/// Query line, current matches and highlight.
pub struct PickerState {
    query: String,
    matches: Vec<Article>,
    selected: usize,
}

impl PickerState {
    pub fn new(source: &dyn MatchSource) -> SearchResult<Self> {
        Ok(Self {
            query: String::new(),
            matches: source.matches("")?,
            selected: 0,
        })
    }

    pub fn selected(&self) -> Option<&Article> {
        self.matches.get(self.selected)
    }

    /// Applies one key press; `Some` once the session is over.
    pub fn handle_key(
        &mut self,
        key: KeyEvent,
        source: &dyn MatchSource,
    ) -> SearchResult<Option<Outcome>> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Ok(Some(Outcome::Cancelled)),
            KeyCode::Char('c') if ctrl => return Ok(Some(Outcome::Cancelled)),
            KeyCode::Enter => {
                if let Some(article) = self.selected() {
                    return Ok(Some(Outcome::Chosen(article.id.clone())));
                }
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Char('p') if ctrl => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.move_down(),
            KeyCode::Char('n') if ctrl => self.move_down(),
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    self.refresh(source)?;
                }
            }
            KeyCode::Char(c) if !ctrl => {
                self.query.push(c);
                self.refresh(source)?;
            }
            _ => {}
        }
        Ok(None)
    }

    fn move_down(&mut self) {
        if self.selected + 1 < self.matches.len() {
            self.selected += 1;
        }
    }

    fn refresh(&mut self, source: &dyn MatchSource) -> SearchResult<()> {
        self.matches = source.matches(&self.query)?;
        self.selected = 0;
        Ok(())
    }

    pub fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(frame.area());

        let input = Paragraph::new(self.query.as_str())
            .block(Block::default().title("Search").borders(Borders::ALL));
        frame.render_widget(input, chunks[0]);
        frame.set_cursor_position((
            chunks[0].x + 1 + self.query.chars().count() as u16,
            chunks[0].y + 1,
        ));

        let items: Vec<ListItem> = self
            .matches
            .iter()
            .map(|article| {
                let year = article.year.map(|y| format!(" ({y})")).unwrap_or_default();
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{}{year}", article.title)),
                    Span::styled(
                        format!("  {}", article.author_line()),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!("Articles ({})", self.matches.len()))
                    .borders(Borders::ALL),
            )
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
        let mut list_state = ListState::default().with_selected(
            (!self.matches.is_empty()).then_some(self.selected),
        );
        frame.render_stateful_widget(list, chunks[1], &mut list_state);

        let help = Paragraph::new("Enter: open  Up/Down: move  Esc: cancel")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[2]);
    }
}

/// Full-screen picker on the controlling terminal.
#[derive(Default)]
pub struct TerminalPicker;

impl ArticlePicker for TerminalPicker {
    fn pick(&mut self, source: &dyn MatchSource) -> SearchResult<Option<ArticleId>> {
        let mut state = PickerState::new(source)?;
        let mut screen = Screen::enter()?;

        loop {
            screen.terminal.draw(|frame| state.render(frame))?;

            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match state.handle_key(key, source)? {
                Some(Outcome::Chosen(id)) => return Ok(Some(id)),
                Some(Outcome::Cancelled) => return Ok(None),
                None => {}
            }
        }
    }
}

/// Raw-mode alternate screen, restored on drop.
struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl Screen {
    fn enter() -> std::io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout));
        match terminal {
            Ok(terminal) => Ok(Self { terminal }),
            Err(err) => {
                let _ = execute!(std::io::stdout(), LeaveAlternateScreen);
                let _ = disable_raw_mode();
                Err(err)
            }
        }
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
