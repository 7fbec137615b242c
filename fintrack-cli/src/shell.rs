//! Full-screen interactive shell: income and expense panes, totals, the
//! message log and an input line.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use fintrack_core::{Totals, Transaction, Translator};
use fintrack_ledger::{Presenter, Session};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use std::io::{self, Stdout};

use crate::presenter::transaction_row;

const MAX_NOTES: usize = 200;

const HELP: &str = "Type a command or plain English and press Enter.
  add <amount> \"<description>\" <DD/MM/YYYY> \"<category>\"
  category <add|remove> \"<name>\"  |  category reset
  remove <id> [<id> ...]
  edit <id> <amount|description|date|category> <new value>
Shell commands: /ask <text>, /totals, /categories, /refresh, /help. Esc quits.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Input,
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub tone: Tone,
    pub text: String,
}

/// What the shell draws. The session writes into it through [`Presenter`].
#[derive(Debug, Default)]
pub struct ShellView {
    pub income: Vec<Transaction>,
    pub expenses: Vec<Transaction>,
    pub totals: Totals,
    pub notes: Vec<Note>,
}

impl ShellView {
    fn note(&mut self, tone: Tone, text: impl Into<String>) {
        self.notes.push(Note {
            tone,
            text: text.into(),
        });
        if self.notes.len() > MAX_NOTES {
            let excess = self.notes.len() - MAX_NOTES;
            self.notes.drain(..excess);
        }
    }
}

impl Presenter for ShellView {
    fn show_success(&mut self, message: &str) {
        self.note(Tone::Success, message);
    }

    fn show_error(&mut self, title: &str, message: &str) {
        self.note(Tone::Error, format!("{title}: {message}"));
    }

    fn render_transactions(&mut self, transactions: &[Transaction]) {
        let (income, expenses): (Vec<_>, Vec<_>) =
            transactions.iter().cloned().partition(|t| t.is_income());
        self.income = income;
        // non-numeric rows end up here; they count toward neither total
        self.expenses = expenses;
    }

    fn render_totals(&mut self, totals: Totals) {
        self.totals = totals;
    }
}

/// Apply one line of input. Storage errors are shown, not fatal.
pub fn handle_line<T: Translator>(session: &mut Session<T, ShellView>, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    session.presenter_mut().note(Tone::Input, line);

    let result = match slash(line) {
        Some(("ask", text)) if text.is_empty() => {
            session.presenter_mut().note(Tone::Error, "usage: /ask <text>");
            Ok(())
        }
        Some(("ask", text)) => session.submit_natural_language(text).map(drop),
        Some(("help", _)) => {
            session.presenter_mut().note(Tone::Info, HELP);
            Ok(())
        }
        Some(("totals", _)) => {
            let summary = session.presenter().totals.summary();
            session.presenter_mut().note(Tone::Info, summary);
            Ok(())
        }
        Some(("categories", _)) => session.categories().read_categories().map(|cats| {
            session
                .presenter_mut()
                .note(Tone::Info, format!("Categories: {}", cats.join(", ")));
        }),
        Some(("refresh", _)) => session.refresh(),
        Some((other, _)) => {
            session
                .presenter_mut()
                .note(Tone::Error, format!("Unknown shell command /{other}. Try /help"));
            Ok(())
        }
        None => session.submit_command_line(line).map(drop),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "storage error");
        session.presenter_mut().note(Tone::Error, format!("Storage Error: {e}"));
    }
}

fn slash(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('/')?;
    let (name, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    Some((name, text.trim()))
}

pub fn run_shell<T: Translator>(session: &mut Session<T, ShellView>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = shell_loop(&mut terminal, session);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn shell_loop<T: Translator>(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    session: &mut Session<T, ShellView>,
) -> Result<()> {
    let mut input = String::new();
    session
        .presenter_mut()
        .note(Tone::Info, "Type /help for the command syntax. Esc quits.");

    loop {
        terminal.draw(|f| draw(f, session.presenter(), &input))?;

        if event::poll(std::time::Duration::from_millis(50))?
            && let Event::Key(key) = event::read()?
        {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Esc => break,
                KeyCode::Enter => {
                    let line = std::mem::take(&mut input);
                    // the model call blocks; show the pending line first
                    terminal.draw(|f| draw(f, session.presenter(), "…"))?;
                    handle_line(session, &line);
                }
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => {
                    input.push(c);
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn draw(f: &mut Frame, view: &ShellView, input: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(5),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "fintrack",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  Enter=submit  /help  Esc=quit", Style::default().fg(Color::Gray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, chunks[0]);

    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    f.render_widget(transaction_pane("income", &view.income, Color::Green), panes[0]);
    f.render_widget(transaction_pane("expenses", &view.expenses, Color::Red), panes[1]);

    let summary = view.totals.summary();
    let totals = Paragraph::new(Text::from(summary.lines().map(Line::raw).collect::<Vec<_>>()))
    .block(Block::default().borders(Borders::ALL).title("totals"));
    f.render_widget(totals, chunks[2]);

    let mut lines: Vec<Line> = Vec::new();
    for n in &view.notes {
        let (tag, color) = match n.tone {
            Tone::Input => ("you", Color::Cyan),
            Tone::Info => ("info", Color::Gray),
            Tone::Success => ("ok", Color::Green),
            Tone::Error => ("error", Color::Red),
        };
        for (i, text) in n.text.lines().enumerate() {
            let prefix = if i == 0 { format!("{tag}: ") } else { "  ".to_string() };
            lines.push(Line::from(vec![
                Span::styled(prefix, Style::default().fg(color)),
                Span::raw(text.to_string()),
            ]));
        }
    }
    let visible = chunks[3].height.saturating_sub(2) as usize;
    let skip = lines.len().saturating_sub(visible);
    let messages = Paragraph::new(Text::from(lines.split_off(skip)))
        .block(Block::default().borders(Borders::ALL).title("messages"))
        .wrap(Wrap { trim: false });
    f.render_widget(messages, chunks[3]);

    let input_widget = Paragraph::new(input)
        .block(Block::default().borders(Borders::ALL).title("command"))
        .style(Style::default().fg(Color::White));
    f.render_widget(input_widget, chunks[4]);
    f.set_cursor_position(Position::new(
        chunks[4].x + 1 + input.chars().count() as u16,
        chunks[4].y + 1,
    ));
}

fn transaction_pane<'a>(title: &'a str, rows: &'a [Transaction], color: Color) -> Paragraph<'a> {
    let lines: Vec<Line> = rows
        .iter()
        .map(|t| Line::styled(transaction_row(t), Style::default().fg(color)))
        .collect();
    Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL).title(title))
}
