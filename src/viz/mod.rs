//! Terminal monitor for control output
//!
//! Shows one gauge per controller address with the latest value sent to it,
//! plus a status line with the message count.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};

use crate::engine::{ControlMessage, StopHandle};
use crate::mapping::MappingTable;

/// One controller address and the mappings feeding it
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorRow {
    pub channel: u8,
    pub controller: u8,
    /// Landmarks and axes feeding this address
    pub label: String,
    pub min: f64,
    pub max: f64,
    /// Last value sent, if any
    pub value: Option<f64>,
}

impl MonitorRow {
    /// Position of the value within the row's range, 0-1
    pub fn ratio(&self) -> f64 {
        let Some(value) = self.value else {
            return 0.0;
        };
        let span = self.max - self.min;
        if span <= 0.0 {
            return 1.0;
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

/// Monitor state shared between the dispatch sink and the UI
#[derive(Debug, Clone, Default)]
pub struct MonitorState {
    rows: Vec<MonitorRow>,
    messages: u64,
    finished: bool,
}

impl MonitorState {
    /// Build rows from a table, merging mappings that share an address
    pub fn from_table(table: &MappingTable) -> Self {
        let mut rows: Vec<MonitorRow> = Vec::new();

        for mapping in table.all() {
            let source = format!("{} {:?}", mapping.landmark(), mapping.axis());
            let range = mapping.output_range();

            match rows
                .iter_mut()
                .find(|r| r.channel == mapping.channel() && r.controller == mapping.controller())
            {
                Some(row) => {
                    row.label.push_str(", ");
                    row.label.push_str(&source);
                    row.min = row.min.min(range.min());
                    row.max = row.max.max(range.max());
                }
                None => rows.push(MonitorRow {
                    channel: mapping.channel(),
                    controller: mapping.controller(),
                    label: source,
                    min: range.min(),
                    max: range.max(),
                    value: None,
                }),
            }
        }

        Self {
            rows,
            messages: 0,
            finished: false,
        }
    }

    /// Record a message sent to the sink
    pub fn record(&mut self, message: &ControlMessage) {
        self.messages += 1;
        if let Some(row) = self
            .rows
            .iter_mut()
            .find(|r| r.channel == message.channel && r.controller == message.controller)
        {
            row.value = Some(message.value);
        }
    }

    pub fn rows(&self) -> &[MonitorRow] {
        &self.rows
    }

    pub fn messages(&self) -> u64 {
        self.messages
    }

    /// Mark the dispatch side as done
    pub fn finish(&mut self) {
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

fn lock(state: &Mutex<MonitorState>) -> MutexGuard<'_, MonitorState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Run the monitor TUI until the user quits. Quitting requests a stop of
/// the dispatch loop through `stop`.
pub fn run_monitor(state: Arc<Mutex<MonitorState>>, stop: StopHandle) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = monitor_loop(&mut terminal, &state, &stop);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    result
}

fn monitor_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &Mutex<MonitorState>,
    stop: &StopHandle,
) -> Result<()> {
    loop {
        terminal.draw(|f| draw_ui(f, &lock(state)))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                match (key.code, key.modifiers) {
                    (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => {
                        stop.stop();
                        return Ok(());
                    }
                    (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
                        stop.stop();
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }
    }
}

fn draw_ui(f: &mut Frame, state: &MonitorState) {
    let area = f.area();

    // Layout: gauges on top, status at bottom
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),      // Gauges
            Constraint::Length(3),   // Status
        ])
        .split(area);

    draw_gauges(f, chunks[0], state);
    draw_status(f, chunks[1], state);
}

fn draw_gauges(f: &mut Frame, area: Rect, state: &MonitorState) {
    if state.rows().is_empty() {
        let empty = Paragraph::new("No mappings configured")
            .block(Block::default().borders(Borders::ALL).title(" Controls "));
        f.render_widget(empty, area);
        return;
    }

    let constraints: Vec<Constraint> = state.rows().iter().map(|_| Constraint::Length(3)).collect();
    let slots = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (row, slot) in state.rows().iter().zip(slots.iter()) {
        let title = format!(" ch {} cc {}  {} ", row.channel, row.controller, row.label);
        let label = match row.value {
            Some(value) => format!("{:.1}", value),
            None => "-".to_string(),
        };

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(title))
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(row.ratio())
            .label(label);

        f.render_widget(gauge, *slot);
    }
}

fn draw_status(f: &mut Frame, area: Rect, state: &MonitorState) {
    let status = if state.is_finished() { "STOPPED" } else { "RUNNING" };
    let status_color = if state.is_finished() { Color::Yellow } else { Color::Green };

    let text = Line::from(vec![
        Span::raw("  Status: "),
        Span::styled(status, Style::default().fg(status_color)),
        Span::raw(format!("  |  Messages: {}", state.messages())),
        Span::raw("  |  q: quit"),
    ]);

    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(paragraph, area);
}
