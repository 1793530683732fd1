use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, MouseButton, MouseEvent,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use inkcell_config::{Config, SyncSettings};
use inkcell_engine::{
    Cell, CellType, DragReorder, MemorySurface, Notebook, Rect, SyncTimings, io, outline,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::{
    env,
    io::stdout,
    path::PathBuf,
    process,
    time::{Duration, Instant},
};

/// Longest we block on input when no sync deadline is pending
const IDLE_POLL: Duration = Duration::from_millis(250);

struct App {
    notebook_path: PathBuf,
    notebook: Notebook<MemorySurface>,
    list_state: ListState,
    drag: DragReorder,
    /// Screen area of the cell list, including its border
    list_area: ratatui::layout::Rect,
    status: String,
}

impl App {
    fn new(notebook_path: PathBuf, timings: SyncTimings) -> Result<Self> {
        let cells = io::open_or_create(&notebook_path)?;
        let notebook = Notebook::new(cells, MemorySurface::default(), timings);

        let mut app = Self {
            notebook_path,
            notebook,
            list_state: ListState::default(),
            drag: DragReorder::new(),
            list_area: ratatui::layout::Rect::default(),
            status: String::new(),
        };

        // Select first cell if available
        if !app.notebook.get_cells().is_empty() {
            app.list_state.select(Some(0));
        }

        Ok(app)
    }

    fn selected_cell(&self) -> Option<&Cell> {
        self.list_state
            .selected()
            .and_then(|index| self.notebook.get_cells().get(index))
    }

    fn select_id(&mut self, id: &inkcell_engine::CellId) {
        let index = self.notebook.store().index_of(id);
        self.list_state.select(index);
    }

    fn next_cell(&mut self) {
        let len = self.notebook.get_cells().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % len,
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn previous_cell(&mut self) {
        let len = self.notebook.get_cells().len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn move_selected(&mut self, up: bool) {
        let Some(id) = self.selected_cell().map(|cell| cell.id.clone()) else {
            return;
        };
        let result = if up {
            self.notebook.move_cell_up(&id)
        } else {
            self.notebook.move_cell_down(&id)
        };
        match result {
            Ok(true) => self.select_id(&id),
            Ok(false) => {}
            Err(e) => self.status = format!("Move failed: {e}"),
        }
    }

    fn duplicate_selected(&mut self) {
        let Some(id) = self.selected_cell().map(|cell| cell.id.clone()) else {
            return;
        };
        match self.notebook.duplicate_cell(&id) {
            Ok(new_id) => {
                self.select_id(&new_id);
                self.status = format!("Duplicated {id}");
            }
            Err(e) => self.status = format!("Duplicate failed: {e}"),
        }
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_cell().map(|cell| cell.id.clone()) else {
            return;
        };
        match self.notebook.delete_cell(&id) {
            Ok(_) => {
                let len = self.notebook.get_cells().len();
                let selected = self.list_state.selected().map(|i| i.min(len.saturating_sub(1)));
                self.list_state.select(if len == 0 { None } else { selected });
                self.status = format!("Deleted {id}");
            }
            Err(e) => self.status = format!("Delete failed: {e}"),
        }
    }

    fn save(&mut self) {
        self.notebook.flush(Instant::now());
        self.status = match io::write_notebook(&self.notebook_path, self.notebook.get_cells()) {
            Ok(()) => format!("Saved {}", self.notebook_path.display()),
            Err(e) => format!("Save failed: {e}"),
        };
    }

    /// One engine rect per visible list row, in list order
    fn row_rects(&self) -> Vec<Rect> {
        let area = self.list_area;
        let first_row = area.y + 1;
        let offset = self.list_state.offset();
        (0..self.notebook.get_cells().len())
            .map(|index| {
                let row = first_row as f32 + index as f32 - offset as f32;
                Rect::new(area.x as f32, row, area.width as f32, 1.0)
            })
            .collect()
    }

    fn row_at(&self, row: u16) -> Option<usize> {
        let area = self.list_area;
        if row <= area.y || row >= area.y + area.height.saturating_sub(1) {
            return None;
        }
        let index = (row - area.y - 1) as usize + self.list_state.offset();
        (index < self.notebook.get_cells().len()).then_some(index)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        // Pointer at the middle of the terminal row
        let pointer_y = mouse.row as f32 + 0.5;
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(index) = self.row_at(mouse.row) else {
                    return;
                };
                self.list_state.select(Some(index));
                let id = self.notebook.get_cells()[index].id.clone();
                if let Err(e) = self.drag.start(&id, self.notebook.get_cells()) {
                    self.status = format!("Drag failed: {e}");
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let rects = self.row_rects();
                if let Some(target) = self.drag.hover(pointer_y, &rects) {
                    self.status = format!("Drop before row {target}");
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let Some(planned) = self.drag.release(self.notebook.get_cells()) else {
                    return;
                };
                if planned.is_noop() {
                    return;
                }
                match self.notebook.apply_move(&planned) {
                    Ok(()) => {
                        self.select_id(&planned.cell_id);
                        self.status = format!("Moved {} to {}", planned.cell_id, planned.to);
                    }
                    Err(e) => self.status = format!("Move failed: {e}"),
                }
            }
            _ => {}
        }
    }

    fn render_cell_detail(&self) -> Vec<String> {
        let Some(cell) = self.selected_cell() else {
            return vec!["Select a cell to view its content".to_string()];
        };
        let mut lines = vec![format!("{} · {}", cell.cell_type, cell.id), String::new()];

        match cell.cell_type {
            CellType::Code => {
                let language = cell.metadata.language.as_deref().unwrap_or("");
                lines.push(format!("```{language}"));
                lines.extend(cell.content.lines().map(str::to_string));
                lines.push("```".to_string());
                for output in &cell.outputs {
                    let text = output
                        .get("text")
                        .and_then(|text| text.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| output.to_string());
                    lines.extend(text.lines().map(|line| format!("→ {line}")));
                }
            }
            CellType::Thinking => {
                let agent = cell.metadata.agent_name.as_deref().unwrap_or("agent");
                lines.push(format!("{agent} is thinking…"));
                lines.extend(cell.metadata.text_array.iter().map(|t| format!("  {t}")));
            }
            CellType::Markdown | CellType::Image | CellType::Link | CellType::Raw => {
                lines.extend(cell.content.lines().map(str::to_string));
            }
        }

        lines
    }
}

/// One-line summary of a cell for the list panel
fn summarize(cell: &Cell) -> String {
    let icon = match cell.cell_type {
        CellType::Markdown => "📝",
        CellType::Code => "💻",
        CellType::Image => "🖼",
        CellType::Thinking => "💭",
        CellType::Link => "📎",
        CellType::Raw => "🧱",
    };
    let first_line = cell.content.lines().find(|line| !line.trim().is_empty());
    let text = match (cell.cell_type, first_line) {
        (_, Some(line)) => line.to_string(),
        (CellType::Thinking, None) => cell.metadata.agent_name.clone().unwrap_or_default(),
        (_, None) => "(empty)".to_string(),
    };
    format!("{icon} {text}")
}

fn timings_from(settings: &SyncSettings) -> SyncTimings {
    SyncTimings {
        format_debounce: settings.format_debounce(),
        text_debounce: settings.text_debounce(),
        echo_timeout: settings.echo_timeout(),
    }
}

fn main() -> Result<()> {
    // Warn by default so log lines don't tear the UI; RUST_LOG overrides
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Determine notebook path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    let timings = config
        .as_ref()
        .map(|config| timings_from(&config.sync))
        .unwrap_or_default();

    let notebook_path = if args.len() == 2 {
        PathBuf::from(&args[1])
    } else if args.len() == 1 {
        match config {
            Some(config) => config.notebook_path,
            None => {
                eprintln!("Error: No notebook path provided and no config file found");
                eprintln!("Usage: {} <notebook.json>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [notebook.json]", args[0]);
        process::exit(1);
    };
    log::info!("Opening {}", notebook_path.display());

    // Load before touching the terminal so errors print normally
    let mut app = App::new(notebook_path, timings)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = app
            .notebook
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_POLL);

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next_cell(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous_cell(),
                    KeyCode::Char('K') => app.move_selected(true),
                    KeyCode::Char('J') => app.move_selected(false),
                    KeyCode::Char('d') => app.duplicate_selected(),
                    KeyCode::Char('x') => app.delete_selected(),
                    KeyCode::Char('s') => app.save(),
                    KeyCode::Esc => app.drag.cancel(),
                    _ => {}
                },
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        app.notebook.tick(Instant::now());
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(rows[0]);
    app.list_area = chunks[0];

    // Cell list panel
    let cell_items: Vec<ListItem> = app
        .notebook
        .get_cells()
        .iter()
        .map(|cell| ListItem::new(vec![Line::from(vec![Span::raw(summarize(cell))])]))
        .collect();

    let cell_list = List::new(cell_items)
        .block(Block::default().borders(Borders::ALL).title("Cells"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(cell_list, chunks[0], &mut app.list_state);

    // Detail panel: selected cell above, document outline below
    let detail_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)].as_ref())
        .split(chunks[1]);

    let detail_text: Vec<Line> = app
        .render_cell_detail()
        .into_iter()
        .map(|line| Line::from(vec![Span::raw(line)]))
        .collect();
    let detail = Paragraph::new(detail_text)
        .block(Block::default().borders(Borders::ALL).title("Cell"))
        .wrap(ratatui::widgets::Wrap { trim: false });
    f.render_widget(detail, detail_chunks[0]);

    let outline_text: Vec<Line> = outline(app.notebook.get_cells())
        .into_iter()
        .map(|entry| {
            let indent = "  ".repeat(entry.level.saturating_sub(1) as usize);
            let anchor = entry
                .anchor
                .map(|anchor| format!("  #{anchor}"))
                .unwrap_or_default();
            Line::from(vec![Span::raw(format!("{indent}{}{anchor}", entry.text))])
        })
        .collect();
    let outline_panel =
        Paragraph::new(outline_text).block(Block::default().borders(Borders::ALL).title("Outline"));
    f.render_widget(outline_panel, detail_chunks[1]);

    // Instructions and status at the bottom
    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("j/k: Select | "),
        Span::raw("J/K: Move | "),
        Span::raw("d: Duplicate | x: Delete | s: Save | drag to reorder"),
    ]);
    let status = Line::from(vec![Span::styled(
        app.status.clone(),
        Style::default().fg(Color::Cyan),
    )]);
    f.render_widget(Paragraph::new(vec![help_text, status]), rows[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summaries_use_the_first_non_blank_line() {
        let cell = Cell::markdown("\n\n# Title\nbody");
        assert_eq!(summarize(&cell), "📝 # Title");
        assert_eq!(summarize(&Cell::raw("")), "🧱 (empty)");
        assert_eq!(summarize(&Cell::thinking("planner")), "💭 planner");
    }

    #[test]
    fn config_timings_reach_the_engine() {
        let settings = SyncSettings {
            format_debounce_ms: 10,
            text_debounce_ms: 20,
            echo_timeout_ms: 30,
        };
        let timings = timings_from(&settings);
        assert_eq!(timings.format_debounce, Duration::from_millis(10));
        assert_eq!(timings.text_debounce, Duration::from_millis(20));
        assert_eq!(timings.echo_timeout, Duration::from_millis(30));
    }
}
