mod app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};
use app::{
    format_latency, format_percent, format_price, format_spread, format_time_ms, truncate, AppState,
    ConnectionStatus, StatSummary, SummaryResponse,
};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(2);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let area = f.area();

    // Outer vertical split: header | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, chunks[1]);
    render_footer(f, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let title_spans = vec![
        Span::styled(
            " Spread Monitor  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} instruments", app.summaries.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!(
                "fetch p50 {} / p99 {}",
                format_latency(app.latency.p50_ms),
                format_latency(app.latency.p99_ms)
            ),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("updated {}s ago", app.last_refresh.elapsed().as_secs()),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans))
        .block(Block::default().borders(Borders::ALL).border_style(
            Style::default().fg(Color::DarkGray),
        ));

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, area: Rect) {
    if app.summaries.is_empty() {
        let empty = Paragraph::new("waiting for data…")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(empty, area);
        return;
    }

    let constraints: Vec<Constraint> = app
        .summaries
        .iter()
        .map(|_| Constraint::Ratio(1, app.summaries.len() as u32))
        .collect();
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    for (summary, pane) in app.summaries.iter().zip(panes.iter()) {
        render_instrument(f, summary, *pane);
    }
}

fn render_instrument(f: &mut Frame, s: &SummaryResponse, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(area);

    let latest = s.latest.unwrap_or_default();
    let updated = s
        .latest
        .map_or("—".to_string(), |o| format_time_ms(o.timestamp_ms));
    let price_rows = vec![
        Row::new(vec![Cell::from("Primary last"), Cell::from(format_price(latest.primary_price))]),
        Row::new(vec![Cell::from("Counter bid"), Cell::from(format_price(latest.counter_bid))]),
        Row::new(vec![Cell::from("Counter ask"), Cell::from(format_price(latest.counter_ask))]),
        Row::new(vec![
            Cell::from("Updated").style(Style::default().fg(Color::DarkGray)),
            Cell::from(updated).style(Style::default().fg(Color::DarkGray)),
        ]),
    ];
    let prices = Table::new(price_rows, [Constraint::Length(14), Constraint::Min(10)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" {} ", s.symbol),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(prices, halves[0]);

    let header_cells = ["Dir", "Now", "%", "Avg", "Max", "Min", "N"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let rows = vec![
        direction_row("A", s.spreads.a, s.spreads.a_percent, s.stats.a),
        direction_row("B", s.spreads.b, s.spreads.b_percent, s.stats.b),
    ];

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Length(9),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(9),
            Constraint::Length(5),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" SPREADS · {}m window · {} samples ", s.window_secs / 60, s.sample_count),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );

    f.render_widget(table, halves[1]);
}

fn direction_row(
    label: &'static str,
    now: Option<f64>,
    pct: Option<f64>,
    stats: Option<StatSummary>,
) -> Row<'static> {
    let now_color = match now {
        Some(v) if v > 0.0 => Color::Green,
        Some(v) if v < 0.0 => Color::Red,
        _ => Color::DarkGray,
    };
    let (avg, max, min, count) = match stats {
        Some(st) => (
            format_spread(Some(st.average)),
            format_spread(Some(st.max)),
            format_spread(Some(st.min)),
            st.count.to_string(),
        ),
        None => ("—".to_string(), "—".to_string(), "—".to_string(), "0".to_string()),
    };

    Row::new(vec![
        Cell::from(label).style(Style::default().fg(Color::Cyan)),
        Cell::from(format_spread(now)).style(Style::default().fg(now_color)),
        Cell::from(format_percent(pct)),
        Cell::from(avg),
        Cell::from(max),
        Cell::from(min),
        Cell::from(count).style(Style::default().fg(Color::DarkGray)),
    ])
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("auto-refresh: 2s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
