use std::{
    io,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle, Line as CanvasLine},
        Axis, Block, BorderType, Borders, Cell, Chart, Dataset, Gauge, GraphType, Paragraph, Row,
        Table,
    },
    Frame, Terminal,
};
use tracing::info;

use crate::app::App;
use crate::cluster::{self, NodeRole, APPLICATIONS, LINKS, NODES};
use crate::control::Param;
use crate::series::{Series, Timestamped};
use crate::util::{chart_ceiling, format_ms, format_rps, format_tokens_per_sec};

// poll interval while the driver is stopped
const IDLE_POLL: Duration = Duration::from_millis(250);

pub fn run(app: App) -> io::Result<()> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_loop(&mut terminal, app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app_loop<B: Backend>(terminal: &mut Terminal<B>, mut app: App) -> io::Result<()> {
    app.start(Instant::now());

    loop {
        terminal.draw(|f| draw(f, &app))?;

        // Block until input arrives or the next sample is due
        let timeout = app.driver.timeout(Instant::now()).unwrap_or(IDLE_POLL);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        app.shutdown();
                    } else {
                        app.on_key(key.code, Instant::now());
                    }
                }
            }
        }
        if app.should_quit {
            info!(ticks = app.driver.ticks(), "console closed");
            return Ok(());
        }
        app.tick_or_log(Instant::now());
    }
}

pub fn draw(f: &mut Frame, app: &App) {
    // ============= whole screen layout ============
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(20),   // Quadrants
            Constraint::Length(1), // Bottom Status Bar
        ])
        .split(f.size());

    draw_header(f, main_chunks[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(main_chunks[1]);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    draw_metrics(f, top[0], app);
    draw_applications(f, top[1]);
    draw_controls(f, bottom[0], app);
    draw_topology(f, bottom[1]);
    draw_status_bar(f, main_chunks[2], app);
}

fn panel(title: &str, color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", title))
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_header(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(Span::styled(
            cluster::CLUSTER_TITLE,
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(cluster::CLUSTER_SUBTITLE, Style::default().fg(Color::DarkGray))),
    ];
    f.render_widget(Paragraph::new(text).block(Block::default().borders(Borders::BOTTOM)), area);
}

// ============= Top Left: Performance Metrics ============

fn points<T>(series: &Series<T>, value: impl Fn(&T) -> f64) -> Vec<(f64, f64)> {
    series.iter().enumerate().map(|(i, s)| (i as f64, value(s))).collect()
}

fn time_axis<T: Timestamped>(series: &Series<T>) -> Axis<'static> {
    let first = series.first().map(|s| s.time_label()).unwrap_or_default();
    let last = series.last().map(|s| s.time_label()).unwrap_or_default();
    Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds([0.0, (series.capacity().saturating_sub(1)).max(1) as f64])
        .labels(vec![Span::raw(first), Span::raw(last)])
}

fn value_axis(ceiling: f64) -> Axis<'static> {
    Axis::default()
        .style(Style::default().fg(Color::Gray))
        .bounds([0.0, ceiling])
        .labels(vec![Span::raw("0"), Span::raw(format!("{:.0}", ceiling))])
}

fn line<'a>(name: &'a str, color: Color, data: &'a [(f64, f64)]) -> Dataset<'a> {
    Dataset::default()
        .name(name)
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(color))
        .data(data)
}

fn draw_metrics(f: &mut Frame, area: Rect, app: &App) {
    let block = panel("Performance Metrics", Color::Blue);
    f.render_widget(block.clone(), area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(block.inner(area));

    // Latency
    let latency = app.store.latency();
    let p50 = points(latency, |s| s.p50);
    let p95 = points(latency, |s| s.p95);
    let p99 = points(latency, |s| s.p99);
    let title = match latency.last() {
        Some(s) => format!(" Latency  p50 {}  p99 {} ", format_ms(s.p50), format_ms(s.p99)),
        None => " Latency (ms) ".to_string(),
    };
    let chart = Chart::new(vec![
        line("P50", Color::Blue, &p50),
        line("P95", Color::Yellow, &p95),
        line("P99", Color::Red, &p99),
    ])
    .block(Block::default().title(title))
    .x_axis(time_axis(latency))
    .y_axis(value_axis(chart_ceiling(latency.iter().map(|s| s.p99), 100.0)));
    f.render_widget(chart, chunks[0]);

    // Throughput
    let throughput = app.store.throughput();
    let tokens = points(throughput, |s| s.tokens);
    let title = match throughput.last() {
        Some(s) => format!(" Throughput  {} ", format_tokens_per_sec(s.tokens)),
        None => " Throughput (tokens/sec) ".to_string(),
    };
    let chart = Chart::new(vec![line("Tokens/sec", Color::Green, &tokens)])
        .block(Block::default().title(title))
        .x_axis(time_axis(throughput))
        .y_axis(value_axis(chart_ceiling(throughput.iter().map(|s| s.tokens), 200.0)));
    f.render_widget(chart, chunks[1]);

    // Requests
    let requests = app.store.requests();
    let rps = points(requests, |s| s.requests);
    let title = match requests.last() {
        Some(s) => format!(" Requests  {} ", format_rps(s.requests)),
        None => " Requests per Second ".to_string(),
    };
    let chart = Chart::new(vec![line("Req/sec", Color::Magenta, &rps)])
        .block(Block::default().title(title))
        .x_axis(time_axis(requests))
        .y_axis(value_axis(chart_ceiling(requests.iter().map(|s| s.requests), 5.0)));
    f.render_widget(chart, chunks[2]);
}

// ============= Top Right: Running Applications ============

fn draw_applications(f: &mut Frame, area: Rect) {
    let block = panel("Running Applications", Color::Green);
    f.render_widget(block.clone(), area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(2 * APPLICATIONS.len() as u16 + 1),
        ])
        .split(block.inner(area));

    let header_cells = ["Name", "Status", "GPU", "Memory", "Uptime"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::Rgb(40, 40, 40)))
        .height(1);

    let rows = APPLICATIONS.iter().map(|a| {
        Row::new(vec![
            Cell::from(a.name),
            Cell::from(a.status).style(Style::default().fg(Color::Green)),
            Cell::from(format!("{} GPU", a.gpu_share)),
            Cell::from(a.memory),
            Cell::from(a.uptime).style(Style::default().fg(Color::DarkGray)),
        ])
    });
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(28),
            Constraint::Percentage(16),
            Constraint::Percentage(16),
            Constraint::Percentage(22),
            Constraint::Percentage(18),
        ],
    )
    .header(header);
    f.render_widget(table, chunks[0]);

    let summary = Line::from(vec![
        Span::styled("Total GPUs: ", Style::default().fg(Color::DarkGray)),
        Span::styled(cluster::TOTAL_GPUS, Style::default().fg(Color::Cyan)),
    ]);
    f.render_widget(Paragraph::new(summary), chunks[1]);

    let gauge_rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(2); APPLICATIONS.len()])
        .split(chunks[2]);
    for (a, row) in APPLICATIONS.iter().zip(gauge_rows.iter()) {
        let gauge = Gauge::default()
            .block(Block::default().title(a.name))
            .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Rgb(40, 40, 40)))
            .percent(a.gpu_util.min(100))
            .label(format!("{}%", a.gpu_util));
        f.render_widget(gauge, *row);
    }
}

// ============= Bottom Left: Traffic Generator ============

fn draw_controls(f: &mut Frame, area: Rect, app: &App) {
    let block = panel("Traffic Generator", Color::Yellow);
    f.render_widget(block.clone(), area);
    let mut constraints = vec![Constraint::Length(2); Param::ALL.len()];
    constraints.push(Constraint::Min(1));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(block.inner(area));

    for (param, row) in Param::ALL.into_iter().zip(chunks.iter()) {
        let value = app.control.get(param);
        let range = param.range();
        let ratio = f64::from(value - range.start()) / f64::from(range.end() - range.start());
        let selected = param == app.selected;
        let title_style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let marker = if selected { "▶ " } else { "  " };
        let gauge = Gauge::default()
            .block(Block::default().title(Span::styled(
                format!("{}{}: {}{}", marker, param.label(), value, param.unit()),
                title_style,
            )))
            .gauge_style(Style::default().fg(Color::Blue).bg(Color::Rgb(40, 40, 40)))
            .ratio(ratio.clamp(0.0, 1.0))
            .label(format!("{} .. {}", range.start(), range.end()));
        f.render_widget(gauge, *row);
    }

    let (state, color, button) = if app.control.is_generating() {
        ("Active", Color::Green, "[space] Stop Traffic")
    } else {
        ("Idle", Color::Gray, "[space] Start Traffic")
    };
    let status = vec![
        Line::from(Span::styled(
            button,
            Style::default().fg(Color::Black).bg(if app.control.is_generating() {
                Color::Red
            } else {
                Color::Green
            }),
        )),
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
            Span::styled(state, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled("   Target: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{} req/s", app.control.request_rate())),
        ]),
    ];
    if let Some(rest) = chunks.last() {
        f.render_widget(Paragraph::new(status), *rest);
    }
}

// ============= Bottom Right: Network Topology ============

fn draw_topology(f: &mut Frame, area: Rect) {
    let summary = format!(
        "Network Topology  nodes {}  active {}  idle {}",
        NODES.len(),
        cluster::active_nodes(),
        NODES.len() - cluster::active_nodes()
    );
    let canvas = Canvas::default()
        .block(panel(&summary, Color::Magenta))
        .marker(Marker::Braille)
        .x_bounds([0.0, 1.0])
        .y_bounds([0.0, 1.0])
        .paint(|ctx| {
            // canvas y grows upwards, node positions grow downwards
            for &(a, b) in LINKS.iter() {
                let (from, to) = (&NODES[a], &NODES[b]);
                ctx.draw(&CanvasLine {
                    x1: from.x,
                    y1: 1.0 - from.y,
                    x2: to.x,
                    y2: 1.0 - to.y,
                    color: Color::Green,
                });
            }
            for node in NODES.iter() {
                let color = match (node.role, node.active) {
                    (NodeRole::Head, _) => Color::Blue,
                    (NodeRole::Worker, true) => Color::Green,
                    (NodeRole::Worker, false) => Color::DarkGray,
                };
                let radius = if node.role == NodeRole::Head { 0.06 } else { 0.04 };
                ctx.draw(&Circle {
                    x: node.x,
                    y: 1.0 - node.y,
                    radius,
                    color,
                });
                let label = if node.active {
                    format!("{} (serving)", node.name)
                } else {
                    node.name.to_string()
                };
                ctx.print(
                    (node.x - 0.08).max(0.0),
                    (1.0 - node.y - 0.09).max(0.0),
                    Span::styled(label, Style::default().fg(color)),
                );
            }
        });
    f.render_widget(canvas, area);
}

// ============ Bottom Status Bar ============

fn draw_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let (mode, mode_color) = if app.control.is_generating() {
        (" GENERATING ", Color::Green)
    } else {
        (" IDLE ", Color::DarkGray)
    };
    let status_content = Line::from(vec![
        Span::styled(mode, Style::default().bg(mode_color).fg(Color::Black).add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            " | batch {} | max tokens {} | ticks {} ",
            app.control.batch_size(),
            app.control.max_tokens(),
            app.driver.ticks()
        )),
        Span::styled(
            "| ↑↓ select  ←→ adjust  space: traffic  r: reset  q: quit",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let status_bar = Paragraph::new(status_content).style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(status_bar, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use ratatui::backend::TestBackend;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn renders_empty_and_filled_dashboard() {
        let config = Config {
            seed: Some(3),
            ..Config::default()
        };
        let mut app = App::new(&config);
        let mut terminal = Terminal::new(TestBackend::new(160, 60)).unwrap();

        terminal.draw(|f| draw(f, &app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Traffic Generator"));
        assert!(text.contains("Idle"));

        let t0 = Instant::now();
        app.start(t0);
        app.on_key(KeyCode::Char(' '), t0);
        for i in 1..=25u64 {
            app.on_tick(t0 + Duration::from_secs(i)).unwrap();
        }
        terminal.draw(|f| draw(f, &app)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Active"));
        assert!(text.contains("vllm-worker-1"));
        assert_eq!(app.store.throughput().len(), 20);
    }
}
