use crate::{
    dashboard::{DashboardState, DiskPanel, MemoryGauge, Summary},
    theme,
};
use cfstat_core::MAX_DISPLAYED_INSTANCES;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{BarChart, Block, Borders, Clear, Gauge, Paragraph, Sparkline, Wrap},
    Frame,
};

const TOP_ROW_HEIGHT: u16 = 12;
const SCALING_HEIGHT: u16 = 5;

pub enum Scene<'a> {
    Dashboard(&'a DashboardState),
    Scaling { app_name: &'a str, instances: usize },
}

pub fn render(frame: &mut Frame, scene: &Scene<'_>) {
    match scene {
        Scene::Dashboard(state) => render_dashboard(frame, state),
        Scene::Scaling {
            app_name,
            instances,
        } => render_scaling(frame, app_name, *instances),
    }
}

/// Splits `area` top-down into at most eight panels of `height` rows. Rows
/// left over stay empty.
pub fn panel_stack(area: Rect, count: usize, height: u16) -> Vec<Rect> {
    let count = count.min(MAX_DISPLAYED_INSTANCES);
    if count == 0 {
        return Vec::new();
    }
    let mut constraints = vec![Constraint::Length(height); count];
    constraints.push(Constraint::Min(0));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);
    chunks.iter().take(count).copied().collect()
}

fn render_dashboard(frame: &mut Frame, state: &DashboardState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(TOP_ROW_HEIGHT), Constraint::Min(0)])
        .split(frame.size());

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(3, 12),
            Constraint::Ratio(3, 12),
            Constraint::Ratio(6, 12),
        ])
        .split(rows[0]);
    frame.render_widget(usage_panel(state.app_name()), top[0]);
    frame.render_widget(summary_panel(state.summary()), top[1]);
    frame.render_widget(disk_chart(state.disk()), top[2]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(6, 12), Constraint::Ratio(6, 12)])
        .split(rows[1]);
    render_cpu(frame, state, bottom[0]);
    render_memory(frame, state.memory(), bottom[1]);
}

fn panel_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme::PANEL_BORDER))
        .title(title)
}

fn usage_panel(app_name: &str) -> Paragraph<'static> {
    let lines = vec![
        Line::from(format!("Show live statistics for [{app_name}]")),
        Line::from(""),
        Line::from(":Press 'q' or 'ctrl-c' to exit"),
        Line::from(":Press 'PageUp' to increase app instances"),
        Line::from(":Press 'PageDown' to decrease app instances"),
    ];
    Paragraph::new(lines)
        .style(Style::default().fg(theme::PANEL_TEXT))
        .block(panel_block("Usage".to_string()))
        .wrap(Wrap { trim: true })
}

fn summary_panel(summary: Option<&Summary>) -> Paragraph<'static> {
    let lines: Vec<Line> = match summary {
        Some(summary) => summary.lines().into_iter().map(Line::from).collect(),
        None => vec![Line::from("Waiting for metrics...")],
    };
    Paragraph::new(lines)
        .style(Style::default().fg(theme::SUMMARY_TEXT))
        .block(panel_block("Summary".to_string()))
        .wrap(Wrap { trim: true })
}

fn disk_chart(panel: &DiskPanel) -> BarChart<'_> {
    let data: Vec<(&str, u64)> = panel
        .bars
        .iter()
        .map(|bar| (bar.label.as_str(), bar.megabytes))
        .collect();
    BarChart::default()
        .block(panel_block(panel.title.clone()))
        .data(data.as_slice())
        .bar_width(panel.bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(theme::DISK_BAR))
        .value_style(
            Style::default()
                .fg(theme::PANEL_TEXT)
                .bg(theme::DISK_BAR)
                .add_modifier(Modifier::BOLD),
        )
        .label_style(Style::default().fg(theme::PANEL_TEXT))
}

fn render_cpu(frame: &mut Frame, state: &DashboardState, area: Rect) {
    let area = Rect {
        height: state.cpu_height().min(area.height),
        ..area
    };
    if area.is_empty() {
        return;
    }
    let block = panel_block("CPU Usage".to_string());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let series = state.cpu();
    let height = series.first().map(|s| s.height + 1).unwrap_or(0);
    for (position, (series, slot)) in series
        .iter()
        .zip(panel_stack(inner, series.len(), height))
        .enumerate()
    {
        if slot.is_empty() {
            continue;
        }
        let color = theme::instance_color(position);
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Min(0)])
            .split(slot);
        let title = Paragraph::new(series.title.clone()).style(Style::default().fg(color));
        frame.render_widget(title, parts[0]);

        let samples = series.latest(parts[1].width as usize);
        let sparkline = Sparkline::default()
            .data(&samples)
            .style(Style::default().fg(color));
        frame.render_widget(sparkline, parts[1]);
    }
}

fn render_memory(frame: &mut Frame, gauges: &[MemoryGauge], area: Rect) {
    let height = gauges.first().map(|g| g.height).unwrap_or(0);
    for (position, (gauge, slot)) in gauges
        .iter()
        .zip(panel_stack(area, gauges.len(), height))
        .enumerate()
    {
        if slot.is_empty() {
            continue;
        }
        let widget = Gauge::default()
            .block(panel_block(gauge.label.clone()))
            .gauge_style(Style::default().fg(theme::instance_color(position)))
            .percent(gauge.fill_percent())
            .label(format!("{}%", gauge.percent));
        frame.render_widget(widget, slot);
    }
}

fn render_scaling(frame: &mut Frame, app_name: &str, instances: usize) {
    let screen = frame.size();
    let band = Rect {
        height: SCALING_HEIGHT.min(screen.height),
        ..screen
    };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(2, 12),
            Constraint::Ratio(8, 12),
            Constraint::Ratio(2, 12),
        ])
        .split(band);
    let area = columns[1];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::SCALE_BORDER_STYLE)
        .title(" Scale ")
        .title_style(theme::SCALE_TITLE_STYLE);
    let text = vec![
        Line::from(""),
        Line::from(format!("SCALING [{app_name}] TO [{instances}] INSTANCES...")),
    ];
    let widget = Paragraph::new(text)
        .style(
            Style::default()
                .fg(theme::SCALE_TEXT)
                .add_modifier(Modifier::BOLD),
        )
        .block(block);
    frame.render_widget(Clear, area);
    frame.render_widget(widget, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfstat_core::{InstanceSnapshot, Statistics};
    use ratatui::{backend::TestBackend, Terminal};

    fn snapshot(count: usize) -> Statistics {
        Statistics::from_data((0..count).map(|i| {
            let mut instance = InstanceSnapshot::default();
            instance.stats.memory_quota = 1 << 30;
            instance.stats.disk_quota = 1 << 30;
            instance.stats.usage.cpu = 0.5;
            instance.stats.usage.memory = 1 << 29;
            instance.stats.usage.disk = 100 << 20;
            (i.to_string(), instance)
        }))
    }

    fn draw(scene: &Scene<'_>, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal
            .draw(|frame| render(frame, scene))
            .expect("draw");
        let buffer = terminal.backend().buffer();
        (0..buffer.area.height)
            .map(|y| {
                (0..buffer.area.width)
                    .map(|x| buffer.get(x, y).symbol().to_string())
                    .collect::<String>()
            })
            .collect()
    }

    fn contains(rows: &[String], needle: &str) -> bool {
        rows.iter().any(|row| row.contains(needle))
    }

    #[test]
    fn panel_stack_caps_at_eight() {
        let area = Rect::new(0, 0, 40, 200);
        assert!(panel_stack(area, 0, 5).is_empty());
        let slots = panel_stack(area, 12, 5);
        assert_eq!(slots.len(), 8);
        assert!(slots.iter().all(|slot| slot.height == 5));
        assert_eq!(slots[1].y, 5);
        assert_eq!(slots[7].y, 35);
    }

    #[test]
    fn dashboard_shows_every_panel() {
        let mut state = DashboardState::new("web");
        state.update(&snapshot(2));
        let rows = draw(&Scene::Dashboard(&state), 160, 60);

        assert!(contains(&rows, "Usage"));
        assert!(contains(&rows, "Show live statistics for [web]"));
        assert!(contains(&rows, "Instances running: 2"));
        assert!(contains(&rows, "Disk Usage (in MB) - Quota: 1G"));
        assert!(contains(&rows, "CPU Usage"));
        assert!(contains(&rows, "Instance 1: 50.00%"));
        assert!(contains(&rows, "Memory - Instance 0: 50% (512M / 1G)"));
        assert!(contains(&rows, "I: 1"));
    }

    #[test]
    fn dashboard_before_first_snapshot_waits() {
        let state = DashboardState::new("web");
        let rows = draw(&Scene::Dashboard(&state), 120, 40);
        assert!(contains(&rows, "Waiting for metrics..."));
        assert!(!contains(&rows, "Instance 0"));
    }

    #[test]
    fn many_instances_draw_eight_memory_gauges() {
        let mut state = DashboardState::new("web");
        state.update(&snapshot(11));
        let rows = draw(&Scene::Dashboard(&state), 200, 120);
        assert!(contains(&rows, "Memory - Instance 7:"));
        assert!(!contains(&rows, "Memory - Instance 8:"));
        assert!(contains(&rows, "Instances running: 11"));
    }

    #[test]
    fn overfull_memory_renders_without_panicking() {
        let mut stats = snapshot(1);
        let mut over = stats.get("0").cloned().expect("instance");
        over.stats.usage.memory = 3 << 30;
        stats = Statistics::from_data([("0".to_string(), over)]);
        let mut state = DashboardState::new("web");
        state.update(&stats);
        let rows = draw(&Scene::Dashboard(&state), 120, 40);
        assert!(contains(&rows, "300%"));
    }

    #[test]
    fn tiny_terminal_still_renders() {
        let mut state = DashboardState::new("web");
        state.update(&snapshot(8));
        draw(&Scene::Dashboard(&state), 20, 6);
    }

    #[test]
    fn scaling_overlay_names_app_and_target() {
        let rows = draw(
            &Scene::Scaling {
                app_name: "web",
                instances: 4,
            },
            120,
            30,
        );
        assert!(contains(&rows, "SCALING [web] TO [4] INSTANCES..."));
        assert!(contains(&rows, "Scale"));
    }
}
