use crate::{dashboard::DashboardState, surface::Surface, ui::Scene};
use cfstat_core::Statistics;
use serde::Serialize;
use std::io::{self, Write};

/// Output side of the event loop: the terminal dashboard or the JSON
/// emitter used with `--debug`.
pub trait Presenter {
    fn present(&mut self, stats: &Statistics) -> io::Result<()>;

    fn redraw(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn scaling(&mut self, _app_name: &str, _instances: usize) -> io::Result<()> {
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct Dashboard<S: Surface> {
    state: DashboardState,
    surface: S,
}

impl<S: Surface> Dashboard<S> {
    pub fn new(state: DashboardState, surface: S) -> Self {
        Self { state, surface }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<S: Surface> Presenter for Dashboard<S> {
    fn present(&mut self, stats: &Statistics) -> io::Result<()> {
        self.state.update(stats);
        self.redraw()
    }

    fn redraw(&mut self) -> io::Result<()> {
        self.surface.draw(&Scene::Dashboard(&self.state))
    }

    fn scaling(&mut self, app_name: &str, instances: usize) -> io::Result<()> {
        self.surface.draw(&Scene::Scaling {
            app_name,
            instances,
        })
    }

    fn release(&mut self) -> io::Result<()> {
        self.surface.release()
    }
}

#[derive(Serialize)]
struct DebugLine<'a, T: Serialize> {
    instance_index: &'a str,
    metrics: &'a T,
}

/// Writes one JSON line per instance and snapshot: the usage block, or the
/// whole instance record when `full` is set.
pub struct DebugEmitter<W: Write> {
    out: W,
    full: bool,
}

impl<W: Write> DebugEmitter<W> {
    pub fn new(out: W, full: bool) -> Self {
        Self { out, full }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for DebugEmitter<W> {
    fn present(&mut self, stats: &Statistics) -> io::Result<()> {
        for (index, instance) in stats.iter() {
            let line = if self.full {
                serde_json::to_string(&DebugLine {
                    instance_index: index,
                    metrics: instance,
                })
            } else {
                serde_json::to_string(&DebugLine {
                    instance_index: index,
                    metrics: &instance.stats.usage,
                })
            }?;
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::TerminalSurface;
    use cfstat_core::testing::stats_body;
    use ratatui::backend::TestBackend;
    use serde_json::Value;

    fn parse(body: &str) -> Statistics {
        Statistics::parse(&[body.to_string()]).expect("stats")
    }

    #[test]
    fn debug_emits_usage_per_instance() {
        let stats = parse(&stats_body(&[("0", 0.25, 10, 100), ("1", 0.5, 20, 100)]));
        let mut emitter = DebugEmitter::new(Vec::new(), false);
        emitter.present(&stats).expect("present");

        let out = String::from_utf8(emitter.into_inner()).expect("utf8");
        let lines: Vec<Value> = out
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["instance_index"], "0");
        assert_eq!(lines[1]["metrics"]["cpu"], 0.5);
        assert_eq!(lines[1]["metrics"]["mem"], 20);
        assert!(lines[0]["metrics"].get("state").is_none());
    }

    #[test]
    fn debug_full_emits_whole_record() {
        let stats = parse(&stats_body(&[("0", 0.25, 10, 100)]));
        let mut emitter = DebugEmitter::new(Vec::new(), true);
        emitter.present(&stats).expect("present");

        let out = String::from_utf8(emitter.into_inner()).expect("utf8");
        let line: Value = serde_json::from_str(out.trim()).expect("json line");
        assert_eq!(line["metrics"]["state"], "RUNNING");
        assert_eq!(line["metrics"]["stats"]["mem_quota"], 100);
        assert_eq!(line["metrics"]["stats"]["usage"]["mem"], 10);
    }

    #[test]
    fn debug_is_not_capped_at_eight() {
        let entries: Vec<(String, f64, u64, u64)> = (0..10)
            .map(|i| (i.to_string(), 0.1, 1, 10))
            .collect();
        let borrowed: Vec<(&str, f64, u64, u64)> = entries
            .iter()
            .map(|(i, cpu, mem, quota)| (i.as_str(), *cpu, *mem, *quota))
            .collect();
        let stats = parse(&stats_body(&borrowed));
        let mut emitter = DebugEmitter::new(Vec::new(), false);
        emitter.present(&stats).expect("present");
        let out = String::from_utf8(emitter.into_inner()).expect("utf8");
        assert_eq!(out.lines().count(), 10);
    }

    #[test]
    fn dashboard_updates_state_then_draws() {
        let surface = TerminalSurface::headless(TestBackend::new(120, 40)).expect("surface");
        let mut dashboard = Dashboard::new(DashboardState::new("web"), surface);
        let stats = parse(&stats_body(&[("0", 0.25, 10, 100)]));

        dashboard.present(&stats).expect("present");
        assert_eq!(dashboard.state().cpu().len(), 1);
        assert_eq!(dashboard.state().memory()[0].percent, 10);

        dashboard.release().expect("release");
        assert!(dashboard.surface().is_released());
    }
}
