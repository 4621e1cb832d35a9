use cfstat_core::{Statistics, MAX_DISPLAYED_INSTANCES};
use chrono::{DateTime, Local};
use std::{collections::VecDeque, time::Duration};

/// Samples kept per CPU series.
pub const CPU_WINDOW: usize = 400;

const TERABYTE: u64 = 1 << 40;
const GIGABYTE: u64 = 1 << 30;
const MEGABYTE: u64 = 1 << 20;
const KILOBYTE: u64 = 1 << 10;

#[derive(Clone, Debug, PartialEq)]
pub struct CpuSeries {
    pub title: String,
    pub height: u16,
    samples: VecDeque<u64>,
}

impl CpuSeries {
    fn new() -> Self {
        Self {
            title: String::new(),
            height: 0,
            samples: VecDeque::from(vec![0; CPU_WINDOW]),
        }
    }

    fn push(&mut self, sample: u64) {
        self.samples.pop_front();
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// The newest `count` samples, oldest first.
    pub fn latest(&self, count: usize) -> Vec<u64> {
        let skip = self.samples.len().saturating_sub(count);
        self.samples.iter().skip(skip).copied().collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryGauge {
    pub label: String,
    pub percent: u32,
    pub height: u16,
}

impl MemoryGauge {
    /// Gauges can only draw 0..=100; the label keeps the real value.
    pub fn fill_percent(&self) -> u16 {
        self.percent.min(100) as u16
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskBar {
    pub label: String,
    pub megabytes: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiskPanel {
    pub title: String,
    pub bars: Vec<DiskBar>,
    pub bar_width: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub instances: usize,
    pub uptime: Duration,
    pub up_since: DateTime<Local>,
    pub total_cpu: f64,
    pub memory_used: u64,
    pub memory_quota: u64,
    pub disk_used: u64,
    pub disk_quota: u64,
}

impl Summary {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Instances running: {}", self.instances),
            String::new(),
            format!("Uptime: {}", humantime::format_duration(self.uptime)),
            format!("Up Since: {}", self.up_since.format("%a, %d %b %Y %H:%M %z")),
            String::new(),
            format!("Total CPU Usage: {:.4}%", self.total_cpu * 100.0),
            format!(
                "Total Memory Usage: {} / {}",
                byte_size(self.memory_used),
                byte_size(self.memory_quota)
            ),
            format!(
                "Total Disk Usage: {} / {}",
                byte_size(self.disk_used),
                byte_size(self.disk_quota)
            ),
        ]
    }
}

/// View model behind the dashboard. Only [`DashboardState::update`] writes
/// to it, once per snapshot.
#[derive(Clone, Debug)]
pub struct DashboardState {
    app_name: String,
    cpu: Vec<CpuSeries>,
    cpu_height: u16,
    memory: Vec<MemoryGauge>,
    disk: DiskPanel,
    summary: Option<Summary>,
}

impl DashboardState {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            cpu: Vec::new(),
            cpu_height: panel_total_height(0, 0),
            memory: Vec::new(),
            disk: DiskPanel {
                title: disk_title(0),
                bars: Vec::new(),
                bar_width: bar_width(0),
            },
            summary: None,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn cpu(&self) -> &[CpuSeries] {
        &self.cpu
    }

    /// Rows the CPU panel wants, borders included.
    pub fn cpu_height(&self) -> u16 {
        self.cpu_height
    }

    pub fn memory(&self) -> &[MemoryGauge] {
        &self.memory
    }

    pub fn disk(&self) -> &DiskPanel {
        &self.disk
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn update(&mut self, stats: &Statistics) {
        self.update_at(stats, Local::now());
    }

    pub fn update_at(&mut self, stats: &Statistics, now: DateTime<Local>) {
        self.adjust_cpu(stats);
        self.adjust_memory(stats);
        self.adjust_disk(stats);
        self.adjust_summary(stats, now);
    }

    fn adjust_cpu(&mut self, stats: &Statistics) {
        let displayed = stats.displayed_count();
        self.cpu.truncate(displayed);
        while self.cpu.len() < displayed {
            self.cpu.push(CpuSeries::new());
        }

        let height = shrink(12, displayed);
        for (series, (position, (_, instance))) in
            self.cpu.iter_mut().zip(stats.displayed().enumerate())
        {
            let cpu = instance.stats.usage.cpu;
            series.push(cpu_sample(cpu));
            series.title = format!("Instance {position}: {:.2}%", cpu * 100.0);
            series.height = height;
        }
        self.cpu_height = panel_total_height(self.cpu.len(), displayed);
    }

    fn adjust_memory(&mut self, stats: &Statistics) {
        let height = shrink(13, stats.displayed_count());
        self.memory = stats
            .displayed()
            .enumerate()
            .map(|(position, (_, instance))| {
                let used = instance.stats.usage.memory;
                let quota = instance.stats.memory_quota;
                let percent = memory_percent(used, quota);
                MemoryGauge {
                    label: format!(
                        "Memory - Instance {position}: {percent}% ({} / {})",
                        byte_size(used),
                        byte_size(quota)
                    ),
                    percent,
                    height,
                }
            })
            .collect();
    }

    fn adjust_disk(&mut self, stats: &Statistics) {
        let mut quota = 0;
        let mut bars = Vec::with_capacity(stats.displayed_count());
        for (position, (_, instance)) in stats.displayed().enumerate() {
            bars.push(DiskBar {
                label: format!("I: {position}"),
                megabytes: instance.stats.usage.disk / MEGABYTE,
            });
            quota = instance.stats.disk_quota;
        }
        self.disk = DiskPanel {
            title: disk_title(quota),
            bars,
            bar_width: bar_width(stats.displayed_count()),
        };
    }

    fn adjust_summary(&mut self, stats: &Statistics, now: DateTime<Local>) {
        let mut summary = Summary {
            instances: stats.len(),
            uptime: Duration::ZERO,
            up_since: now,
            total_cpu: 0.0,
            memory_used: 0,
            memory_quota: 0,
            disk_used: 0,
            disk_quota: 0,
        };
        let mut uptime = 0;
        for (_, instance) in stats.iter() {
            let instance = &instance.stats;
            uptime = uptime.max(instance.uptime);
            summary.total_cpu += instance.usage.cpu;
            summary.memory_used += instance.usage.memory;
            summary.memory_quota += instance.memory_quota;
            summary.disk_used += instance.usage.disk;
            summary.disk_quota += instance.disk_quota;
        }
        summary.uptime = Duration::from_secs(uptime);
        summary.up_since = chrono::Duration::from_std(summary.uptime)
            .ok()
            .and_then(|uptime| now.checked_sub_signed(uptime))
            .unwrap_or(now);
        self.summary = Some(summary);
    }
}

/// CPU fraction scaled to basis points, rounded up.
pub fn cpu_sample(cpu: f64) -> u64 {
    (cpu.max(0.0) * 10_000.0).ceil() as u64
}

pub fn memory_percent(used: u64, quota: u64) -> u32 {
    if quota == 0 {
        return 0;
    }
    ((used as f64 / quota as f64) * 100.0).ceil() as u32
}

/// Short byte notation: `0`, `512B`, `1.5K`, `256M`, `1G`.
pub fn byte_size(bytes: u64) -> String {
    let (value, unit) = match bytes {
        0 => return "0".to_string(),
        b if b >= TERABYTE => (b as f64 / TERABYTE as f64, "T"),
        b if b >= GIGABYTE => (b as f64 / GIGABYTE as f64, "G"),
        b if b >= MEGABYTE => (b as f64 / MEGABYTE as f64, "M"),
        b if b >= KILOBYTE => (b as f64 / KILOBYTE as f64, "K"),
        b => (b as f64, "B"),
    };
    let formatted = format!("{value:.1}");
    let trimmed = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{trimmed}{unit}")
}

fn shrink(base: u16, displayed: usize) -> u16 {
    base - displayed.min(MAX_DISPLAYED_INSTANCES) as u16
}

fn panel_total_height(series: usize, displayed: usize) -> u16 {
    series as u16 * shrink(13, displayed) + 2
}

fn bar_width(displayed: usize) -> u16 {
    shrink(20, displayed)
}

fn disk_title(quota: u64) -> String {
    format!("Disk Usage (in MB) - Quota: {}", byte_size(quota))
}
