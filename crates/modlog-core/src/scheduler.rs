use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ScheduleConfig;
use crate::error::{ModlogError, Result};

/// A callback the scheduler invokes when its schedule comes due.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

/// Persistent state for a single schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleState {
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: DateTime<Utc>,
    pub run_count: u64,
    pub last_error: Option<String>,
}

/// Cron scheduler that invokes registered [`ScheduledJob`]s.
///
/// Fire times are computed in server-local time. Runs are fire-and-forget:
/// a failing job is logged and recorded in its state, never retried. State
/// can be persisted so a run missed while the process was down fires on
/// restart.
pub struct Scheduler {
    schedules: Vec<ScheduleConfig>,
    parsed: Vec<Option<Schedule>>,
    jobs: HashMap<String, Arc<dyn ScheduledJob>>,
    state: HashMap<String, ScheduleState>,
    state_path: Option<PathBuf>,
}

impl Scheduler {
    /// Create a scheduler from config entries.
    ///
    /// Invalid cron expressions are logged as warnings and skipped.
    pub fn new(schedules: Vec<ScheduleConfig>, state_path: Option<PathBuf>) -> Self {
        let now = Utc::now();
        let mut parsed = Vec::new();
        let mut state = HashMap::new();

        for config in &schedules {
            match parse_cron_expr(&config.cron) {
                Ok(schedule) => {
                    let next_run =
                        next_after(&schedule, now).unwrap_or(now + chrono::Duration::hours(24));
                    state.insert(
                        config.name.clone(),
                        ScheduleState {
                            last_run: None,
                            next_run,
                            run_count: 0,
                            last_error: None,
                        },
                    );
                    parsed.push(Some(schedule));
                }
                Err(e) => {
                    warn!("Invalid cron expression for '{}': {}", config.name, e);
                    parsed.push(None);
                }
            }
        }

        Self {
            schedules,
            parsed,
            jobs: HashMap::new(),
            state,
            state_path,
        }
    }

    /// Register the callback for a job name referenced by `ScheduleConfig::job`.
    pub fn register(&mut self, job: impl Into<String>, callback: Arc<dyn ScheduledJob>) {
        self.jobs.insert(job.into(), callback);
    }

    /// Load persisted state from disk, merging with current state.
    ///
    /// Past `next_run` values are kept so missed schedules fire on the next tick.
    pub fn load_state(&mut self) -> Result<()> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        let contents = std::fs::read_to_string(path)?;
        let loaded: HashMap<String, ScheduleState> = serde_json::from_str(&contents)?;

        for (name, loaded_state) in loaded {
            if let Some(current) = self.state.get_mut(&name) {
                current.last_run = loaded_state.last_run;
                current.run_count = loaded_state.run_count;
                current.last_error = loaded_state.last_error;
                current.next_run = loaded_state.next_run;
            }
        }
        Ok(())
    }

    /// Save current state to disk.
    pub fn save_state(&self) -> Result<()> {
        let Some(path) = &self.state_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Run the scheduler loop forever.
    pub async fn run(mut self) {
        let enabled_count = self
            .schedules
            .iter()
            .zip(self.parsed.iter())
            .filter(|(s, p)| s.enabled && p.is_some())
            .count();
        info!("Scheduler started with {} active schedule(s)", enabled_count);

        if let Err(e) = self.load_state() {
            warn!("Failed to load scheduler state: {}", e);
        }

        loop {
            let due = self.tick();
            if !due.is_empty() {
                self.fire(&due).await;
                if let Err(e) = self.save_state() {
                    warn!("Failed to save scheduler state: {}", e);
                }
            }

            let sleep_duration = self.time_until_next_fire();
            debug!("Scheduler sleeping for {:?}", sleep_duration);
            tokio::time::sleep(sleep_duration).await;
        }
    }

    /// Check all schedules against the current time.
    pub fn tick(&mut self) -> Vec<String> {
        self.tick_at(Utc::now())
    }

    /// Return the names of schedules due at `now` and advance their next run.
    pub fn tick_at(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut due = Vec::new();

        for (i, config) in self.schedules.iter().enumerate() {
            if !config.enabled {
                continue;
            }
            let Some(parsed) = &self.parsed[i] else {
                continue;
            };
            let Some(state) = self.state.get_mut(&config.name) else {
                continue;
            };

            if now >= state.next_run {
                debug!("Schedule due: {}", config.name);
                due.push(config.name.clone());

                state.last_run = Some(now);
                state.run_count += 1;
                if let Some(next) = next_after(parsed, now) {
                    state.next_run = next;
                }
            }
        }

        due
    }

    /// Invoke the jobs bound to the given schedules, recording failures.
    pub async fn fire(&mut self, names: &[String]) {
        for name in names {
            let Some(config) = self.schedules.iter().find(|s| &s.name == name) else {
                continue;
            };
            let outcome = match self.jobs.get(&config.job) {
                Some(job) => job.run().await.map_err(|e| e.to_string()),
                None => Err(format!("no job registered as '{}'", config.job)),
            };
            if let Err(e) = &outcome {
                warn!("Scheduled job '{}' failed: {}", name, e);
            }
            if let Some(state) = self.state.get_mut(name) {
                state.last_error = outcome.err();
            }
        }
    }

    /// Calculate the duration until the next schedule should fire.
    pub fn time_until_next_fire(&self) -> std::time::Duration {
        let now = Utc::now();
        let earliest = self
            .schedules
            .iter()
            .zip(self.parsed.iter())
            .filter(|(config, parsed)| config.enabled && parsed.is_some())
            .filter_map(|(config, _)| self.state.get(&config.name))
            .map(|state| state.next_run)
            .min();

        match earliest {
            Some(next) if next > now => (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(60)),
            Some(_) => std::time::Duration::from_millis(0),
            None => std::time::Duration::from_secs(3600),
        }
    }

    /// Get a reference to the internal state (for testing/observability).
    pub fn state(&self) -> &HashMap<String, ScheduleState> {
        &self.state
    }
}

fn next_after(schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    schedule
        .after(&now.with_timezone(&Local))
        .next()
        .map(|t| t.with_timezone(&Utc))
}

/// Parse a cron expression, normalizing 5-field standard cron to 7-field format.
///
/// The `cron` crate expects `sec min hour dom month dow [year]`; standard
/// cron uses `min hour dom month dow`.
pub fn parse_cron_expr(expr: &str) -> Result<Schedule> {
    let normalized = normalize_cron_fields(expr);
    Schedule::from_str(&normalized).map_err(|e| ModlogError::Cron {
        expr: expr.to_string(),
        message: e.to_string(),
    })
}

fn normalize_cron_fields(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    match fields.len() {
        5 => format!("0 {} *", expr),
        _ => expr.to_string(),
    }
}
