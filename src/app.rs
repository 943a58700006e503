use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::KeyCode;
use tracing::{error, info};

use crate::config::Config;
use crate::control::{ControlState, Param};
use crate::driver::TickDriver;
use crate::error::Result;
use crate::sampler::{RandSource, TickSample};
use crate::series::SeriesStore;

// Main application state
pub struct App {
    pub control: ControlState,
    pub store: SeriesStore,
    pub driver: TickDriver,
    pub selected: Param,
    pub should_quit: bool,
    source: RandSource,
}

impl App {
    pub fn new(config: &Config) -> App {
        let source = match config.seed {
            Some(seed) => RandSource::seeded(seed),
            None => RandSource::from_entropy(),
        };
        App {
            control: config.initial_controls(),
            store: SeriesStore::new(),
            driver: TickDriver::new(Duration::from_millis(config.tick_rate_ms.max(1))),
            selected: Param::default(),
            should_quit: false,
            source,
        }
    }

    pub fn start(&mut self, now: Instant) {
        info!(
            request_rate = self.control.request_rate(),
            batch_size = self.control.batch_size(),
            max_tokens = self.control.max_tokens(),
            generating = self.control.is_generating(),
            period_ms = self.driver.period().as_millis() as u64,
            "sampling started"
        );
        self.driver.start(now);
    }

    pub fn shutdown(&mut self) {
        self.driver.stop();
        self.should_quit = true;
    }

    /// Fires the driver if its deadline has passed.
    pub fn on_tick(&mut self, now: Instant) -> Result<Option<TickSample>> {
        if !self.driver.due(now) {
            return Ok(None);
        }
        self.driver.fire(
            now,
            Local::now(),
            &self.control,
            &mut self.store,
            &mut self.source,
        )
    }

    pub fn on_key(&mut self, code: KeyCode, now: Instant) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.shutdown(),
            KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => self.selected = self.selected.next(),
            KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => {
                self.selected = self.selected.prev()
            }
            KeyCode::Right | KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char('l') => {
                self.adjust_selected(1, now)
            }
            KeyCode::Left | KeyCode::Char('-') | KeyCode::Char('h') => self.adjust_selected(-1, now),
            KeyCode::Char(' ') | KeyCode::Char('g') => {
                if self.control.toggle_generating() {
                    self.driver.rearm(now);
                }
            }
            KeyCode::Char('r') => self.reset_controls(now),
            _ => {}
        }
    }

    fn adjust_selected(&mut self, steps: i64, now: Instant) {
        let changed = self.control.adjust(self.selected, steps);
        // only the parameters the sampler reads restart the clock
        if changed && self.selected == Param::RequestRate {
            self.driver.rearm(now);
        }
    }

    /// Puts every parameter back to its default and stops traffic.
    fn reset_controls(&mut self, now: Instant) {
        let defaults = ControlState::default();
        let rate_changed = self.control.set_request_rate(i64::from(defaults.request_rate()));
        self.control.set_batch_size(i64::from(defaults.batch_size()));
        self.control.set_max_tokens(i64::from(defaults.max_tokens()));
        let mode_changed = self.control.set_generating(defaults.is_generating());
        if rate_changed || mode_changed {
            self.driver.rearm(now);
        }
    }

    /// Runs a tick and logs instead of propagating; a failed append only
    /// costs one sample.
    pub fn tick_or_log(&mut self, now: Instant) {
        if let Err(err) = self.on_tick(now) {
            error!(%err, invalid_argument = err.is_invalid_argument(), "tick failed");
        }
    }
}
