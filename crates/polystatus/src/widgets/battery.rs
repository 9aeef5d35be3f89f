//! Battery renderer.
//!
//! [`BatteryModel`] is the pure state machine: it takes readings, decides
//! which timers should be running and renders one markup line.
//! [`BatteryRenderer`] owns the model on the GLib main loop and funnels
//! every signal and timer callback through [`BatteryRenderer::dispatch`].

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use gio::prelude::*;
use polystatus_core::color::Rgb;
use polystatus_core::config::BatteryConfig;
use polystatus_core::markup::{FG_END, fg};
use tracing::{debug, info, warn};

use crate::services::battery::{self, BatteryReading, ChargeState};
use crate::services::notify::{Notification, Urgency};
use crate::services::process::SystemRunner;
use crate::widgets::emit_stdout;

const COLOR_CHARGING: &str = "#00FF00";
const COLOR_DISCHARGING: &str = "#00BCD4";
const COLOR_FULL: &str = "#00FF00";
const COLOR_CRITICAL_DIM: &str = "#333333";

/// Emptiest to fullest.
pub const ICONS_RAMP: [&str; 5] = ["\u{f244}", "\u{f243}", "\u{f242}", "\u{f241}", "\u{f240}"];
pub const ICON_FULL: &str = "\u{f240}";

/// Discharging gradient: high above 75%, mid at 30%, low at 0%.
const COLOR_HIGH: Rgb = Rgb(0, 188, 212);
const COLOR_MID: Rgb = Rgb(255, 165, 0);
const COLOR_LOW: Rgb = Rgb(255, 0, 0);
const HIGH_POINT: f64 = 75.0;
const MID_POINT: f64 = 30.0;

const CRITICAL_PERCENT: u32 = 5;

/// Displayed percentage: truncated, except that anything from 99% up shows
/// as 100 so trickle charging never looks stuck at 99.
pub fn display_percent(percent: f64) -> u32 {
    if percent >= 99.0 { 100 } else { percent as u32 }
}

/// Ramp glyph for a discharging battery: five equal-width buckets.
pub fn icon_for_percent(percent: f64) -> &'static str {
    let idx = ((percent / 20.0) as usize).min(ICONS_RAMP.len() - 1);
    ICONS_RAMP[idx]
}

/// Colour token for a discharging battery.
pub fn discharging_color(percent: f64) -> String {
    if percent > HIGH_POINT {
        return fg(COLOR_DISCHARGING);
    }

    let rgb = if percent > MID_POINT {
        let t = (HIGH_POINT - percent) / (HIGH_POINT - MID_POINT);
        COLOR_HIGH.lerp(COLOR_MID, t)
    } else {
        let t = (MID_POINT - percent) / MID_POINT;
        COLOR_MID.lerp(COLOR_LOW, t)
    };
    fg(&rgb.to_hex())
}

/// Text colour while charging. Walks white to green across each whole
/// percent using the fractional part.
pub fn charging_text_color(percent: f64) -> String {
    let t = percent - percent.trunc();
    fg(&Rgb::WHITE.lerp(Rgb::GREEN, t).to_hex())
}

/// Which repeating timers should be running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPlan {
    pub animation: bool,
    pub blink: bool,
}

/// Renderer state.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryModel {
    pub state: ChargeState,
    /// Range 0.0-100.0.
    pub percent: f64,
    /// Index into [`ICONS_RAMP`] for the charging animation.
    pub anim_frame: usize,
    /// Critical blink phase; `true` is the red phase.
    pub blink_on: bool,
    /// The low-battery notification has fired for the current episode.
    pub notified: bool,
}

impl Default for BatteryModel {
    fn default() -> Self {
        Self {
            state: ChargeState::Unknown,
            percent: 0.0,
            anim_frame: 0,
            blink_on: true,
            notified: false,
        }
    }
}

impl BatteryModel {
    fn truncated(&self) -> u32 {
        self.percent as u32
    }

    fn is_plugged(&self) -> bool {
        matches!(self.state, ChargeState::Charging | ChargeState::Full)
    }

    /// Low enough to blink and not on mains power.
    pub fn is_critical(&self) -> bool {
        self.truncated() <= CRITICAL_PERCENT && !self.is_plugged()
    }

    /// Take a new reading. Returns `true` when the low-battery notification
    /// should fire: the first discharging reading of a critical episode.
    pub fn apply_reading(&mut self, reading: BatteryReading) -> bool {
        self.percent = reading.percent.clamp(0.0, 100.0);
        self.state = reading.state;

        if !self.is_critical() {
            self.notified = false;
            return false;
        }
        if self.state == ChargeState::Discharging && !self.notified {
            self.notified = true;
            return true;
        }
        false
    }

    pub fn timer_plan(&self) -> TimerPlan {
        TimerPlan {
            animation: self.state == ChargeState::Charging,
            blink: self.is_critical(),
        }
    }

    pub fn advance_frame(&mut self) {
        self.anim_frame = (self.anim_frame + 1) % ICONS_RAMP.len();
    }

    pub fn toggle_blink(&mut self) {
        self.blink_on = !self.blink_on;
    }

    /// Called whenever the blink timer goes away.
    pub fn stop_blink(&mut self) {
        self.blink_on = true;
    }

    pub fn render(&self) -> String {
        let pct = display_percent(self.percent);

        if pct <= CRITICAL_PERCENT && !self.is_plugged() {
            let color = if self.blink_on {
                COLOR_LOW.to_hex()
            } else {
                COLOR_CRITICAL_DIM.to_string()
            };
            return format!("{}{} {}%{}", fg(&color), ICONS_RAMP[0], pct, FG_END);
        }

        match self.state {
            ChargeState::Charging if pct < 99 => format!(
                "{}{} {}{}%{}",
                fg(COLOR_CHARGING),
                ICONS_RAMP[self.anim_frame % ICONS_RAMP.len()],
                charging_text_color(self.percent),
                pct,
                FG_END
            ),
            ChargeState::Charging | ChargeState::Full => {
                format!("{}{} {}%{}", fg(COLOR_FULL), ICON_FULL, pct, FG_END)
            }
            ChargeState::Discharging | ChargeState::Unknown => format!(
                "{}{} {}%{}",
                discharging_color(self.percent),
                icon_for_percent(self.percent),
                pct,
                FG_END
            ),
        }
    }
}

/// Everything that can wake the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryEvent {
    /// A `PropertiesChanged` signal from UPower.
    PropertiesChanged,
    /// The periodic sysfs poll.
    PollTick,
    /// Charging animation frame.
    AnimationTick,
    /// Critical blink phase.
    BlinkTick,
}

/// Owns the model and its timers on the GLib main loop.
pub struct BatteryRenderer {
    config: BatteryConfig,
    /// Quit when the bar stops reading our output.
    main_loop: glib::MainLoop,
    model: RefCell<BatteryModel>,
    anim_timer: RefCell<Option<glib::SourceId>>,
    blink_timer: RefCell<Option<glib::SourceId>>,
    poll_timer: RefCell<Option<glib::SourceId>>,
    _signal_subscription: RefCell<Option<gio::SignalSubscription>>,
}

impl BatteryRenderer {
    pub fn new(config: BatteryConfig, main_loop: glib::MainLoop) -> Rc<Self> {
        Rc::new(Self {
            config,
            main_loop,
            model: RefCell::new(BatteryModel::default()),
            anim_timer: RefCell::new(None),
            blink_timer: RefCell::new(None),
            poll_timer: RefCell::new(None),
            _signal_subscription: RefCell::new(None),
        })
    }

    /// Initial read, first line of output, then subscribe and start polling.
    pub fn start(this: &Rc<Self>) {
        let connection = match gio::bus_get_sync(gio::BusType::System, None::<&gio::Cancellable>) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("System bus unavailable, relying on sysfs polling: {}", e);
                None
            }
        };

        let initial = this.read_sysfs();
        let needs_fallback = initial.is_none_or(|r| r.percent == 0.0);
        let reading = match (&connection, needs_fallback) {
            (Some(conn), true) => {
                debug!("sysfs gave no reading, querying UPower");
                battery::query_upower(conn, &this.config.upower_path()).or(initial)
            }
            _ => initial,
        };
        if let Some(reading) = reading {
            this.apply(reading);
        }
        this.sync_timers();
        this.emit();

        if let Some(conn) = connection {
            let this_weak = Rc::downgrade(this);
            let sub = conn.subscribe_to_signal(
                Some("org.freedesktop.UPower"),
                Some("org.freedesktop.DBus.Properties"),
                Some("PropertiesChanged"),
                None, // any object path
                None,
                gio::DBusSignalFlags::NONE,
                move |_signal| {
                    if let Some(this) = this_weak.upgrade() {
                        this.dispatch(BatteryEvent::PropertiesChanged);
                    }
                },
            );
            this._signal_subscription.replace(Some(sub));
        }

        let this_weak = Rc::downgrade(this);
        let poll = glib::timeout_add_seconds_local(this.config.poll_interval_secs, move || {
            match this_weak.upgrade() {
                Some(this) => this.dispatch(BatteryEvent::PollTick),
                None => glib::ControlFlow::Break,
            }
        });
        this.poll_timer.replace(Some(poll));
    }

    /// Single entry point for every callback. The return value is handed
    /// back to GLib for timer sources.
    pub fn dispatch(self: &Rc<Self>, event: BatteryEvent) -> glib::ControlFlow {
        match event {
            BatteryEvent::PropertiesChanged | BatteryEvent::PollTick => {
                if let Some(reading) = self.read_sysfs() {
                    self.apply(reading);
                    self.sync_timers();
                    self.emit();
                }
                glib::ControlFlow::Continue
            }
            BatteryEvent::AnimationTick => {
                {
                    let mut model = self.model.borrow_mut();
                    if !model.timer_plan().animation {
                        // Returning Break destroys the source; just forget the id.
                        self.anim_timer.take();
                        return glib::ControlFlow::Break;
                    }
                    model.advance_frame();
                }
                self.emit();
                glib::ControlFlow::Continue
            }
            BatteryEvent::BlinkTick => {
                {
                    let mut model = self.model.borrow_mut();
                    if !model.timer_plan().blink {
                        model.stop_blink();
                        self.blink_timer.take();
                        return glib::ControlFlow::Break;
                    }
                    model.toggle_blink();
                }
                self.emit();
                glib::ControlFlow::Continue
            }
        }
    }

    fn read_sysfs(&self) -> Option<BatteryReading> {
        match battery::read_sysfs(&self.config.device_dir(), &self.config.adapter_dir()) {
            Ok(reading) => Some(reading),
            Err(e) => {
                debug!("sysfs read failed: {}", e);
                None
            }
        }
    }

    fn apply(&self, reading: BatteryReading) {
        let notify = self.model.borrow_mut().apply_reading(reading);
        if notify {
            info!("Battery critical at {:.1}%", reading.percent);
            Notification::new("Batería Baja", "5% restante")
                .urgency(Urgency::Critical)
                .send(&SystemRunner);
        }
    }

    /// Start or stop the animation and blink timers to match the model.
    fn sync_timers(self: &Rc<Self>) {
        let plan = self.model.borrow().timer_plan();

        if plan.animation {
            if self.anim_timer.borrow().is_none() {
                let id = self.start_timer(self.config.animation_interval_ms, BatteryEvent::AnimationTick);
                self.anim_timer.replace(Some(id));
            }
        } else if let Some(id) = self.anim_timer.take() {
            id.remove();
        }

        if plan.blink {
            if self.blink_timer.borrow().is_none() {
                let id = self.start_timer(self.config.blink_interval_ms, BatteryEvent::BlinkTick);
                self.blink_timer.replace(Some(id));
            }
        } else if let Some(id) = self.blink_timer.take() {
            id.remove();
            self.model.borrow_mut().stop_blink();
        }
    }

    fn start_timer(self: &Rc<Self>, interval_ms: u64, event: BatteryEvent) -> glib::SourceId {
        let this_weak = Rc::downgrade(self);
        glib::timeout_add_local(Duration::from_millis(interval_ms), move || {
            match this_weak.upgrade() {
                Some(this) => this.dispatch(event),
                None => glib::ControlFlow::Break,
            }
        })
    }

    fn emit(&self) {
        let line = self.model.borrow().render();
        if let Err(e) = emit_stdout(&line) {
            warn!("Cannot write battery status, stopping: {}", e);
            self.main_loop.quit();
        }
    }
}

impl Drop for BatteryRenderer {
    fn drop(&mut self) {
        for timer in [&self.anim_timer, &self.blink_timer, &self.poll_timer] {
            if let Some(id) = timer.borrow_mut().take() {
                id.remove();
            }
        }
    }
}

/// Run the renderer until SIGINT/SIGTERM.
pub fn run(config: BatteryConfig) {
    let main_loop = glib::MainLoop::new(None, false);

    for signum in [libc::SIGINT, libc::SIGTERM] {
        let main_loop = main_loop.clone();
        glib::unix_signal_add_local(signum, move || {
            main_loop.quit();
            glib::ControlFlow::Break
        });
    }

    let renderer = BatteryRenderer::new(config, main_loop.clone());
    BatteryRenderer::start(&renderer);
    main_loop.run();
    debug!("Battery renderer stopped");
}
