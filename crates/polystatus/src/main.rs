//! polystatus - status-bar modules and rofi menus for bspwm + polybar.
//!
//! Every module is a subcommand. Bar modules print polybar markup on stdout,
//! one line per update; logs go to stderr.

mod menus;
mod services;
mod widgets;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info, warn};

use polystatus_core::{Config, logging};

use crate::menus::bluetooth::BluetoothMenu;
use crate::menus::picker::RofiPicker;
use crate::menus::wifi::WifiMenu;
use crate::services::process::SystemRunner;
use crate::widgets::{
    battery, bluetooth_guard, bluetooth_status, cava, sysmon, temperature, volume, workspaces,
};

/// polystatus - polybar modules and rofi menus
#[derive(Parser, Debug)]
#[command(name = "polystatus", version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (uses XDG lookup if not specified)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print example configuration and exit
    #[arg(long)]
    print_example_config: bool,

    /// Validate configuration and exit (returns non-zero on errors)
    #[arg(long)]
    check_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Battery icon with charging animation and critical blink
    Battery,
    /// Bluetooth adapter state glyph
    BluetoothStatus,
    /// Pause media players whenever a Bluetooth device disconnects
    BluetoothGuard,
    /// bspwm desktops with occupancy heatmap
    Workspaces,
    /// Keep cava listening to the default sink's monitor
    CavaInput,
    /// Interactive Bluetooth manager
    BluetoothMenu {
        /// Keep results of the previous scan
        #[arg(long)]
        keep_scan_cache: bool,
    },
    /// Interactive Wi-Fi manager
    WifiMenu,
    /// CPU, RAM or GPU usage
    Sysmon {
        #[arg(value_enum)]
        metric: Metric,
    },
    /// CPU temperature
    Temperature {
        #[command(subcommand)]
        action: Option<TemperatureAction>,
    },
    /// Default sink volume
    Volume,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Metric {
    Cpu,
    Ram,
    Gpu,
}

#[derive(Subcommand, Debug)]
enum TemperatureAction {
    /// Show or hide the numeric reading
    Toggle,
}

fn main() -> ExitCode {
    let args = Args::parse();

    logging::init(args.verbose);

    if args.print_example_config {
        print!("{}", polystatus_core::config::DEFAULT_CONFIG_TOML);
        return ExitCode::SUCCESS;
    }

    // If --config is specified, it must exist and be valid (no fallback)
    let load_result = match Config::find_and_load(args.config.as_deref()) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(ref source) = load_result.source {
        info!("Loaded configuration from {:?}", source);
    } else if load_result.used_defaults {
        debug!("Using default configuration (no config file found)");
    }

    let config = load_result.config;

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    if args.check_config {
        if let Some(ref source) = load_result.source {
            println!("Configuration valid: {}", source.display());
        } else {
            println!("Configuration valid (using defaults)");
        }
        if args.verbose > 0 {
            println!("\n{}", config.summary());
        }
        return ExitCode::SUCCESS;
    }

    match args.command {
        Some(command) => handle_command(command, config),
        None => {
            eprintln!("Error: no subcommand given (see --help)");
            ExitCode::FAILURE
        }
    }
}

fn handle_command(command: Command, config: Config) -> ExitCode {
    match command {
        Command::Battery => {
            battery::run(config.battery);
            ExitCode::SUCCESS
        }
        Command::BluetoothStatus => {
            println!("{}", bluetooth_status::status());
            ExitCode::SUCCESS
        }
        Command::BluetoothGuard => exit_with(bluetooth_guard::run()),
        Command::Workspaces => exit_with(workspaces::run(&SystemRunner).map_err(Into::into)),
        Command::CavaInput => exit_with(cava::run(&SystemRunner, &config.cava)),
        Command::BluetoothMenu { keep_scan_cache } => {
            handle_bluetooth_menu(&config, keep_scan_cache)
        }
        Command::WifiMenu => {
            let picker = RofiPicker::new(&SystemRunner, &config.menu);
            WifiMenu::new(&SystemRunner, &picker).run();
            ExitCode::SUCCESS
        }
        Command::Sysmon { metric } => handle_sysmon_command(metric, &config),
        Command::Temperature { action } => handle_temperature_command(action, &config),
        Command::Volume => exit_with(volume::run(&SystemRunner).map_err(Into::into)),
    }
}

fn exit_with(result: anyhow::Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn handle_bluetooth_menu(config: &Config, keep_scan_cache: bool) -> ExitCode {
    if !keep_scan_cache && let Err(e) = menus::bluetooth::clear_scan_cache(&config.bluetooth) {
        warn!(
            "Could not remove {}: {}",
            config.bluetooth.scan_cache.display(),
            e
        );
    }

    let picker = RofiPicker::new(&SystemRunner, &config.menu);
    BluetoothMenu::new(&SystemRunner, &picker, &config.bluetooth).run();
    ExitCode::SUCCESS
}

fn handle_sysmon_command(metric: Metric, config: &Config) -> ExitCode {
    let line = match metric {
        Metric::Cpu => sysmon::cpu(&config.system),
        Metric::Ram => sysmon::ram(&config.system),
        Metric::Gpu => Ok(sysmon::gpu(&SystemRunner, &config.system)),
    };

    match line {
        Ok(line) => {
            println!("{}", line);
            ExitCode::SUCCESS
        }
        Err(e) => {
            warn!("Failed to read {:?} usage: {}", metric, e);
            ExitCode::FAILURE
        }
    }
}

fn handle_temperature_command(action: Option<TemperatureAction>, config: &Config) -> ExitCode {
    let state_file = &config.temperature.state_file;

    match action {
        Some(TemperatureAction::Toggle) => match temperature::toggle(state_file) {
            Ok(shown) => {
                debug!("Temperature text {}", if shown { "shown" } else { "hidden" });
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: cannot toggle {}: {}", state_file.display(), e);
                ExitCode::FAILURE
            }
        },
        None => {
            if let Some(line) = temperature::status(&config.temperature) {
                println!("{}", line);
            }
            ExitCode::SUCCESS
        }
    }
}
