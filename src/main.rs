//! Presensi - selfie and geofence attendance client.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::{Datelike, Local, NaiveDate, NaiveTime};
use clap::{Args, Parser, Subcommand};
use presensi as app;

use app::config::{AppConfig, ConfigLoadResult, project_dirs};
use app::eligibility::{check_submission, format_distance};
use app::export;
use app::geo::GeoPoint;
use app::models::attendance::{HistorySummary, entries_in_month};
use app::models::{AttendanceKind, LeaveKind, LeaveRequest, UpdateProfile};
use app::service::{AttendanceService, ClockOutcome, run_history_background, run_profile_background};
use app::shift::{ShiftDefinition, TimeOfDay};
use app::ticker::{FixedClock, LocalClock, spawn_shift_ticker};
use app::ui::UiState;

/// Selfie and geofence attendance client.
#[derive(Parser)]
#[command(name = "presensi")]
struct Cli {
    /// Use config.toml from current directory (dev mode)
    #[arg(long)]
    dev: bool,

    /// Also write logs to a daily rolling file
    #[arg(long)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file
    Init,
    /// Evaluate a shift string at a time of day
    Evaluate {
        /// Shift as "HH:MM - HH:MM"
        shift: String,
        /// Time of day (HH:MM or HH:MM:SS), defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Check a position against the office geofence
    Check {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
        /// Override the configured radius in meters
        #[arg(long)]
        radius: Option<f64>,
    },
    /// Log in and store the session
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Remove the stored session
    Logout,
    /// Clock in with a selfie
    ClockIn(ClockArgs),
    /// Clock out with a selfie
    ClockOut(ClockArgs),
    /// Show attendance history
    History {
        /// Month as YYYY-MM, defaults to the current month
        #[arg(long)]
        month: Option<String>,
        /// Write the listed entries to an .xlsx file
        #[arg(long)]
        export: Option<Option<PathBuf>>,
    },
    /// Submit a leave request
    Leave {
        /// sakit, cuti or izin
        kind: String,
        /// Start date (YYYY-MM-DD)
        start: NaiveDate,
        /// End date (YYYY-MM-DD)
        end: NaiveDate,
        reason: String,
    },
    /// Show or update the profile
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Keep re-evaluating the shift and print state changes
    Watch {
        /// Freeze the clock at this time of day (HH:MM or HH:MM:SS)
        #[arg(long)]
        at: Option<String>,
    },
}

#[derive(Args)]
struct ClockArgs {
    #[arg(allow_hyphen_values = true)]
    latitude: f64,
    #[arg(allow_hyphen_values = true)]
    longitude: f64,
    /// Selfie image
    #[arg(long)]
    photo: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(cli.log_file);

    // Determine config path based on mode
    let config_path = if cli.dev {
        tracing::info!("Dev mode: loading config from current directory");
        PathBuf::from("config.toml")
    } else {
        AppConfig::default_path()
    };
    tracing::debug!("Config path: {:?}", config_path);

    if let Command::Init = cli.command {
        AppConfig::default().save(&config_path)?;
        println!("Wrote default config to {}", config_path.display());
        return Ok(());
    }

    let config = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => config,
        ConfigLoadResult::Missing => {
            tracing::warn!("Config missing at {:?}, using defaults (run `presensi init`)", config_path);
            AppConfig::default()
        }
        ConfigLoadResult::Invalid(e) => bail!("Config invalid: {e}"),
    };

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let service = AttendanceService::new(config);

    match cli.command {
        Command::Init => unreachable!("handled above"),
        Command::Evaluate { shift, at } => {
            let now = parse_time_of_day(at.as_deref())?;
            let state = service.config().shift.evaluator().evaluate(&shift, now)?;
            println!("Time:            {now}");
            println!("Late:            {}", state.is_late);
            println!("Before end:      {}", state.is_before_end_shift);
            println!("Allowed time:    {}", state.is_allowed_time);
            println!("After shift:     {}", state.is_after_shift);
            println!("After grace:     {}", state.is_after_shift_plus_grace);
        }
        Command::Check {
            latitude,
            longitude,
            radius,
        } => {
            let mut office = service.config().office.clone();
            if let Some(radius) = radius {
                office.max_radius_meters = radius;
            }
            let geofence = office.geofence()?;
            match check_submission(&geofence, GeoPoint::new(latitude, longitude)?) {
                Ok(result) => println!(
                    "Inside geofence: {} from office",
                    format_distance(result.distance_meters)
                ),
                Err(reason) => println!("{reason}"),
            }
        }
        Command::Login { email, password } => {
            let session = rt.block_on(service.login(&email, &password))?;
            println!("Logged in as {} ({})", session.user.name, session.user.email);
            match session.shift_definition() {
                Ok(shift) => println!("Shift: {shift}"),
                Err(e) => println!("Warning: {}", e.user_message()),
            }
        }
        Command::Logout => {
            service.logout()?;
            println!("Logged out");
        }
        Command::ClockIn(args) => clock(&rt, &service, AttendanceKind::ClockIn, args)?,
        Command::ClockOut(args) => clock(&rt, &service, AttendanceKind::ClockOut, args)?,
        Command::History { month, export: export_to } => {
            let (year, month) = parse_month(month.as_deref())?;
            let mut ui = UiState::new();
            rt.block_on(run_history_background(&service, ui.sender()));
            ui.drain();
            if let Some(alert) = ui.alert.take() {
                bail!("{}", alert.message);
            }
            let entries = entries_in_month(&ui.history, year, month);

            for entry in &entries {
                println!(
                    "{}  {:<9}  {:<12}  {}",
                    entry.check_time.format("%Y-%m-%d %H:%M"),
                    entry.kind.label(),
                    entry.status.as_str(),
                    entry.distance_meters.map(format_distance).unwrap_or_default()
                );
            }
            let summary = HistorySummary::from_entries(&entries);
            println!(
                "{} day(s) present: {} on time, {} late, {} early leave",
                summary.days_present(),
                summary.on_time,
                summary.late,
                summary.early_leave
            );

            if let Some(path) = export_to {
                let path =
                    path.unwrap_or_else(|| PathBuf::from(export::generate_export_filename("attendance_history")));
                export::export_history_to_excel(&entries, &path)
                    .map_err(|e| app::AppError::export(e.to_string()))?;
                println!("Exported to {}", path.display());
            }
        }
        Command::Leave {
            kind,
            start,
            end,
            reason,
        } => {
            let request = LeaveRequest {
                kind: kind.parse::<LeaveKind>()?,
                start_date: start,
                end_date: end,
                reason,
            };
            let message = rt.block_on(service.submit_leave(&request))?;
            println!("{message}");
        }
        Command::Profile { name, email, phone } => {
            let update = UpdateProfile { name, email, phone };
            let profile = if update.is_empty() {
                let mut ui = UiState::new();
                rt.block_on(run_profile_background(&service, ui.sender()));
                ui.drain();
                match (ui.profile, ui.alert) {
                    (Some(profile), _) => profile,
                    (None, Some(alert)) => bail!("{}", alert.message),
                    (None, None) => bail!("Profile was not loaded"),
                }
            } else {
                rt.block_on(service.update_profile(&update))?
            };
            println!("Name:     {}", profile.name);
            println!("Email:    {}", profile.email);
            println!("Phone:    {}", profile.phone.as_deref().unwrap_or("-"));
            println!("Position: {}", profile.position.as_deref().unwrap_or("-"));
            println!("Shift:    {}", profile.shift.as_deref().unwrap_or("-"));
        }
        Command::Watch { at } => {
            let fixed = at.as_deref().map(|s| parse_time_of_day(Some(s))).transpose()?;
            rt.block_on(watch(&service, fixed))?;
        }
    }

    Ok(())
}

/// Install the console subscriber, plus a rolling file writer when requested.
fn init_logging(to_file: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let log_dir = project_dirs()
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if to_file {
        let appender = tracing_appender::rolling::daily(log_dir, "presensi.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}

fn clock(
    rt: &tokio::runtime::Runtime,
    service: &AttendanceService,
    kind: AttendanceKind,
    args: ClockArgs,
) -> anyhow::Result<()> {
    let position = GeoPoint::new(args.latitude, args.longitude)?;

    match rt.block_on(service.clock(kind, position, args.photo, TimeOfDay::now_local()))? {
        ClockOutcome::Submitted {
            status,
            distance_meters,
            message,
            warning,
        } => {
            if let Some(warning) = warning {
                println!("Warning: {warning}");
            }
            println!("{message}");
            println!("Status: {} ({} from office)", status.as_str(), format_distance(distance_meters));
        }
        ClockOutcome::Blocked(reason) => bail!("{reason}"),
    }
    Ok(())
}

async fn watch(service: &AttendanceService, fixed: Option<TimeOfDay>) -> anyhow::Result<()> {
    let session = service.session()?;
    let shift: Result<ShiftDefinition, _> = session.shift_definition();
    let settings = &service.config().shift;
    let period = Duration::from_secs(settings.tick_interval_secs);

    let mut ui = UiState::new();
    let handle = match fixed {
        Some(now) => spawn_shift_ticker(shift, settings.grace_seconds, period, FixedClock(now), ui.sender()),
        None => spawn_shift_ticker(shift, settings.grace_seconds, period, LocalClock, ui.sender()),
    };

    let mut last = None;
    let mut poll = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = poll.tick() => {
                ui.drain();
                if ui.attendance != last {
                    if let Some(alert) = &ui.alert {
                        println!("[{}] {}", alert.title, alert.message);
                    }
                    if let (Some(Ok(state)), Some(at)) = (&ui.attendance, ui.sampled_at) {
                        let clock_in = ui.can_capture(AttendanceKind::ClockIn);
                        let clock_out = ui.can_capture(AttendanceKind::ClockOut);
                        println!(
                            "{at}  late={} allowed={} after_shift={} after_grace={}  clock-in={} clock-out={}",
                            state.is_late,
                            state.is_allowed_time,
                            state.is_after_shift,
                            state.is_after_shift_plus_grace,
                            if clock_in { "enabled" } else { "disabled" },
                            if clock_out { "enabled" } else { "disabled" },
                        );
                    }
                    last = ui.attendance.clone();
                }
            }
        }
    }

    handle.abort();
    Ok(())
}

fn parse_time_of_day(raw: Option<&str>) -> anyhow::Result<TimeOfDay> {
    let Some(raw) = raw else {
        return Ok(TimeOfDay::now_local());
    };
    let time = NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .with_context(|| format!("Invalid time '{raw}', expected HH:MM or HH:MM:SS"))?;
    Ok(TimeOfDay::from(time))
}

fn parse_month(raw: Option<&str>) -> anyhow::Result<(i32, u32)> {
    let Some(raw) = raw else {
        let today = Local::now().date_naive();
        return Ok((today.year(), today.month()));
    };
    let date = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{raw}', expected YYYY-MM"))?;
    Ok((date.year(), date.month()))
}
