use anyhow::{bail, Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tabled::{settings::Style, Table, Tabled};
use tracing::{error, info, warn};

use edgescore::config::AppConfig;
use edgescore::database::Database;
use edgescore::edge_score::ComponentLabel;
use edgescore::error::EdgeError;
use edgescore::events::{compute_event_plan, EventType};
use edgescore::logging::init_logging;
use edgescore::models::{CheckIn, Chronotype, SleepRecord, UserProfile};
use edgescore::physiology::{run_simulation, ClockTime, ClockWindow, CustomFactors, Scenario};
use edgescore::prediction::{Evaluation, PredictionEngine, PredictionResult, RiskLevel};
use edgescore::store::HistoryStore;

/// EdgeScore - Sleep-driven cognitive performance CLI
///
/// Logs nightly sleep and daily check-ins, then models sleep pressure,
/// circadian alignment and the day's Edge Score from that history.
#[derive(Parser)]
#[command(name = "edgescore")]
#[command(version)]
#[command(about = "Sleep-driven cognitive performance modeling", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides the database path from the config
    #[arg(long, value_name = "FILE")]
    database: Option<PathBuf>,

    /// User to act on (defaults to settings.default_user)
    #[arg(short, long)]
    user: Option<String>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record one night of sleep, filed under the wake-up date
    LogSleep {
        /// Wake-up date (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Total sleep in minutes (derived from bedtime and wake when omitted)
        #[arg(long)]
        duration: Option<u32>,

        /// Subjective quality 1-5
        #[arg(short, long)]
        quality: Option<u8>,

        /// Bedtime (HH:MM); evening times fall on the previous day
        #[arg(short, long)]
        bedtime: Option<ClockTime>,

        /// Wake time (HH:MM)
        #[arg(short, long)]
        wake: Option<ClockTime>,

        /// Caffeine after 2pm
        #[arg(long)]
        caffeine: bool,

        /// Alcohol before bed
        #[arg(long)]
        alcohol: bool,

        /// Exercised during the day
        #[arg(long)]
        exercise: bool,

        /// Screen time before bed in minutes
        #[arg(long)]
        screen_minutes: Option<u32>,

        /// Daytime nap in minutes
        #[arg(long)]
        nap_minutes: Option<u32>,
    },

    /// Record a daily subjective check-in
    CheckIn {
        /// Date (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Perceived sleep quality 1-10
        #[arg(long)]
        sleep_quality: Option<u8>,

        /// Mental clarity 1-10
        #[arg(long)]
        clarity: Option<u8>,

        /// Energy 1-5
        #[arg(long)]
        energy: Option<u8>,

        /// Stress 1-10
        #[arg(long)]
        stress: Option<u8>,
    },

    /// Show or update the user profile
    Profile {
        /// IANA timezone name
        #[arg(long)]
        timezone: Option<String>,

        /// early, intermediate or late
        #[arg(long)]
        chronotype: Option<Chronotype>,

        /// Chronological age in years
        #[arg(long)]
        age: Option<u32>,
    },

    /// Run the prediction pipeline for a day
    Evaluate {
        /// Day to evaluate (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,

        /// Compare this bedtime (HH:MM) against biological readiness
        #[arg(long)]
        planned_bedtime: Option<ClockTime>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Cache the result in the database
        #[arg(long)]
        save: bool,

        /// Return the cached result when one exists
        #[arg(long)]
        cached: bool,
    },

    /// Project how an evening scenario may affect tonight's sleep
    Simulate {
        /// late_dinner, two_drinks, red_eye_flight, screen_90_before_bed or custom
        scenario: String,

        /// Custom: time of the last drink (HH:MM)
        #[arg(long)]
        alcohol_at: Option<ClockTime>,

        /// Custom: bedtime shift in minutes, negative for earlier
        #[arg(long, allow_hyphen_values = true)]
        bedtime_shift: Option<i32>,

        /// Custom: nap length in minutes
        #[arg(long)]
        nap_minutes: Option<u32>,

        /// Custom: screen time before bed in minutes
        #[arg(long)]
        screen_minutes: Option<u32>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Plan the nights before an important event
    PlanEvent {
        /// Edge Score to reach on the day
        #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(0..=100))]
        target: u8,

        /// Days until the event
        #[arg(long)]
        days: u32,

        /// Travelling within 48h of the event
        #[arg(long)]
        travel: bool,

        /// board_meeting, fundraise, earnings_call, product_launch, court_case, conference or custom
        #[arg(long, default_value = "custom")]
        event_type: EventType,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show row counts per table
    Stats,

    /// Manage the configuration file
    Config {
        /// Print the effective configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(short, long)]
        init: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            ExitCode::FAILURE
        }
    }
}

/// Log the failure at its severity and print a message for the user
fn report_failure(err: &anyhow::Error) {
    if let Some(edge) = err.downcast_ref::<EdgeError>() {
        let level = edge.severity().to_tracing_level();
        if level == tracing::Level::WARN {
            warn!(error = %edge, "command refused");
        } else {
            error!(error = %edge, severity = ?edge.severity(), "command failed");
        }
    }
    eprintln!("{} {}", "✗".red().bold(), failure_message(err).red());
}

fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<EdgeError>() {
        Some(edge) => edge.user_message(),
        None => format!("{:#}", err),
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(AppConfig::default_config_path);
    let mut config = AppConfig::load_or_default_from(&config_path);

    let mut log_config = config.logging.clone();
    log_config.level = log_config.level.raised_by(cli.verbose);
    init_logging(&log_config)?;

    let database_path = cli
        .database
        .clone()
        .unwrap_or_else(|| config.settings.database_path.clone());
    let user = cli
        .user
        .clone()
        .unwrap_or_else(|| config.settings.default_user.clone());
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Config { show, init } => {
            if init {
                if config_path.exists() {
                    bail!("Config already exists at {}", config_path.display());
                }
                config.save_to_file(&config_path)?;
                println!(
                    "{}",
                    format!("✓ Wrote default config to {}", config_path.display()).green()
                );
            }
            if show || !init {
                let rendered = toml::to_string_pretty(&config)
                    .context("Failed to render configuration")?;
                println!("{}", format!("# {}", config_path.display()).dimmed());
                println!("{}", rendered);
            }
        }

        Commands::LogSleep {
            date,
            duration,
            quality,
            bedtime,
            wake,
            caffeine,
            alcohol,
            exercise,
            screen_minutes,
            nap_minutes,
        } => {
            let date = date.unwrap_or(today);
            let (bed_ts, wake_ts) = night_timestamps(date, bedtime, wake);
            let duration = duration.or_else(|| match (bed_ts, wake_ts) {
                (Some(b), Some(w)) => u32::try_from((w - b).num_minutes()).ok(),
                _ => None,
            });

            let record = SleepRecord {
                duration_minutes: duration,
                quality_rating: quality,
                bedtime: bed_ts,
                wake_time: wake_ts,
                caffeine_after_2pm: Some(caffeine),
                alcohol_tonight: Some(alcohol),
                exercise_today: Some(exercise),
                screen_time_minutes: screen_minutes,
                nap_duration_minutes: nap_minutes,
                ..SleepRecord::new(date)
            };

            let mut db = Database::new(&database_path)?;
            db.upsert_sleep_record(&user, &record)?;
            info!(user = %user, date = %date, "sleep record stored");
            println!(
                "{}",
                format!("✓ Logged sleep for {} ({})", date, user).green()
            );
        }

        Commands::CheckIn {
            date,
            sleep_quality,
            clarity,
            energy,
            stress,
        } => {
            let date = date.unwrap_or(today);
            let checkin = CheckIn {
                sleep_quality,
                mental_clarity: clarity,
                energy_rating: energy,
                stress_level: stress,
                ..CheckIn::new(date)
            };

            let mut db = Database::new(&database_path)?;
            db.upsert_checkin(&user, &checkin)?;
            println!(
                "{}",
                format!("✓ Logged check-in for {} ({})", date, user).green()
            );
        }

        Commands::Profile {
            timezone,
            chronotype,
            age,
        } => {
            let mut db = Database::new(&database_path)?;
            let mut profile = db.fetch_profile(&user)?.unwrap_or_default();
            let changed = timezone.is_some() || chronotype.is_some() || age.is_some();

            if let Some(tz) = timezone {
                profile.timezone = tz;
            }
            if let Some(c) = chronotype {
                profile.chronotype = c;
            }
            if age.is_some() {
                profile.age = age;
            }

            if changed {
                db.update_profile(&user, &profile)?;
                println!("{}", "✓ Profile updated".green());
            }
            print_profile(&user, &profile);
        }

        Commands::Evaluate {
            date,
            planned_bedtime,
            json,
            save,
            cached,
        } => {
            let date = date.unwrap_or(today);
            let mut db = Database::new(&database_path)?;

            let cached_result = if cached {
                db.load_prediction(&user, date)?
            } else {
                None
            };

            let evaluation = match cached_result {
                Some(result) => Evaluation::Complete(Box::new(result)),
                None => {
                    let engine = PredictionEngine::with_config(&db, config.model.clone());
                    engine.evaluate_with_plan(&user, date, planned_bedtime)?
                }
            };

            if save {
                if let Some(result) = evaluation.result() {
                    db.save_prediction(result)?;
                    info!(user = %user, date = %date, "prediction cached");
                }
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&evaluation)?);
            } else {
                match &evaluation {
                    Evaluation::Complete(result) => print_result(result),
                    Evaluation::InsufficientData { sleep_records } => {
                        println!(
                            "{}",
                            format!(
                                "Not enough sleep history: {} of {} nights logged",
                                sleep_records, config.model.min_sleep_records
                            )
                            .yellow()
                        );
                    }
                }
            }
        }

        Commands::Simulate {
            scenario,
            alcohol_at,
            bedtime_shift,
            nap_minutes,
            screen_minutes,
            json,
        } => {
            let factors = CustomFactors {
                alcohol_at,
                bedtime_shift_minutes: bedtime_shift,
                nap_minutes,
                screen_minutes,
            };
            let scenario = Scenario::from_name(&scenario, factors)?;
            let outcome = run_simulation(&scenario);

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!("{}", "What if".cyan().bold());
                println!("  REM:      {}", outcome.rem_suppression_estimate);
                println!("  Latency:  {}", outcome.sleep_latency_change);
                println!("  Windows:  {}", outcome.cognitive_window_shift);
                println!();
                println!("{}", outcome.summary);
            }
        }

        Commands::PlanEvent {
            target,
            days,
            travel,
            event_type,
            json,
        } => {
            let plan = compute_event_plan(target, days, travel);
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                println!(
                    "{}",
                    format!("{} plan: Edge Score {} in {} days", event_type, target, days)
                        .cyan()
                        .bold()
                );
                println!(
                    "  Sleep:     {}h{:02}m for the next {} nights",
                    plan.sleep_target_minutes / 60,
                    plan.sleep_target_minutes % 60,
                    plan.preparation_nights
                );
                println!("  Bedtime:   {}", plan.optimal_bedtime);
                if plan.recovery_days > 0 {
                    println!(
                        "  {}",
                        format!("Travel: allow {} recovery day", plan.recovery_days).yellow()
                    );
                }
            }
        }

        Commands::Stats => {
            let db = Database::new(&database_path)?;
            let stats = db.get_stats()?;
            println!("{}", "Database".cyan().bold());
            println!("  Path:          {}", database_path.display());
            println!("  Sleep records: {}", stats.sleep_records);
            println!("  Check-ins:     {}", stats.check_ins);
            println!("  Profiles:      {}", stats.user_profiles);
            println!("  Predictions:   {}", stats.predictions);
        }
    }

    Ok(())
}

/// Place clock times on the night ending on `date`
fn night_timestamps(
    date: NaiveDate,
    bedtime: Option<ClockTime>,
    wake: Option<ClockTime>,
) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    let wake_ts = wake.map(|w| date.and_time(w.to_naive_time()));
    let bed_ts = bedtime.map(|b| {
        let same_day = match wake {
            Some(w) => b < w,
            None => b.minutes() < 12 * 60,
        };
        let bed_date = if same_day {
            date
        } else {
            date - Duration::days(1)
        };
        bed_date.and_time(b.to_naive_time())
    });
    (bed_ts, wake_ts)
}

fn print_profile(user: &str, profile: &UserProfile) {
    println!("{}", format!("Profile: {}", user).cyan().bold());
    println!("  Timezone:   {}", profile.timezone);
    println!("  Chronotype: {}", profile.chronotype);
    match profile.age {
        Some(age) => println!("  Age:        {}", age),
        None => println!("  Age:        {}", "not set".dimmed()),
    }
}

#[derive(Tabled)]
struct WindowRow {
    #[tabled(rename = "Window")]
    name: &'static str,
    #[tabled(rename = "Start")]
    start: ClockTime,
    #[tabled(rename = "End")]
    end: ClockTime,
}

impl WindowRow {
    fn new(name: &'static str, window: &ClockWindow) -> Self {
        WindowRow {
            name,
            start: window.start,
            end: window.end,
        }
    }
}

#[derive(Tabled)]
struct ProjectionRow {
    #[tabled(rename = "Hour")]
    hour: u8,
    #[tabled(rename = "No change")]
    baseline: String,
    #[tabled(rename = "Full recovery")]
    recovery: String,
    #[tabled(rename = "Partial")]
    partial: String,
}

fn colored_label(label: ComponentLabel) -> ColoredString {
    match label {
        ComponentLabel::Strong => label.as_str().green(),
        ComponentLabel::Moderate => label.as_str().normal(),
        ComponentLabel::SlightlyReduced => label.as_str().yellow(),
        ComponentLabel::Reduced => label.as_str().red(),
    }
}

fn print_result(result: &PredictionResult) {
    let score = result.edge_score.to_string();
    let score = match result.edge_score {
        80..=100 => score.green().bold(),
        60..=79 => score.yellow().bold(),
        _ => score.red().bold(),
    };
    println!(
        "{} {}  {}",
        format!("Edge Score for {} on {}:", result.user_id, result.date).bold(),
        score,
        format!("({} scoring)", result.scoring_mode).dimmed()
    );
    println!("  Strategic clarity:    {}", colored_label(result.strategic_clarity));
    println!("  Emotional regulation: {}", colored_label(result.emotional_regulation));
    println!("  Cognitive stamina:    {}", colored_label(result.cognitive_stamina));
    if !result.defaulted_inputs.is_empty() {
        let missing: Vec<String> = result
            .defaulted_inputs
            .iter()
            .map(|d| d.to_string())
            .collect();
        println!("  {}", format!("Unavailable: {}", missing.join(", ")).dimmed());
    }

    let risk = result.risk_level.to_string();
    let risk = match result.risk_level {
        RiskLevel::Low => risk.green(),
        RiskLevel::Elevated => risk.yellow(),
        RiskLevel::High => risk.red(),
    };
    println!();
    println!("{} {}  {}", "Risk:".bold(), risk, result.risk_level.description());
    for rule in &result.triggered_rules {
        println!("  • {}", rule);
    }
    for action in &result.protocol_actions {
        println!("  → {}", action.text);
    }

    if let Some(pressure) = &result.sleep_pressure {
        println!();
        println!("{}", "Sleep pressure".cyan().bold());
        println!("  Residual:  {:.1}%", pressure.sleep_pressure_pct);
        println!(
            "  Dip:       {}-{}",
            pressure.cognitive_dip_window.start, pressure.cognitive_dip_window.end
        );
        println!("  Recovery:  {}h", pressure.recovery_time_estimate);
    }

    if let Some(circadian) = &result.circadian {
        println!();
        println!("{}", "Circadian alignment".cyan().bold());
        println!(
            "  {:.0}% ({}): {}",
            circadian.circadian_alignment_pct,
            circadian.interpretation,
            circadian.interpretation.description()
        );
        println!(
            "  Readiness {}  avg bedtime {}  offset {:+} min",
            circadian.biological_readiness_time,
            circadian.avg_bedtime_7d,
            circadian.bedtime_vs_brt_minutes
        );
    }

    let arch = &result.sleep_architecture;
    println!();
    println!("{}", "Sleep architecture".cyan().bold());
    println!(
        "  N3 {:.1}%  REM {:.1}%  efficiency {:.1}%  fragmentation risk {:.0}",
        arch.predicted_n3_pct,
        arch.predicted_rem_pct,
        arch.predicted_efficiency,
        arch.fragmentation_risk
    );
    if let Some(note) = &arch.rem_shift_note {
        println!("  {}", note.dimmed());
    }

    if let Some(age) = &result.sleep_age {
        println!(
            "  Cognitive sleep age {} (age {}), driver: {}",
            age.cognitive_sleep_age, age.chronological_age, age.sleep_age_driver
        );
        if let Some(disclaimer) = &result.sleep_age_disclaimer {
            println!("  {}", disclaimer.dimmed());
        }
    }

    let windows = &result.cognitive_windows;
    let rows = vec![
        WindowRow::new("Deep work", &windows.deep_work),
        WindowRow::new("Emotional regulation", &windows.emotional_regulation),
        WindowRow::new("Reaction-time dip", &windows.reaction_time_dip),
        WindowRow::new("Creative insight", &windows.creative_insight),
    ];
    println!();
    println!("{}", "Cognitive windows".cyan().bold());
    println!("{}", Table::new(rows).with(Style::rounded()));

    let peaks = &result.peak_windows;
    let rows = vec![
        WindowRow::new("Strategic", &peaks.strategic),
        WindowRow::new("Execution", &peaks.execution),
        WindowRow::new("Recovery", &peaks.recovery),
    ];
    println!("{}", "Peak windows".cyan().bold());
    println!("{}", Table::new(rows).with(Style::rounded()));

    if let Some(projection) = &result.projection_72h {
        let rows: Vec<ProjectionRow> = projection
            .baseline
            .iter()
            .zip(&projection.recovery)
            .zip(&projection.partial)
            .map(|((b, r), p)| ProjectionRow {
                hour: b.hour_offset,
                baseline: format!("{:.0}", b.score),
                recovery: format!("{:.0}", r.score),
                partial: format!("{:.0}", p.score),
            })
            .collect();
        println!();
        println!(
            "{}",
            format!(
                "72h projection (advance bedtime {} min)",
                projection.bedtime_advance_minutes
            )
            .cyan()
            .bold()
        );
        println!("{}", Table::new(rows).with(Style::rounded()));
    }

    if let Some(drift) = &result.drift {
        println!();
        println!(
            "{} {}  14d {:+.1}%  5d {:+.1}%",
            "Drift:".bold(),
            drift.status,
            drift.drift_pct_14d,
            drift.drift_pct_5d
        );
    }

    if !result.insights.is_empty() {
        println!();
        println!("{}", "Insights".cyan().bold());
        for insight in &result.insights {
            println!("  {}", insight);
        }
    }

    let rec = &result.recommendations;
    println!();
    println!("{}", "Tonight".cyan().bold());
    if let Some(bedtime) = rec.optimal_bedtime {
        println!("  Bedtime:  {}", bedtime);
    }
    if let Some(nap) = &rec.nap_suggestion {
        println!("  Nap:      {}", nap);
    }
    println!("  Tip:      {}", rec.wind_down_tip);
}
