// Operator tool: run generation / reconciliation jobs by hand.
//
// Dates are YYYY-MM-DD. Results are printed as JSON on stdout; logs go to stderr.

use anyhow::{bail, Context};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use classgen::app::{get_default_db_path, AppState};
use classgen::calendar::HolidayCsvImporter;
use classgen::config::{config_keys, ClassGenConfigReader};
use classgen::domain::types::EnrollmentStatus;
use classgen::engine::GenerationScope;
use classgen::scheduler::MonthlyCadence;
use classgen::DateWindow;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "classgen_cli",
    version,
    about = "Music school class generation - manual jobs"
)]
struct Cli {
    /// SQLite database path (default: CLASSGEN_DB_PATH or the platform data dir)
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the monthly job over [today, first day of the month after next)
    Monthly {
        /// Defaults to the school-local date
        today: Option<NaiveDate>,
    },
    /// Generate over an explicit [from, to) window
    Window {
        from: NaiveDate,
        to: NaiveDate,
        /// Limit to one enrollment (default: every active enrollment)
        enrollment_id: Option<i64>,
    },
    /// Onboarding generation for every active template of an enrollment
    Enrollment { enrollment_id: i64 },
    /// Onboarding generation for one template
    Template { template_id: i64 },
    /// Dry run, prints per-date decisions without writing
    Preview {
        enrollment_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    },
    /// Delete scheduled classes of a superseded template on or after as_of
    DeleteFuture { template_id: i64, as_of: NaiveDate },
    /// Cancel scheduled classes of an enrollment on or after as_of
    CancelFuture { enrollment_id: i64, as_of: NaiveDate },
    /// Change enrollment status (suspend/withdraw cancels future classes)
    Status {
        enrollment_id: i64,
        /// active | suspended | withdrawn
        #[arg(value_parser = parse_status)]
        status: EnrollmentStatus,
        /// Defaults to the school-local date
        as_of: Option<NaiveDate>,
        /// Planned end of a suspension
        #[arg(long)]
        suspended_until: Option<NaiveDate>,
    },
    /// Import exclusion days from a CSV file (columns: date,name)
    ImportHolidays { csv_path: PathBuf },
    /// List recent generation runs
    Runs {
        #[arg(default_value_t = 10)]
        limit: usize,
    },
    /// Show or change config_kv settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print stored values and the effective settings
    Show,
    /// Store a global value
    Set { key: String, value: String },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    classgen::logging::init();

    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    let state = AppState::new(db_path).context("failed to open database")?;
    state.seed_holidays()?;

    match cli.command {
        Command::Monthly { today } => {
            let today = match today {
                Some(date) => date,
                None => school_today(&state)?,
            };
            print_json(&state.generation_engine()?.run_monthly(today)?)
        }
        Command::Window {
            from,
            to,
            enrollment_id,
        } => {
            let scope = match enrollment_id {
                Some(id) => GenerationScope::Enrollment(id),
                None => GenerationScope::AllActive,
            };
            print_json(&state.generation_engine()?.run_window(DateWindow::new(from, to), scope)?)
        }
        Command::Enrollment { enrollment_id } => {
            print_json(&state.generation_engine()?.generate_for_enrollment(enrollment_id)?)
        }
        Command::Template { template_id } => {
            print_json(&state.generation_engine()?.generate_for_template(template_id)?)
        }
        Command::Preview {
            enrollment_id,
            from,
            to,
        } => print_json(
            &state
                .generation_engine()?
                .preview(DateWindow::new(from, to), GenerationScope::Enrollment(enrollment_id))?,
        ),
        Command::DeleteFuture { template_id, as_of } => {
            print_json(&state.reconciliation_engine()?.delete_future_occurrences(template_id, as_of)?)
        }
        Command::CancelFuture {
            enrollment_id,
            as_of,
        } => print_json(&state.reconciliation_engine()?.cancel_future_occurrences(enrollment_id, as_of)?),
        Command::Status {
            enrollment_id,
            status,
            as_of,
            suspended_until,
        } => {
            let as_of = match as_of {
                Some(date) => date,
                None => school_today(&state)?,
            };
            print_json(&state.reconciliation_engine()?.apply_status_change(
                enrollment_id,
                status,
                suspended_until,
                as_of,
            )?)
        }
        Command::ImportHolidays { csv_path } => print_json(&HolidayCsvImporter::import_file(
            &csv_path,
            &state.repos.exclusion_repo,
        )?),
        Command::Runs { limit } => print_json(&state.repos.run_repo.list_recent(limit)?),
        Command::Config { action } => match action.unwrap_or(ConfigAction::Show) {
            ConfigAction::Show => {
                println!("{}", state.config.get_config_snapshot()?);
                println!(
                    "effective: timezone={} day={} hour={} settings={:?}",
                    state.config.timezone()?,
                    state.config.monthly_run_day()?,
                    state.config.monthly_run_hour()?,
                    state.config.generation_settings()?
                );
                Ok(())
            }
            ConfigAction::Set { key, value } => {
                if !config_keys::ALL.contains(&key.as_str()) {
                    bail!("unknown config key: {key} (known: {})", config_keys::ALL.join(", "));
                }
                state.config.set_global_config_value(&key, &value)?;
                Ok(())
            }
        },
    }
}

fn school_today(state: &AppState) -> anyhow::Result<NaiveDate> {
    Ok(MonthlyCadence::from_config(state.config.as_ref())?.today_in(Utc::now()))
}

fn parse_status(raw: &str) -> Result<EnrollmentStatus, String> {
    EnrollmentStatus::parse(raw).ok_or_else(|| format!("unknown status: {raw} (active | suspended | withdrawn)"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
