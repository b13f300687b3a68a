use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};

mod app_state;
mod config;
mod console;
mod datetime;
mod duration;
mod favorite_command;
mod favorites;
mod ledger;
mod logger;
mod odoo;
mod remote;
mod remote_command;
mod state_file;
mod submission;
mod submit_command;
mod ticker;
mod timer;
mod timer_command;
mod timesheet;

use app_state::AppState;
use config::Config;
use console::{ConsoleMarkdownList, ConsolePresenter};
use favorite_command::{FavoriteArgs, FavoriteCommand};
use odoo::OdooClient;
use remote_command::{RemoteCommand, TasksArgs, TimesheetsArgs};
use state_file::StateFile;
use submit_command::SubmitCommand;
use timer::View;
use timer_command::{TimerArgs, TimerCommand};

/// ローカルで計測した時間をOdooのタイムシートとして登録するCLIアプリケーション。
///
/// # Examples
/// ```text
/// $ cargo run -- timer start task 42
/// $ cargo run -- timer stop
/// $ cargo run -- submit
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(
        long = "log-level",
        default_value = "info",
        global = true,
        help = "off, error, warn, info, debug or trace",
        parse(try_from_str = logger::parse_level),
    )]
    log_level: LevelFilter,

    #[clap(subcommand)]
    subcommand: SubCommands,
}

/// サブコマンドを表す列挙型。
#[derive(Debug, Subcommand)]
enum SubCommands {
    /// Show the user of the Odoo session
    Whoami,
    /// List my open tasks
    Tasks(TasksArgs),
    /// Show the timesheet hours of a task per user
    Timesheets(TimesheetsArgs),
    /// Manage local timers
    Timer(TimerArgs),
    /// Manage favorite tasks and projects
    Favorite(FavoriteArgs),
    /// Show or set the current view
    View(ViewArgs),
    /// Submit all timers as timesheet lines
    Submit,
}

/// `view`サブコマンドの引数。
#[derive(Debug, clap::Args)]
struct ViewArgs {
    #[clap(help = "today, in-the-zone or report")]
    view: Option<View>,
}

impl SubCommands {
    /// Odooのセッションが必須のサブコマンドか。
    fn requires_session(&self) -> bool {
        matches!(
            self,
            Self::Whoami | Self::Tasks(_) | Self::Timesheets(_) | Self::Submit
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::setup_logger(args.log_level)?;

    let config = Config::from_env().context("Failed to load configuration")?;
    let session_id = if args.subcommand.requires_session() {
        config.require_session_id()?.to_string()
    } else {
        config.session_id.clone().unwrap_or_default()
    };
    let odoo = OdooClient::new(&config.odoo_url, session_id);

    let state_file = StateFile::new(config.state_path.clone());
    let mut state = AppState::restore(state_file.load().context("Failed to load timers")?);
    info!("Loaded {} timers.", state.ledger.len());

    let mut stdout = io::stdout();
    let mut presenter = ConsoleMarkdownList::new(&mut stdout);
    let result = run(args.subcommand, &odoo, &mut state, &mut presenter).await;

    // 失敗したコマンドでもそれまでの変更は保存する
    state_file
        .save(&state.snapshot())
        .context("Failed to save timers")?;

    result
}

async fn run<P: ConsolePresenter>(
    subcommand: SubCommands,
    odoo: &OdooClient,
    state: &mut AppState,
    presenter: &mut P,
) -> Result<()> {
    match subcommand {
        SubCommands::Whoami => RemoteCommand::new(odoo).whoami(state, presenter).await,
        SubCommands::Tasks(tasks) => RemoteCommand::new(odoo).tasks(state, tasks, presenter).await,
        SubCommands::Timesheets(timesheets) => {
            RemoteCommand::new(odoo)
                .timesheets(state, timesheets, presenter)
                .await
        }
        SubCommands::Timer(timer) => TimerCommand::new(odoo).run(state, timer, presenter).await,
        SubCommands::Favorite(favorite) => {
            FavoriteCommand::new(odoo)
                .run(state, favorite, presenter)
                .await
        }
        SubCommands::View(view) => {
            if let Some(view) = view.view {
                state.set_current_view(view);
            }
            presenter.show_view(state.current_view)
        }
        SubCommands::Submit => SubmitCommand::new(odoo).run(state, presenter).await,
    }
}
