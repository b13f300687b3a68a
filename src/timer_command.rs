use std::num::NonZeroU64;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::app_state::AppState;
use crate::console::ConsolePresenter;
use crate::datetime::now;
use crate::remote::OdooRepository;
use crate::ticker::Ticker;
use crate::timer::{ResourceKey, ResourceType};

/// タスクまたはプロジェクトを指定する位置引数。
#[derive(Debug, clap::Args)]
pub struct ResourceArgs {
    #[clap(help = "Resource type: task or project")]
    pub resource_type: ResourceType,

    #[clap(help = "Odoo id of the task or project")]
    pub id: i64,
}

impl ResourceArgs {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.id, self.resource_type)
    }
}

/// `timer`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct TimerArgs {
    #[clap(subcommand)]
    action: TimerAction,
}

#[derive(Debug, clap::Subcommand)]
enum TimerAction {
    /// Start a timer, stopping the running one
    Start(StartArgs),
    /// Stop the running timer
    Stop(StopArgs),
    /// Delete a timer
    Delete(ResourceArgs),
    /// Overwrite the accrued minutes of a timer
    SetDuration(SetDurationArgs),
    /// Round the accrued minutes up to the next step
    AddDuration(AddDurationArgs),
    /// Set the description sent with the timesheet line
    Describe(DescribeArgs),
    /// Rename a timer
    Rename(RenameArgs),
    /// Record minutes without running a timer
    Add(AddArgs),
    /// List timers
    List,
    /// Print the running timer periodically until Ctrl-C
    Watch(WatchArgs),
}

#[derive(Debug, clap::Args)]
struct StartArgs {
    #[clap(flatten)]
    resource: ResourceArgs,

    #[clap(long = "name", help = "Name of the timer, looked up in Odoo if omitted")]
    name: Option<String>,

    #[clap(
        long = "bonus",
        default_value = "0",
        help = "Minutes added when starting"
    )]
    bonus: f64,
}

#[derive(Debug, clap::Args)]
struct StopArgs {
    #[clap(
        long = "only",
        help = "Stop only if this resource is running, as `task:ID` or `project:ID`",
        parse(try_from_str = parse_resource_key),
    )]
    only: Option<ResourceKey>,
}

#[derive(Debug, clap::Args)]
struct SetDurationArgs {
    #[clap(flatten)]
    resource: ResourceArgs,

    #[clap(help = "Accrued minutes")]
    minutes: f64,
}

#[derive(Debug, clap::Args)]
struct AddDurationArgs {
    #[clap(flatten)]
    resource: ResourceArgs,

    #[clap(long = "step", default_value = "15", help = "Step in minutes")]
    step: f64,
}

#[derive(Debug, clap::Args)]
struct DescribeArgs {
    #[clap(flatten)]
    resource: ResourceArgs,

    #[clap(help = "Description of the work")]
    text: String,
}

#[derive(Debug, clap::Args)]
struct RenameArgs {
    #[clap(flatten)]
    resource: ResourceArgs,

    #[clap(help = "New name")]
    name: String,
}

#[derive(Debug, clap::Args)]
struct AddArgs {
    #[clap(flatten)]
    resource: ResourceArgs,

    #[clap(long = "minutes", default_value = "15", help = "Minutes to record")]
    minutes: f64,

    #[clap(long = "description", default_value = "", help = "Description of the work")]
    description: String,

    #[clap(long = "name", help = "Name of the timer, looked up in Odoo if omitted")]
    name: Option<String>,
}

#[derive(Debug, clap::Args)]
struct WatchArgs {
    #[clap(
        long = "interval",
        default_value = "60",
        help = "Seconds between updates"
    )]
    interval: NonZeroU64,
}

pub struct TimerCommand<'a, T: OdooRepository> {
    odoo: &'a T,
}

impl<'a, T: OdooRepository> TimerCommand<'a, T> {
    /// 新しい`TimerCommand`を返す。
    ///
    /// # Arguments
    /// * `odoo` - タイマー名の問い合わせに使うリポジトリ
    pub fn new(odoo: &'a T) -> Self {
        Self { odoo }
    }

    /// `timer`サブコマンドの処理を行う。
    ///
    /// 台帳を変更した後、`watch`以外はタイマー一覧を表示する。
    pub async fn run<P: ConsolePresenter>(
        &self,
        state: &mut AppState,
        args: TimerArgs,
        presenter: &mut P,
    ) -> Result<()> {
        match args.action {
            TimerAction::Start(start) => {
                let key = start.resource.key();
                let name = self.timer_name(state, key, start.name).await?;
                state
                    .ledger
                    .start(key, &name, start.bonus)
                    .with_context(|| format!("Failed to start {}", key))?;
                info!("Started {}", key);
            }
            TimerAction::Stop(stop) => {
                let stopped = match stop.only {
                    Some(key) => state.ledger.stop(&key).then_some(key),
                    None => state.ledger.stop_running_timer(),
                };
                match stopped {
                    Some(key) => info!("Stopped {}", key),
                    None => info!("No timer was stopped"),
                }
            }
            TimerAction::Delete(resource) => {
                let key = resource.key();
                let removed = state
                    .ledger
                    .delete(&key)
                    .with_context(|| format!("Failed to delete {}", key))?;
                info!("Deleted {} ({})", key, removed.resource_name);
            }
            TimerAction::SetDuration(set) => {
                let key = set.resource.key();
                state
                    .ledger
                    .set_duration(&key, set.minutes)
                    .with_context(|| format!("Failed to set duration of {}", key))?;
            }
            TimerAction::AddDuration(add) => {
                let key = add.resource.key();
                state
                    .ledger
                    .add_duration(&key, add.step)
                    .with_context(|| format!("Failed to add duration to {}", key))?;
            }
            TimerAction::Describe(describe) => {
                let key = describe.resource.key();
                state
                    .ledger
                    .set_description(&key, &describe.text)
                    .with_context(|| format!("Failed to describe {}", key))?;
            }
            TimerAction::Rename(rename) => {
                let key = rename.resource.key();
                state
                    .ledger
                    .rename(&key, &rename.name)
                    .with_context(|| format!("Failed to rename {}", key))?;
            }
            TimerAction::Add(add) => {
                let key = add.resource.key();
                let name = self.timer_name(state, key, add.name).await?;
                state
                    .ledger
                    .add_timer(key, &name, add.minutes, &add.description)
                    .with_context(|| format!("Failed to add {}", key))?;
                info!("Recorded {} minutes on {}", add.minutes, key);
            }
            TimerAction::List => {}
            TimerAction::Watch(watch) => {
                return watch_running_timer(
                    state,
                    Duration::from_secs(watch.interval.get()),
                    presenter,
                )
                .await;
            }
        }

        presenter.show_timers(state.ledger.timers(), &now())
    }

    /// 指定がなければお気に入り・台帳・Odooの順に名前を探す。
    async fn timer_name(
        &self,
        state: &AppState,
        key: ResourceKey,
        name: Option<String>,
    ) -> Result<String> {
        match name {
            Some(name) if !name.is_empty() => Ok(name),
            _ => state
                .resolve_resource_name(self.odoo, key)
                .await
                .with_context(|| format!("Failed to look up {}", key)),
        }
    }
}

/// 計測中のタイマーを`period`ごとに表示する。Ctrl-Cか計測中のタイマーがなくなるまで続ける。
async fn watch_running_timer<P: ConsolePresenter>(
    state: &AppState,
    period: Duration,
    presenter: &mut P,
) -> Result<()> {
    let mut ticker = Ticker::spawn(period)?;
    loop {
        tokio::select! {
            tick = ticker.tick() => {
                match tick {
                    Some(tick) => debug!("Refreshing at {:?}", tick.at),
                    None => break,
                }
                match state.ledger.running_timer() {
                    Some(timer) => presenter.show_timers(std::slice::from_ref(timer), &now())?,
                    None => {
                        info!("No timer is running");
                        break;
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
        }
    }
    Ok(())
}

/// `task:12`形式のキーをパースする。
fn parse_resource_key(s: &str) -> Result<ResourceKey> {
    let (resource_type, id) = s
        .split_once(':')
        .with_context(|| format!("Expected TYPE:ID, got {}", s))?;
    let resource_type = resource_type.parse::<ResourceType>()?;
    let id = id
        .parse::<i64>()
        .with_context(|| format!("Failed to parse id: {}", id))?;
    Ok(ResourceKey::new(id, resource_type))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mockall::predicate::eq;
    use rstest::rstest;

    use super::*;
    use crate::console::ConsoleMarkdownList;
    use crate::datetime::mock_clock;
    use crate::duration::BILLING_STEP_MINUTES;
    use crate::remote::{MockOdooRepository, RemoteError, ResourceInfo};

    fn resource(resource_type: ResourceType, id: i64) -> ResourceArgs {
        ResourceArgs { resource_type, id }
    }

    fn start(resource_type: ResourceType, id: i64, name: Option<&str>) -> TimerArgs {
        TimerArgs {
            action: TimerAction::Start(StartArgs {
                resource: resource(resource_type, id),
                name: name.map(str::to_string),
                bonus: 0.0,
            }),
        }
    }

    #[tokio::test]
    async fn test_start_with_name() {
        mock_clock::freeze_at(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap());
        let odoo = MockOdooRepository::new();
        let mut state = AppState::default();
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        TimerCommand::new(&odoo)
            .run(&mut state, start(ResourceType::Task, 4, Some("Docs")), &mut presenter)
            .await
            .unwrap();

        assert_eq!(state.ledger.running_timer().unwrap().key(), ResourceKey::task(4));
        assert_eq!(
            String::from_utf8(writer).unwrap(),
            "- [running] Docs (task #4) 00:00\n"
        );
    }

    #[tokio::test]
    async fn test_start_looks_up_name() {
        let mut odoo = MockOdooRepository::new();
        odoo.expect_fetch_resource_info()
            .with(eq(ResourceKey::project(9)))
            .times(1)
            .returning(|_| {
                Ok(Some(ResourceInfo {
                    id: 9,
                    display_name: "Internal".to_string(),
                    can_timesheet: true,
                }))
            });
        let mut state = AppState::default();
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        TimerCommand::new(&odoo)
            .run(&mut state, start(ResourceType::Project, 9, None), &mut presenter)
            .await
            .unwrap();

        assert_eq!(
            state.ledger.get(&ResourceKey::project(9)).unwrap().resource_name,
            "Internal"
        );
    }

    /// 名前を取得できなければタイマーは作らない。
    #[tokio::test]
    async fn test_start_lookup_failure() {
        let mut odoo = MockOdooRepository::new();
        odoo.expect_fetch_resource_info()
            .returning(|_| Err(RemoteError::Transport("offline".to_string())));
        let mut state = AppState::default();
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        let result = TimerCommand::new(&odoo)
            .run(&mut state, start(ResourceType::Task, 4, None), &mut presenter)
            .await;

        assert!(result.is_err());
        assert!(state.ledger.is_empty());
    }

    #[tokio::test]
    async fn test_stop_only_other_resource_is_noop() {
        mock_clock::freeze_at(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap());
        let odoo = MockOdooRepository::new();
        let mut state = AppState::default();
        state.ledger.start(ResourceKey::task(1), "A", 0.0).unwrap();
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        TimerCommand::new(&odoo)
            .run(
                &mut state,
                TimerArgs {
                    action: TimerAction::Stop(StopArgs {
                        only: Some(ResourceKey::task(2)),
                    }),
                },
                &mut presenter,
            )
            .await
            .unwrap();

        assert!(state.ledger.running_timer().is_some());
    }

    #[tokio::test]
    async fn test_stop_running_timer() {
        mock_clock::freeze_at(Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap());
        let odoo = MockOdooRepository::new();
        let mut state = AppState::default();
        state.ledger.start(ResourceKey::task(1), "A", 0.0).unwrap();
        mock_clock::advance_minutes(30);
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        TimerCommand::new(&odoo)
            .run(
                &mut state,
                TimerArgs {
                    action: TimerAction::Stop(StopArgs { only: None }),
                },
                &mut presenter,
            )
            .await
            .unwrap();

        assert!(state.ledger.running_timer().is_none());
        assert_eq!(String::from_utf8(writer).unwrap(), "- A (task #1) 00:30\n");
    }

    #[tokio::test]
    async fn test_add_duration_default_step() {
        let odoo = MockOdooRepository::new();
        let mut state = AppState::default();
        state
            .ledger
            .add_timer(ResourceKey::task(1), "A", 20.0, "")
            .unwrap();
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        TimerCommand::new(&odoo)
            .run(
                &mut state,
                TimerArgs {
                    action: TimerAction::AddDuration(AddDurationArgs {
                        resource: resource(ResourceType::Task, 1),
                        step: BILLING_STEP_MINUTES,
                    }),
                },
                &mut presenter,
            )
            .await
            .unwrap();

        assert_eq!(
            state.ledger.get(&ResourceKey::task(1)).unwrap().previous_duration,
            30.0
        );
    }

    #[tokio::test]
    async fn test_delete_missing_timer() {
        let odoo = MockOdooRepository::new();
        let mut state = AppState::default();
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        let result = TimerCommand::new(&odoo)
            .run(
                &mut state,
                TimerArgs {
                    action: TimerAction::Delete(resource(ResourceType::Task, 1)),
                },
                &mut presenter,
            )
            .await;

        assert!(result.is_err());
    }

    /// 計測中のタイマーがなければすぐに終了する。
    #[tokio::test]
    async fn test_watch_without_running_timer() {
        let odoo = MockOdooRepository::new();
        let mut state = AppState::default();
        let mut writer = Vec::new();
        let mut presenter = ConsoleMarkdownList::new(&mut writer);

        TimerCommand::new(&odoo)
            .run(
                &mut state,
                TimerArgs {
                    action: TimerAction::Watch(WatchArgs {
                        interval: NonZeroU64::new(1).unwrap(),
                    }),
                },
                &mut presenter,
            )
            .await
            .unwrap();

        assert!(writer.is_empty());
    }

    #[derive(Debug, clap::Parser)]
    struct TimerCli {
        #[clap(flatten)]
        timer: TimerArgs,
    }

    #[rstest]
    #[case::default(&["watch"], Some(60))]
    #[case::custom(&["watch", "--interval", "5"], Some(5))]
    #[case::zero(&["watch", "--interval", "0"], None)]
    fn test_watch_interval(#[case] args: &[&str], #[case] expected: Option<u64>) {
        use clap::Parser;

        let argv = std::iter::once("odoo-timers").chain(args.iter().copied());
        let parsed = TimerCli::try_parse_from(argv);

        let interval = parsed.ok().map(|cli| match cli.timer.action {
            TimerAction::Watch(watch) => watch.interval.get(),
            other => panic!("unexpected action: {:?}", other),
        });
        assert_eq!(interval, expected);
    }

    #[rstest]
    #[case("task:12", ResourceKey::task(12))]
    #[case("project:3", ResourceKey::project(3))]
    fn test_parse_resource_key(#[case] input: &str, #[case] expected: ResourceKey) {
        assert_eq!(parse_resource_key(input).unwrap(), expected);
    }

    #[rstest]
    #[case::no_separator("task12")]
    #[case::bad_type("ticket:1")]
    #[case::bad_id("task:abc")]
    fn test_parse_resource_key_error(#[case] input: &str) {
        assert!(parse_resource_key(input).is_err());
    }
}
