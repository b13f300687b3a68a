use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::duration::{format_duration, format_float_time};
use crate::remote::{Task, User};
use crate::submission::SubmissionReport;
use crate::timer::{Favorite, Timer, View};
use crate::timesheet::UserTimesheetStat;

/// Consoleに結果を表示するためのtrait。
pub trait ConsolePresenter {
    /// タイマーを表示する。計測中のタイマーは`now`までの経過時間を含める。
    ///
    /// # Arguments
    ///
    /// * `timers` - 表示するタイマー
    /// * `now` - 経過時間の計算に使う現在時刻
    fn show_timers(&mut self, timers: &[Timer], now: &DateTime<Utc>) -> Result<()>;

    fn show_favorites(&mut self, favorites: &[Favorite]) -> Result<()>;

    fn show_tasks(&mut self, tasks: &[Task]) -> Result<()>;

    fn show_timesheet_stats(&mut self, stats: &[UserTimesheetStat]) -> Result<()>;

    fn show_user(&mut self, user: &User) -> Result<()>;

    fn show_view(&mut self, view: View) -> Result<()>;

    /// 送信結果と、送信に失敗して残ったタイマーを表示する。
    fn show_submission(
        &mut self,
        report: &SubmissionReport,
        remaining: &[Timer],
        now: &DateTime<Utc>,
    ) -> Result<()>;
}

/// Markdownのlist形式で表示する。
pub struct ConsoleMarkdownList<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ConsoleMarkdownList<'a, W> {
    /// 新しい`ConsoleMarkdownList`を返す。
    pub fn new(writer: &'a mut W) -> Self {
        Self { writer }
    }
}

impl<'a, W: Write> ConsolePresenter for ConsoleMarkdownList<'a, W> {
    // 計測中のタイマーには`[running]`、送信エラーには子要素を付ける。
    fn show_timers(&mut self, timers: &[Timer], now: &DateTime<Utc>) -> Result<()> {
        for timer in timers {
            let marker = if timer.is_running() { "[running] " } else { "" };
            let description = if timer.description.is_empty() {
                String::new()
            } else {
                format!(": {}", timer.description)
            };
            writeln!(
                self.writer,
                "- {}{} ({}) {}{}",
                marker,
                timer.resource_name,
                timer.key(),
                format_duration(timer.full_duration(now)),
                description
            )
            .with_context(|| format!("Failed to write timer: {:?}", timer))?;
            if let Some(error) = &timer.error {
                writeln!(self.writer, "  - error: {}", error)
                    .with_context(|| format!("Failed to write error of {}", timer.key()))?;
            }
        }

        Ok(())
    }

    fn show_favorites(&mut self, favorites: &[Favorite]) -> Result<()> {
        for favorite in favorites {
            writeln!(self.writer, "- {} ({})", favorite.name, favorite.key())
                .with_context(|| format!("Failed to write favorite: {:?}", favorite))?;
        }

        Ok(())
    }

    // `- #id name [project] (stage) effective / allocated`
    fn show_tasks(&mut self, tasks: &[Task]) -> Result<()> {
        for task in tasks {
            let project = task
                .project
                .as_ref()
                .map(|project| format!(" [{}]", project.display_name))
                .unwrap_or_default();
            let stage = task
                .stage
                .as_ref()
                .map(|stage| format!(" ({})", stage.display_name))
                .unwrap_or_default();
            writeln!(
                self.writer,
                "- #{} {}{}{} {} / {}",
                task.id,
                task.display_name,
                project,
                stage,
                format_float_time(task.effective_hours),
                format_float_time(task.allocated_hours)
            )
            .with_context(|| format!("Failed to write task: {}", task.id))?;
        }

        Ok(())
    }

    fn show_timesheet_stats(&mut self, stats: &[UserTimesheetStat]) -> Result<()> {
        for stat in stats {
            writeln!(
                self.writer,
                "- {}: {} (billable {})",
                stat.user.name,
                format_float_time(stat.total_hours),
                format_float_time(stat.total_billable)
            )
            .with_context(|| format!("Failed to write timesheet of {}", stat.user.name))?;
        }

        Ok(())
    }

    fn show_user(&mut self, user: &User) -> Result<()> {
        writeln!(self.writer, "{} ({}, #{})", user.name, user.username, user.id)
            .context("Failed to write user")?;
        Ok(())
    }

    fn show_view(&mut self, view: View) -> Result<()> {
        let name = match view {
            View::Today => "today",
            View::InTheZone => "in-the-zone",
            View::Report => "report",
        };
        writeln!(self.writer, "{}", name).context("Failed to write view")?;
        Ok(())
    }

    fn show_submission(
        &mut self,
        report: &SubmissionReport,
        remaining: &[Timer],
        now: &DateTime<Utc>,
    ) -> Result<()> {
        writeln!(
            self.writer,
            "Submitted {} timers, {} failed",
            report.submitted, report.failed
        )
        .context("Failed to write submission report")?;
        self.show_timers(remaining, now)
    }
}
