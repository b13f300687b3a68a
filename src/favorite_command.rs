use anyhow::{Context, Result};
use log::info;

use crate::app_state::AppState;
use crate::console::ConsolePresenter;
use crate::datetime::now;
use crate::remote::OdooRepository;
use crate::timer_command::ResourceArgs;

/// `favorite`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct FavoriteArgs {
    #[clap(subcommand)]
    action: FavoriteAction,
}

#[derive(Debug, clap::Subcommand)]
enum FavoriteAction {
    /// Add a task or project to the favorites
    Add(AddArgs),
    /// Remove a favorite
    Remove(ResourceArgs),
    /// Rename a favorite, an empty name restores the Odoo name
    Rename(RenameArgs),
    /// List favorites
    List,
    /// Start a timer from a favorite
    Start(StartArgs),
}

#[derive(Debug, clap::Args)]
struct AddArgs {
    #[clap(flatten)]
    resource: ResourceArgs,

    #[clap(long = "name", help = "Name of the favorite, the Odoo name if omitted")]
    name: Option<String>,
}

#[derive(Debug, clap::Args)]
struct RenameArgs {
    #[clap(flatten)]
    resource: ResourceArgs,

    #[clap(default_value = "", help = "New name")]
    name: String,
}

#[derive(Debug, clap::Args)]
struct StartArgs {
    #[clap(flatten)]
    resource: ResourceArgs,

    #[clap(
        long = "bonus",
        default_value = "0",
        help = "Minutes added when starting, e.g. 15"
    )]
    bonus: f64,
}

pub struct FavoriteCommand<'a, T: OdooRepository> {
    odoo: &'a T,
}

impl<'a, T: OdooRepository> FavoriteCommand<'a, T> {
    /// 新しい`FavoriteCommand`を返す。
    ///
    /// # Arguments
    /// * `odoo` - お気に入りの検証に使うリポジトリ
    pub fn new(odoo: &'a T) -> Self {
        Self { odoo }
    }

    /// `favorite`サブコマンドの処理を行う。
    ///
    /// `start`はタイマー一覧を、それ以外はお気に入り一覧を表示する。
    pub async fn run<P: ConsolePresenter>(
        &self,
        state: &mut AppState,
        args: FavoriteArgs,
        presenter: &mut P,
    ) -> Result<()> {
        match args.action {
            FavoriteAction::Add(add) => {
                let key = add.resource.key();
                let favorite = state
                    .add_favorite(self.odoo, key, add.name.as_deref())
                    .await
                    .with_context(|| format!("Failed to add favorite {}", key))?;
                info!("Added favorite {} ({})", key, favorite.name);
            }
            FavoriteAction::Remove(resource) => {
                let key = resource.key();
                state
                    .remove_favorite(&key)
                    .with_context(|| format!("Failed to remove favorite {}", key))?;
            }
            FavoriteAction::Rename(rename) => {
                let key = rename.resource.key();
                state
                    .rename_favorite(self.odoo, &key, &rename.name)
                    .await
                    .with_context(|| format!("Failed to rename favorite {}", key))?;
            }
            FavoriteAction::List => {}
            FavoriteAction::Start(start) => {
                let key = start.resource.key();
                let name = state
                    .favorites
                    .get(&key)
                    .with_context(|| format!("{} is not a favorite", key))?
                    .name
                    .clone();
                state
                    .ledger
                    .start(key, &name, start.bonus)
                    .with_context(|| format!("Failed to start {}", key))?;
                info!("Started {} from favorites", key);
                return presenter.show_timers(state.ledger.timers(), &now());
            }
        }

        presenter.show_favorites(state.favorites.items())
    }
}
