use crate::timer::{Favorite, ResourceKey};

/// お気に入りの一覧。`(id, type)`ごとに1つだけ保持する。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Favorites {
    items: Vec<Favorite>,
}

impl Favorites {
    /// 重複したキーは先頭のものを残す。
    pub fn from_items(items: Vec<Favorite>) -> Self {
        let mut favorites = Self::default();
        for favorite in items {
            favorites.insert(favorite);
        }
        favorites
    }

    pub fn items(&self) -> &[Favorite] {
        &self.items
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&Favorite> {
        self.items.iter().find(|favorite| favorite.key() == *key)
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.get(key).is_some()
    }

    /// 追加できた場合は`true`を返す。既に同じキーがあれば何もしない。
    pub fn insert(&mut self, favorite: Favorite) -> bool {
        if self.contains(&favorite.key()) {
            return false;
        }
        self.items.push(favorite);
        true
    }

    pub fn remove(&mut self, key: &ResourceKey) -> Option<Favorite> {
        let index = self
            .items
            .iter()
            .position(|favorite| favorite.key() == *key)?;
        Some(self.items.remove(index))
    }

    pub fn rename(&mut self, key: &ResourceKey, name: &str) -> bool {
        match self.items.iter_mut().find(|favorite| favorite.key() == *key) {
            Some(favorite) => {
                favorite.name = name.to_string();
                true
            }
            None => false,
        }
    }
}
