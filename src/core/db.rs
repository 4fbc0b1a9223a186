//! The persistence layer: JSON documents and blobs in the key-value store.
//!
//! Every entity lives under a typed key (`user:{id}`, `post:{id}`,
//! `comment:{id}`); small list documents (`users_list`, `feed`,
//! `user_posts:{id}`) and the `username:`/`email:` pointers stand in for
//! collections and unique indexes. The store offers no compare-and-swap,
//! so concurrent read-modify-write toggles on the same document are
//! last-write-wins.

use crate::config::{self, FEED_KEY, USERS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::models::models::{Comment, Post, User};
use serde::de::DeserializeOwned;
use serde::Serialize;
use spin_sdk::key_value::Store;

pub struct Documents {
    store: Store,
}

impl Documents {
    /// The single readiness gate: every `/api/*` route opens the store
    /// here before any handler runs.
    pub fn open() -> Result<Self, ApiError> {
        match Store::open_default() {
            Ok(store) => Ok(Documents { store }),
            Err(err) => {
                log::error!("key-value store unavailable: {}", err);
                Err(ApiError::Unavailable)
            }
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        self.store.get_json(key)
    }

    pub fn put<T: Serialize>(&self, key: &str, doc: &T) -> anyhow::Result<()> {
        self.store.set_json(key, doc)?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.store.delete(key)?;
        Ok(())
    }

    // === Blobs (uploaded images) ===

    pub fn get_blob(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.store.get(key)?)
    }

    pub fn put_blob(&self, key: &str, data: &[u8]) -> anyhow::Result<()> {
        self.store.set(key, data)?;
        Ok(())
    }

    // === Users ===

    pub fn user(&self, id: &str) -> anyhow::Result<Option<User>> {
        self.get(&config::user_key(id))
    }

    pub fn put_user(&self, user: &User) -> anyhow::Result<()> {
        self.put(&config::user_key(&user.id), user)
    }

    pub fn user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        match self.get::<String>(&config::username_key(username))? {
            Some(id) => self.user(&id),
            None => Ok(None),
        }
    }

    pub fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        match self.get::<String>(&config::email_key(email))? {
            Some(id) => self.user(&id),
            None => Ok(None),
        }
    }

    /// User ids in registration order, oldest first.
    pub fn user_ids(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.get(USERS_LIST_KEY)?.unwrap_or_default())
    }

    /// Registers the user document together with its unique-index
    /// pointers and list membership.
    pub fn insert_user(&self, user: &User) -> anyhow::Result<()> {
        self.put_user(user)?;
        self.put(&config::username_key(&user.username), &user.id)?;
        self.put(&config::email_key(&user.email), &user.id)?;
        let mut ids = self.user_ids()?;
        ids.push(user.id.clone());
        self.put(USERS_LIST_KEY, &ids)?;
        Ok(())
    }

    // === Posts ===

    pub fn post(&self, id: &str) -> anyhow::Result<Option<Post>> {
        self.get(&config::post_key(id))
    }

    pub fn put_post(&self, post: &Post) -> anyhow::Result<()> {
        self.put(&config::post_key(&post.id), post)
    }

    /// Post ids newest-first across all authors.
    pub fn feed_ids(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.get(FEED_KEY)?.unwrap_or_default())
    }

    /// A single author's post ids, newest-first.
    pub fn user_post_ids(&self, user_id: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.get(&user_posts_key(user_id))?.unwrap_or_default())
    }

    pub fn insert_post(&self, post: &Post) -> anyhow::Result<()> {
        self.put_post(post)?;
        let mut feed = self.feed_ids()?;
        feed.insert(0, post.id.clone());
        self.put(FEED_KEY, &feed)?;
        let mut own = self.user_post_ids(&post.author)?;
        own.insert(0, post.id.clone());
        self.put(&user_posts_key(&post.author), &own)?;
        Ok(())
    }

    pub fn remove_post(&self, post: &Post) -> anyhow::Result<()> {
        self.delete(&config::post_key(&post.id))?;
        let mut feed = self.feed_ids()?;
        feed.retain(|id| id != &post.id);
        self.put(FEED_KEY, &feed)?;
        let mut own = self.user_post_ids(&post.author)?;
        own.retain(|id| id != &post.id);
        self.put(&user_posts_key(&post.author), &own)?;
        Ok(())
    }

    // === Comments ===

    pub fn comment(&self, id: &str) -> anyhow::Result<Option<Comment>> {
        self.get(&config::comment_key(id))
    }

    pub fn put_comment(&self, comment: &Comment) -> anyhow::Result<()> {
        self.put(&config::comment_key(&comment.id), comment)
    }

    // === Health ===

    /// A cheap probe for the health endpoint; the open above already
    /// proves the store is reachable, this exercises a read.
    pub fn probe(&self) -> bool {
        self.store.get(USERS_LIST_KEY).is_ok()
    }
}

fn user_posts_key(user_id: &str) -> String {
    format!("user_posts:{}", user_id)
}
