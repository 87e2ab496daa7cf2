// In-memory entity store. The storage backend is a collaborator behind the
// lookup contract (`index(id)` resolves a live entity or fails NotFound);
// this implementation keeps rows in RwLock'd tables behind a process-wide
// singleton so the whole request path can be exercised without external
// services. Domain rules live in the model modules, not here.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::models::chat::Chat;
use crate::models::message::Message;
use crate::models::user::User;

pub static STORE: Lazy<Store> = Lazy::new(Store::new);

pub fn store() -> &'static Store {
    &STORE
}

struct Table<T> {
    rows: HashMap<i64, T>,
    next_id: i64,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: HashMap::new(),
            next_id: 1,
        }
    }

    fn insert(&mut self, build: impl FnOnce(i64) -> T) -> T {
        let id = self.next_id;
        self.next_id += 1;
        let row = build(id);
        self.rows.insert(id, row.clone());
        row
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn save(&mut self, id: i64, row: T) {
        self.rows.insert(id, row);
    }

    fn select(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.values().filter(|row| predicate(row)).cloned().collect()
    }

    fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.rows.values().find(|row| predicate(row)).cloned()
    }
}

pub struct Store {
    users: RwLock<Table<User>>,
    chats: RwLock<Table<Chat>>,
    messages: RwLock<Table<Message>>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(Table::new()),
            chats: RwLock::new(Table::new()),
            messages: RwLock::new(Table::new()),
        }
    }

    // --- users ---

    pub fn insert_user(&self, build: impl FnOnce(i64) -> User) -> User {
        self.users.write().expect("store lock").insert(build)
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.users.read().expect("store lock").get(id)
    }

    pub fn find_user(&self, predicate: impl Fn(&User) -> bool) -> Option<User> {
        self.users.read().expect("store lock").find(predicate)
    }

    pub fn save_user(&self, user: &User) {
        self.users.write().expect("store lock").save(user.id, user.clone());
    }

    // --- chats ---

    pub fn insert_chat(&self, build: impl FnOnce(i64) -> Chat) -> Chat {
        self.chats.write().expect("store lock").insert(build)
    }

    pub fn chat(&self, id: i64) -> Option<Chat> {
        self.chats.read().expect("store lock").get(id)
    }

    pub fn find_chat(&self, predicate: impl Fn(&Chat) -> bool) -> Option<Chat> {
        self.chats.read().expect("store lock").find(predicate)
    }

    pub fn select_chats(&self, predicate: impl Fn(&Chat) -> bool) -> Vec<Chat> {
        let mut chats = self.chats.read().expect("store lock").select(predicate);
        chats.sort_by_key(|chat| chat.id);
        chats
    }

    pub fn save_chat(&self, chat: &Chat) {
        self.chats.write().expect("store lock").save(chat.id, chat.clone());
    }

    // --- messages ---

    pub fn insert_message(&self, build: impl FnOnce(i64) -> Message) -> Message {
        self.messages.write().expect("store lock").insert(build)
    }

    pub fn message(&self, id: i64) -> Option<Message> {
        self.messages.read().expect("store lock").get(id)
    }

    pub fn select_messages(&self, predicate: impl Fn(&Message) -> bool) -> Vec<Message> {
        let mut messages = self.messages.read().expect("store lock").select(predicate);
        messages.sort_by_key(|message| message.id);
        messages
    }

    pub fn save_message(&self, message: &Message) {
        self.messages.write().expect("store lock").save(message.id, message.clone());
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}
