//! Object cache lookups used to resolve entity options.

use std::collections::VecDeque;
use std::fmt;
use std::hash::Hash;

use cordkit_proto::{Channel, Member, Message, Role, Snowflake, User};
use dashmap::DashMap;
use parking_lot::Mutex;

/// Messages kept by [`MemoryCache`] unless told otherwise.
pub const DEFAULT_MAX_MESSAGES: usize = 1000;

/// Users, members, roles and channels kept by [`MemoryCache`], per kind,
/// unless told otherwise.
pub const DEFAULT_MAX_ENTITIES: usize = 10_000;

/// Best-effort local lookups. A miss is `None`, never an error.
///
/// The `store_*` hooks let dispatch feed back entities it learned from an
/// interaction (the target of a message command, for one); caches that do
/// not want them can ignore them.
pub trait ObjectCache: Send + Sync {
    fn get_user(&self, id: Snowflake) -> Option<User>;
    fn get_member(&self, guild_id: Snowflake, id: Snowflake) -> Option<Member>;
    fn get_role(&self, guild_id: Snowflake, id: Snowflake) -> Option<Role>;
    fn get_channel(&self, id: Snowflake) -> Option<Channel>;
    fn get_message(&self, id: Snowflake) -> Option<Message>;

    fn store_user(&self, _user: &User) {}
    fn store_member(&self, _member: &Member) {}
    fn store_message(&self, _message: &Message) {}
}

/// A cache that knows nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl ObjectCache for NoCache {
    fn get_user(&self, _id: Snowflake) -> Option<User> {
        None
    }

    fn get_member(&self, _guild_id: Snowflake, _id: Snowflake) -> Option<Member> {
        None
    }

    fn get_role(&self, _guild_id: Snowflake, _id: Snowflake) -> Option<Role> {
        None
    }

    fn get_channel(&self, _id: Snowflake) -> Option<Channel> {
        None
    }

    fn get_message(&self, _id: Snowflake) -> Option<Message> {
        None
    }
}

/// A map that forgets its oldest key once `max` keys are held.
///
/// Replacing an existing key keeps its place in line.
struct Bounded<K, V> {
    entries: DashMap<K, V>,
    order: Mutex<VecDeque<K>>,
    max: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> Bounded<K, V> {
    fn new(max: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            max,
        }
    }

    fn insert(&self, key: K, value: V) {
        if self.max == 0 {
            return;
        }
        // Held across both structures so the queue never lags the map.
        let mut order = self.order.lock();
        if self.entries.insert(key.clone(), value).is_some() {
            return;
        }
        order.push_back(key);
        while order.len() > self.max {
            if let Some(oldest) = order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K, V> fmt::Debug for Bounded<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bounded")
            .field("len", &self.entries.len())
            .field("max", &self.max)
            .finish()
    }
}

/// In-memory [`ObjectCache`].
///
/// Every kind of entity is capped. Messages are kept in arrival order and
/// the oldest is evicted once `max_messages` is reached; users, members,
/// roles and channels each hold at most `max_entities`, evicting the one
/// inserted first.
#[derive(Debug)]
pub struct MemoryCache {
    users: Bounded<Snowflake, User>,
    members: Bounded<(Snowflake, Snowflake), Member>,
    roles: Bounded<(Snowflake, Snowflake), Role>,
    channels: Bounded<Snowflake, Channel>,
    messages: Mutex<VecDeque<Message>>,
    max_messages: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_limits(DEFAULT_MAX_MESSAGES, DEFAULT_MAX_ENTITIES)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_messages(max_messages: usize) -> Self {
        Self::with_limits(max_messages, DEFAULT_MAX_ENTITIES)
    }

    /// A cache holding at most `max_messages` messages and `max_entities`
    /// of each other kind. Zero disables that kind.
    pub fn with_limits(max_messages: usize, max_entities: usize) -> Self {
        Self {
            users: Bounded::new(max_entities),
            members: Bounded::new(max_entities),
            roles: Bounded::new(max_entities),
            channels: Bounded::new(max_entities),
            messages: Mutex::new(VecDeque::new()),
            max_messages,
        }
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    /// Members without a guild id or user are ignored.
    pub fn insert_member(&self, member: Member) {
        let (Some(guild_id), Some(id)) = (member.guild_id, member.id()) else {
            return;
        };
        if let Some(user) = &member.user {
            self.users.insert(id, user.clone());
        }
        self.members.insert((guild_id, id), member);
    }

    /// Roles without a guild id are ignored.
    pub fn insert_role(&self, role: Role) {
        if let Some(guild_id) = role.guild_id {
            self.roles.insert((guild_id, role.id), role);
        }
    }

    pub fn insert_channel(&self, channel: Channel) {
        self.channels.insert(channel.id, channel);
    }

    pub fn insert_message(&self, message: Message) {
        if self.max_messages == 0 {
            return;
        }
        let mut messages = self.messages.lock();
        if let Some(existing) = messages.iter_mut().find(|m| m.id == message.id) {
            *existing = message;
            return;
        }
        if messages.len() >= self.max_messages {
            messages.pop_front();
        }
        messages.push_back(message);
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    /// Users, members, roles and channels currently held.
    pub fn entity_count(&self) -> usize {
        self.users.len() + self.members.len() + self.roles.len() + self.channels.len()
    }
}

impl ObjectCache for MemoryCache {
    fn get_user(&self, id: Snowflake) -> Option<User> {
        self.users.get(&id)
    }

    fn get_member(&self, guild_id: Snowflake, id: Snowflake) -> Option<Member> {
        self.members.get(&(guild_id, id))
    }

    fn get_role(&self, guild_id: Snowflake, id: Snowflake) -> Option<Role> {
        self.roles.get(&(guild_id, id))
    }

    fn get_channel(&self, id: Snowflake) -> Option<Channel> {
        self.channels.get(&id)
    }

    fn get_message(&self, id: Snowflake) -> Option<Message> {
        self.messages.lock().iter().find(|m| m.id == id).cloned()
    }

    fn store_user(&self, user: &User) {
        self.insert_user(user.clone());
    }

    fn store_member(&self, member: &Member) {
        self.insert_member(member.clone());
    }

    fn store_message(&self, message: &Message) {
        self.insert_message(message.clone());
    }
}
