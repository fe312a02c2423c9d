//! Key-Value Store
//!
//! In-process key-value store with Redis-style command semantics: `add` is a
//! set-if-absent, `replace` checks existence before writing, `flush` clears
//! every key. Command batches submitted through `execute` run as one atomic
//! transaction against the table and stop at the first failing command.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::backend::{encode_counter, parse_counter, Backend, Command, Expiring, Reply};
use crate::cache::{EntryTable, Expiration};
use crate::error::{CacheError, Result};

// == Key-Value Store ==
#[derive(Debug, Clone, Default)]
pub struct KvStore {
    table: Arc<Mutex<EntryTable>>,
}

impl KvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime in whole seconds: `Some(None)` never expires, `None` absent.
    pub fn ttl(&self, key: &str) -> Option<Option<u64>> {
        self.table
            .lock()
            .ttl_remaining_ms(key)
            .map(|remaining| remaining.map(|ms| ms.div_ceil(1000)))
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn run(table: &mut EntryTable, command: &Command) -> Reply {
    match command {
        Command::AddIfAbsent { key, value, ttl } => {
            Reply::Bool(table.insert_if_absent(key, value.clone(), *ttl))
        }
        Command::IncrBy { key, delta } => {
            let current = match table.get(key) {
                Some(entry) => match parse_counter(key, &entry.value) {
                    Ok(value) => value,
                    Err(err) => return Reply::Error(err),
                },
                None => 0,
            };
            let next = current.saturating_add(*delta);
            match table.get_mut(key) {
                Some(entry) => entry.value = encode_counter(next),
                None => table.insert(key, encode_counter(next), Expiration::Never),
            }
            Reply::Int(next)
        }
        Command::Expire { key, ttl } => Reply::Bool(table.expire(key, *ttl)),
        Command::ClampAtZero { key } => {
            let Some(entry) = table.get_mut(key) else {
                return Reply::Int(0);
            };
            match parse_counter(key, &entry.value) {
                Ok(value) if value < 0 => {
                    entry.value = encode_counter(0);
                    Reply::Int(0)
                }
                Ok(value) => Reply::Int(value),
                Err(err) => Reply::Error(err),
            }
        }
    }
}

impl Backend for KvStore {
    fn name(&self) -> &str {
        "kv"
    }

    fn add(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        Ok(self.table.lock().insert_if_absent(key, value.to_vec(), ttl))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        self.table.lock().insert(key, value.to_vec(), ttl);
        Ok(true)
    }

    fn replace(&self, key: &str, value: &[u8], ttl: Expiration) -> Result<bool> {
        let mut table = self.table.lock();
        if !table.contains(key) {
            return Ok(false);
        }
        table.insert(key, value.to_vec(), ttl);
        Ok(true)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.table.lock().get(key).map(|entry| entry.value.clone()))
    }

    fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        let mut table = self.table.lock();
        Ok(keys
            .iter()
            .filter_map(|key| table.get(key).map(|entry| (key.clone(), entry.value.clone())))
            .collect())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.table.lock().remove(key))
    }

    fn flush(&self) -> Result<bool> {
        self.table.lock().clear();
        Ok(true)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.table.lock().contains(key))
    }

    fn expire(&self, key: &str, ttl: Expiration) -> Result<bool> {
        Ok(self.table.lock().expire(key, ttl))
    }

    fn supports_pipelining(&self) -> bool {
        true
    }

    fn execute(&self, commands: &[Command]) -> Result<Vec<Reply>> {
        let mut table = self.table.lock();
        let mut replies = Vec::with_capacity(commands.len());
        let mut failed = false;
        for command in commands {
            if failed {
                replies.push(Reply::Error(CacheError::Pipeline(format!(
                    "{command:?} skipped after an earlier failure"
                ))));
                continue;
            }
            let reply = run(&mut table, command);
            failed = matches!(reply, Reply::Error(_));
            replies.push(reply);
        }
        Ok(replies)
    }
}

impl Expiring for KvStore {
    fn cleanup_expired(&self) -> usize {
        let removed = self.table.lock().cleanup_expired();
        if removed > 0 {
            debug!(removed, "kv store purged expired entries");
        }
        removed
    }
}
