//! Account Store
//! Mission: Persistence seam used by the authorization gate and login flow

use crate::auth::models::Account;
use anyhow::{bail, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Lookups and writes the auth subsystem needs from persistence
pub trait AccountStore: Send + Sync {
    /// Account by id, `None` if it does not exist
    fn find_by_id(&self, id: &Uuid) -> Result<Option<Account>>;

    /// Account by (normalized) email, `None` if it does not exist
    fn find_by_email(&self, email: &str) -> Result<Option<Account>>;

    /// Insert or replace an account
    fn save(&self, account: &Account) -> Result<()>;
}

/// Process-local account store
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&self, id: &Uuid) -> Option<Account> {
        self.accounts.write().remove(id)
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl AccountStore for MemoryAccountStore {
    fn find_by_id(&self, id: &Uuid) -> Result<Option<Account>> {
        Ok(self.accounts.read().get(id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    fn save(&self, account: &Account) -> Result<()> {
        let mut accounts = self.accounts.write();
        if accounts
            .values()
            .any(|a| a.email == account.email && a.id != account.id)
        {
            bail!("email {} already registered", account.email);
        }
        accounts.insert(account.id, account.clone());
        Ok(())
    }
}
