use libmdbx::{Database, DatabaseOptions, TableFlags, Transaction, WriteFlags, WriteMap, RW};
use profile_service::parser::profile::{NewProfileRecord, User, UserProfile};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

pub const USERS_TABLE: &str = "users";
pub const PROFILES_TABLE: &str = "user_profiles";
const SEQUENCES_TABLE: &str = "sequences";

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("user {0} already has a profile")]
    ProfileExists(i64),
    #[error("storage error: {0}")]
    Storage(#[from] libmdbx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("database mutex poisoned")]
    Poisoned,
}

/// Profile repository. Users are read-only from the HTTP side.
pub trait ProfileStore: Clone + Send + Sync + 'static {
    fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError>;

    fn profile_exists_for_user(&self, user_id: i64) -> Result<bool, DbError>;

    fn get_profile_by_user(&self, user_id: i64) -> Result<Option<UserProfile>, DbError>;

    /// Inserts in one transaction. Fails with [`DbError::ProfileExists`] when
    /// the user already has a row; nothing is committed on any failure.
    fn create_profile(&self, record: NewProfileRecord) -> Result<UserProfile, DbError>;

    /// Removes the user's profile row; `false` when there was none.
    fn delete_profile(&self, user_id: i64) -> Result<bool, DbError>;

    fn put_user(&self, user: &User) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct InnerDatabase {
    db: Arc<Mutex<Database<WriteMap>>>,
}

impl InnerDatabase {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let mut options = DatabaseOptions::default();
        options.max_tables = Some(16);
        let db = Database::<WriteMap>::open_with_options(path, options)?;

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Database<WriteMap>>, DbError> {
        self.db.lock().map_err(|_| DbError::Poisoned)
    }

    fn read(&self, key: &str, table: &str) -> Result<Option<Vec<u8>>, DbError> {
        let db = self.lock()?;
        let transaction = db.begin_ro_txn()?;

        if let Ok(table) = transaction.open_table(Some(table)) {
            let result = transaction.get(&table, key.as_bytes())?;
            return Ok(result);
        }

        Ok(None)
    }

    fn write(&self, key: &str, value: &str, table: &str) -> Result<(), DbError> {
        let db = self.lock()?;
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(table), TableFlags::default())?;

        transaction.put(&table, key, value, WriteFlags::default())?;
        transaction.commit()?;
        Ok(())
    }
}

/// Bumps and returns the sequence counter for `name` inside `transaction`.
fn next_id(transaction: &Transaction<'_, RW, WriteMap>, name: &str) -> Result<i64, DbError> {
    let table = transaction.create_table(Some(SEQUENCES_TABLE), TableFlags::default())?;
    let current = transaction
        .get::<Vec<u8>>(&table, name.as_bytes())?
        .and_then(|raw| String::from_utf8(raw).ok())
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(0);

    let next = current + 1;
    transaction.put(&table, name, next.to_string(), WriteFlags::default())?;
    Ok(next)
}

impl ProfileStore for InnerDatabase {
    fn get_user_by_id(&self, id: i64) -> Result<Option<User>, DbError> {
        match self.read(&id.to_string(), USERS_TABLE)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn profile_exists_for_user(&self, user_id: i64) -> Result<bool, DbError> {
        Ok(self.read(&user_id.to_string(), PROFILES_TABLE)?.is_some())
    }

    fn get_profile_by_user(&self, user_id: i64) -> Result<Option<UserProfile>, DbError> {
        match self.read(&user_id.to_string(), PROFILES_TABLE)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }

    fn create_profile(&self, record: NewProfileRecord) -> Result<UserProfile, DbError> {
        let user_id = record.user_id;
        let db = self.lock()?;
        // Dropping an uncommitted transaction aborts it.
        let transaction = db.begin_rw_txn()?;

        let id = next_id(&transaction, PROFILES_TABLE)?;
        let profile = record.into_profile(id);
        let profile_json = serde_json::to_string(&profile)?;

        let table = transaction.create_table(Some(PROFILES_TABLE), TableFlags::default())?;
        match transaction.put(&table, user_id.to_string(), profile_json, WriteFlags::NO_OVERWRITE) {
            Ok(()) => {}
            Err(libmdbx::Error::KeyExist) => {
                warn!(user_id, "profile insert rejected by uniqueness constraint");
                return Err(DbError::ProfileExists(user_id));
            }
            Err(e) => return Err(e.into()),
        }

        transaction.commit()?;
        debug!(user_id, profile_id = id, "profile created");
        Ok(profile)
    }

    fn delete_profile(&self, user_id: i64) -> Result<bool, DbError> {
        let db = self.lock()?;
        let transaction = db.begin_rw_txn()?;
        let table = transaction.create_table(Some(PROFILES_TABLE), TableFlags::default())?;

        let removed = transaction.del(&table, user_id.to_string(), None)?;
        transaction.commit()?;
        debug!(user_id, removed, "profile deleted");
        Ok(removed)
    }

    fn put_user(&self, user: &User) -> Result<(), DbError> {
        let user_json = serde_json::to_string(user)?;
        self.write(&user.id.to_string(), &user_json, USERS_TABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use profile_service::parser::profile::Gender;
    use tempfile::tempdir;

    fn record(user_id: i64) -> NewProfileRecord {
        NewProfileRecord {
            user_id,
            first_name: "john".to_string(),
            last_name: "doe".to_string(),
            gender: Gender::Male,
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            info: "hello".to_string(),
            avatar: format!("avatars/{user_id}_avatar.jpg"),
        }
    }

    #[test]
    fn test_user_roundtrip() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = InnerDatabase::new(temp_dir.path().join("test_db"))?;

        assert!(db.get_user_by_id(7)?.is_none());

        let user = User { id: 7, is_active: true, group_id: 1 };
        db.put_user(&user)?;

        assert_eq!(db.get_user_by_id(7)?, Some(user));
        Ok(())
    }

    #[test]
    fn test_create_profile_assigns_sequential_ids() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = InnerDatabase::new(temp_dir.path().join("test_db"))?;

        assert!(!db.profile_exists_for_user(1)?);

        let first = db.create_profile(record(1))?;
        let second = db.create_profile(record(2))?;

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert!(db.profile_exists_for_user(1)?);
        assert_eq!(db.get_profile_by_user(2)?, Some(second));
        Ok(())
    }

    #[test]
    fn test_duplicate_profile_is_rejected_without_side_effects() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = InnerDatabase::new(temp_dir.path().join("test_db"))?;

        let original = db.create_profile(record(1))?;

        let mut duplicate = record(1);
        duplicate.first_name = "jane".to_string();
        match db.create_profile(duplicate) {
            Err(DbError::ProfileExists(1)) => {}
            other => return Err(format!("expected ProfileExists, got {other:?}").into()),
        }

        // the aborted transaction must not leak the row or the bumped sequence
        assert_eq!(db.get_profile_by_user(1)?, Some(original));
        assert_eq!(db.create_profile(record(2))?.id, 2);
        Ok(())
    }

    #[test]
    fn test_delete_profile_frees_the_user() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = InnerDatabase::new(temp_dir.path().join("test_db"))?;

        assert!(!db.delete_profile(3)?);

        db.create_profile(record(3))?;
        assert!(db.delete_profile(3)?);
        assert!(!db.profile_exists_for_user(3)?);

        // the slot can be taken again, with a fresh id
        assert_eq!(db.create_profile(record(3))?.id, 2);
        Ok(())
    }

    #[test]
    fn test_concurrent_creates_yield_one_profile() -> Result<(), Box<dyn std::error::Error>> {
        let temp_dir = tempdir()?;
        let db = InnerDatabase::new(temp_dir.path().join("test_db"))?;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || db.create_profile(record(5)))
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("insert thread panicked"))
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, DbError::ProfileExists(5))));
        Ok(())
    }
}
