use std::sync::Arc;

use amon_cache::Cache;
use amon_domain::{User, UserId};

use crate::directory::{DirectoryAdapter, SearchScope};
use crate::dn;
use crate::error::StoreError;

/// The directory attribute used to recognize operator membership (§3: "A
/// user is an operator iff they are a member of a privileged group in the
/// directory"). The source directory is free to name its operators group
/// however it likes; the master only needs a yes/no per user, so it looks
/// for this marker in the `memberof` attribute of the `sdcperson` entry.
pub const OPERATORS_GROUP: &str = "operators";

/// The three outcomes a resolution can settle into, all of which are
/// cache-worthy (§4.4: "a successful lookup populates both keys; a
/// negative lookup populates the supplied key only... errors are cached
/// to prevent stampedes").
#[derive(Debug, Clone)]
pub enum ResolverOutcome {
    Found(User),
    NotFound,
    Error(String),
}

/// §4.4: resolve a user from UUID or login, memoized in a single cache
/// keyed by both forms.
pub struct UserResolver {
    directory: Arc<dyn DirectoryAdapter>,
    cache: Cache<String, ResolverOutcome>,
}

/// Login syntax: starts with a letter, followed by letters/digits/`_.@`,
/// total length >= 2. Anything else is rejected without a lookup (§4.4).
pub fn is_valid_login(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else { return false };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    if s.chars().count() < 2 {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '@'))
}

impl UserResolver {
    pub fn new(directory: Arc<dyn DirectoryAdapter>, capacity: u64, ttl_secs: u64) -> Self {
        Self { directory, cache: Cache::new(capacity, ttl_secs, false) }
    }

    /// `Ok(Some(user))`, `Ok(None)` for "no such user", `Err(_)` for a
    /// lookup failure (§4.4).
    pub async fn resolve(&self, key: &str) -> Result<Option<User>, StoreError> {
        if let Some(entry) = self.cache.get(&key.to_string()).and_then(|e| e.into_hit()) {
            return match entry {
                ResolverOutcome::Found(u) => Ok(Some(u)),
                ResolverOutcome::NotFound => Ok(None),
                ResolverOutcome::Error(msg) => Err(StoreError::Directory(msg)),
            };
        }

        let looked_up = if let Ok(uuid) = key.parse::<uuid::Uuid>() {
            self.lookup_by_uuid(uuid).await
        } else if is_valid_login(key) {
            self.lookup_by_login(key).await
        } else {
            // Malformed login syntax is rejected without a lookup; treat it
            // the same as "no such user" rather than caching a lookup error.
            self.cache.set_miss(key.to_string());
            return Ok(None);
        };

        match looked_up {
            Ok(Some(user)) => {
                self.cache.set_hit(user.uuid.to_string(), ResolverOutcome::Found(user.clone()));
                self.cache.set_hit(user.login.clone(), ResolverOutcome::Found(user.clone()));
                Ok(Some(user))
            }
            Ok(None) => {
                self.cache.set_hit(key.to_string(), ResolverOutcome::NotFound);
                Ok(None)
            }
            Err(e) => {
                self.cache.set_hit(key.to_string(), ResolverOutcome::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn lookup_by_uuid(&self, uuid: uuid::Uuid) -> Result<Option<User>, StoreError> {
        let dn = dn::user_dn(&uuid.to_string());
        let entry = self.directory.get(&dn).await?;
        Ok(entry.map(|e| entry_to_user(uuid, &e)))
    }

    async fn lookup_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let filter = format!("(&(objectclass=sdcperson)(login={login}))");
        let entries = self.directory.search("ou=users,o=smartdc", &filter, SearchScope::Subtree).await?;
        let Some(entry) = entries.into_iter().next() else { return Ok(None) };
        let uuid = entry
            .get("uuid")
            .and_then(|v| v.first())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| StoreError::Directory(format!("sdcperson entry for login '{login}' has no uuid attribute")))?;
        Ok(Some(entry_to_user(uuid, &entry)))
    }
}

fn entry_to_user(uuid: uuid::Uuid, entry: &crate::directory::Entry) -> User {
    let single = |name: &str| entry.get(name).and_then(|v| v.first()).cloned().unwrap_or_default();
    let is_operator = entry.get("memberof").is_some_and(|v| v.iter().any(|g| g == OPERATORS_GROUP));

    let mut attributes = std::collections::HashMap::new();
    for (k, v) in entry {
        if let Some(first) = v.first() {
            attributes.insert(k.clone(), first.clone());
        }
    }

    User { uuid: UserId(uuid), login: single("login"), email: single("email"), attributes, is_operator }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_directory::InMemoryDirectory;

    fn entry(uuid: &str, login: &str, operator: bool) -> crate::directory::Entry {
        let mut e = crate::directory::Entry::new();
        e.insert("objectclass".into(), vec!["sdcperson".into()]);
        e.insert("uuid".into(), vec![uuid.into()]);
        e.insert("login".into(), vec![login.into()]);
        e.insert("email".into(), vec![format!("{login}@example.com")]);
        if operator {
            e.insert("memberof".into(), vec![OPERATORS_GROUP.into()]);
        }
        e
    }

    #[test]
    fn login_syntax() {
        assert!(is_valid_login("ab"));
        assert!(is_valid_login("a.b_c@d"));
        assert!(!is_valid_login("a"));
        assert!(!is_valid_login("1abc"));
        assert!(!is_valid_login(""));
    }

    #[tokio::test]
    async fn resolve_by_uuid_then_by_login_hits_cache() {
        let dir = Arc::new(InMemoryDirectory::new());
        let uuid = "11111111-1111-1111-1111-111111111111";
        dir.put(&dn::user_dn(uuid), entry(uuid, "bob", true)).await.unwrap();

        let resolver = UserResolver::new(dir.clone(), 100, 60);
        let by_uuid = resolver.resolve(uuid).await.unwrap().unwrap();
        assert_eq!(by_uuid.login, "bob");
        assert!(by_uuid.is_operator);

        // Populated via the uuid lookup; a subsequent login lookup must be
        // a cache hit that never touches the directory again.
        dir.del(&dn::user_dn(uuid)).await.unwrap();
        let by_login = resolver.resolve("bob").await.unwrap();
        assert!(by_login.is_some());
    }

    #[tokio::test]
    async fn unknown_user_resolves_to_none() {
        let dir = Arc::new(InMemoryDirectory::new());
        let resolver = UserResolver::new(dir, 100, 60);
        assert!(resolver.resolve("22222222-2222-2222-2222-222222222222").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_login_rejected_without_lookup() {
        let dir = Arc::new(InMemoryDirectory::new());
        let resolver = UserResolver::new(dir, 100, 60);
        assert!(resolver.resolve("x").await.unwrap().is_none());
    }
}
