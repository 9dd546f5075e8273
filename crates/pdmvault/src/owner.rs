use std::collections::HashMap;

/// Maps a logical username to the numeric uid its files should belong to.
pub trait OwnerResolver {
    fn uid(&self, user: &str) -> Option<u32>;
}

/// Resolves owners from the `owners` table of the vault configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigOwners {
    owners: HashMap<String, u32>,
}

impl ConfigOwners {
    pub fn new(owners: HashMap<String, u32>) -> Self {
        Self { owners }
    }
}

impl OwnerResolver for ConfigOwners {
    fn uid(&self, user: &str) -> Option<u32> {
        self.owners.get(user).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_users_only() {
        let owners = ConfigOwners::new(HashMap::from([("alice".to_string(), 1001)]));
        assert_eq!(owners.uid("alice"), Some(1001));
        assert_eq!(owners.uid("bob"), None);
    }
}
