//! Conditional-operation rules.

use crate::error::StoreError;

/// Conditions under which an operation must be refused, evaluated
/// against the key's current version.
///
/// Rules short-circuit in declaration order; the first matching rule
/// decides the outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RejectRules {
    /// Refuse if no object exists.
    pub doesnt_exist: bool,
    /// Refuse if an object exists.
    pub exists: bool,
    /// Refuse if the current version is `<= given_version`.
    pub version_le_given: bool,
    /// Refuse if the current version is `!= given_version`.
    pub version_ne_given: bool,
    /// The version the two version rules compare against.
    pub given_version: u64,
}

impl RejectRules {
    /// Evaluate these rules against the current version (`None` if the
    /// object does not exist).
    pub fn check(&self, current: Option<u64>) -> Result<(), StoreError> {
        let Some(version) = current else {
            if self.doesnt_exist {
                return Err(StoreError::DoesntExist);
            }
            return Ok(());
        };
        if self.exists {
            return Err(StoreError::Exists { current: version });
        }
        if self.version_le_given && version <= self.given_version {
            return Err(StoreError::WrongVersion { current: version });
        }
        if self.version_ne_given && version != self.given_version {
            return Err(StoreError::WrongVersion { current: version });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_rules_always_pass() {
        let rules = RejectRules::default();
        assert_eq!(rules.check(None), Ok(()));
        assert_eq!(rules.check(Some(5)), Ok(()));
    }

    #[test]
    fn doesnt_exist_fires_only_when_absent() {
        let rules = RejectRules {
            doesnt_exist: true,
            ..Default::default()
        };
        assert_eq!(rules.check(None), Err(StoreError::DoesntExist));
        assert_eq!(rules.check(Some(5)), Ok(()));
    }

    #[test]
    fn exists_fires_only_when_present() {
        let rules = RejectRules {
            exists: true,
            ..Default::default()
        };
        assert_eq!(rules.check(None), Ok(()));
        assert_eq!(rules.check(Some(5)), Err(StoreError::Exists { current: 5 }));
    }

    #[test]
    fn version_le_given() {
        let rules = RejectRules {
            version_le_given: true,
            given_version: 5,
            ..Default::default()
        };
        assert_eq!(
            rules.check(Some(4)),
            Err(StoreError::WrongVersion { current: 4 })
        );
        assert_eq!(
            rules.check(Some(5)),
            Err(StoreError::WrongVersion { current: 5 })
        );
        assert_eq!(rules.check(Some(6)), Ok(()));
        // Version rules only apply to existing objects.
        assert_eq!(rules.check(None), Ok(()));
    }

    #[test]
    fn version_ne_given() {
        let rules = RejectRules {
            version_ne_given: true,
            given_version: 5,
            ..Default::default()
        };
        assert_eq!(rules.check(Some(5)), Ok(()));
        assert_eq!(
            rules.check(Some(6)),
            Err(StoreError::WrongVersion { current: 6 })
        );
    }

    #[test]
    fn first_matching_rule_wins() {
        // `exists` outranks the version rules.
        let rules = RejectRules {
            exists: true,
            version_ne_given: true,
            given_version: 5,
            ..Default::default()
        };
        assert_eq!(rules.check(Some(5)), Err(StoreError::Exists { current: 5 }));
    }
}
