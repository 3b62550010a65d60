use std::fmt;
use uuid::Uuid;

/// Key prefix shared with the discovery service.
const KEY_PREFIX: &str = "A";

/// Identity of one supervised agent run, as the discovery service sees it.
///
/// `scope` groups restarts of the same logical install; `instance` is unique
/// to one run. Without a configured scope override both are freshly minted,
/// so consecutive runs are not recognizable as the same install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconKey {
    scope: String,
    instance: Uuid,
}

impl BeaconKey {
    pub fn new(scope_override: Option<&str>) -> Self {
        let scope = match scope_override {
            Some(scope) if !scope.is_empty() => scope.to_string(),
            _ => Uuid::now_v7().to_string(),
        };

        Self {
            scope,
            instance: Uuid::new_v4(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn instance(&self) -> Uuid {
        self.instance
    }
}

impl fmt::Display for BeaconKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", KEY_PREFIX, self.scope, self.instance)
    }
}
