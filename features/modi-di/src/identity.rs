use uuid::Uuid;

/// What kind of descriptor an [Identity] was allocated for
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum IdentityKind {
    Provider,
    Module,
    Adapter,
}

impl IdentityKind {
    fn prefix(self) -> &'static str {
        match self {
            IdentityKind::Provider => "p",
            IdentityKind::Module => "m",
            IdentityKind::Adapter => "a",
        }
    }
}

/// Process unique, unpredictable identity of a descriptor.
///
/// Names say what a descriptor is meant to be, identities say which object it is.
/// Backed by a random v4 uuid, so there is no global counter to reset between runs.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct Identity {
    kind: IdentityKind,
    id: Uuid,
}

impl Identity {
    pub(crate) fn allocate(kind: IdentityKind) -> Self {
        Self {
            kind,
            id: Uuid::new_v4(),
        }
    }

    pub fn kind(&self) -> IdentityKind {
        self.kind
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), self.id.simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identities_are_unique_and_prefixed() {
        let a = Identity::allocate(IdentityKind::Provider);
        let b = Identity::allocate(IdentityKind::Provider);
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("p:"));
        assert!(Identity::allocate(IdentityKind::Module)
            .to_string()
            .starts_with("m:"));
    }
}
