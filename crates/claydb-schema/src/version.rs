use crate::entity::EntityDefinition;
use serde::{Deserialize, Serialize};

///
/// SchemaMode
///
/// Which side of the version lineage a request resolves against.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SchemaMode {
    /// The published version only.
    #[default]
    Default,
    /// The latest version, draft included.
    Sandbox,
}

///
/// VersionState
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionState {
    Draft,
    Published,
    Retired,
}

///
/// SchemaVersion
///
/// A published version is immutable; edits land on the draft.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaVersion {
    pub number: u32,
    pub state: VersionState,
    pub definition: EntityDefinition,
}

///
/// VersionLineage
///
/// Version history for one entity. Invariants: at most one draft (always
/// the newest version), at most one published version at a time.
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VersionLineage {
    versions: Vec<SchemaVersion>,
}

impl VersionLineage {
    /// Start a lineage from the first definition, published immediately.
    #[must_use]
    pub fn first(definition: EntityDefinition) -> Self {
        Self {
            versions: vec![SchemaVersion {
                number: 1,
                state: VersionState::Published,
                definition,
            }],
        }
    }

    #[must_use]
    pub fn published(&self) -> Option<&SchemaVersion> {
        self.versions
            .iter()
            .find(|v| v.state == VersionState::Published)
    }

    /// Newest version regardless of state. The lineage is never empty.
    #[must_use]
    pub fn latest(&self) -> &SchemaVersion {
        self.versions
            .last()
            .unwrap_or_else(|| unreachable!("lineage holds at least one version"))
    }

    #[must_use]
    pub fn resolve(&self, mode: SchemaMode) -> Option<&SchemaVersion> {
        match mode {
            SchemaMode::Default => self.published(),
            SchemaMode::Sandbox => Some(self.latest()),
        }
    }

    /// Record an edited definition as the draft.
    ///
    /// An existing draft is replaced in place; otherwise a new draft
    /// version is appended. Published versions are never touched.
    pub fn ensure(&mut self, definition: EntityDefinition) {
        if let Some(last) = self.versions.last_mut()
            && last.state == VersionState::Draft
        {
            last.definition = definition;
            return;
        }

        let number = self.latest().number + 1;
        self.versions.push(SchemaVersion {
            number,
            state: VersionState::Draft,
            definition,
        });
    }

    /// Promote the draft to published, retiring the previous published
    /// version. Without a draft, re-publishes the latest version.
    pub fn publish(&mut self) {
        let target = self.versions.len().saturating_sub(1);

        for (idx, version) in self.versions.iter_mut().enumerate() {
            if version.state == VersionState::Published && idx != target {
                version.state = VersionState::Retired;
            }
        }
        self.versions[target].state = VersionState::Published;
    }

    /// Retire the published version; default-mode resolution then fails.
    pub fn unpublish(&mut self) {
        for version in &mut self.versions {
            if version.state == VersionState::Published {
                version.state = VersionState::Retired;
            }
        }
    }
}

///
/// TESTS
///
