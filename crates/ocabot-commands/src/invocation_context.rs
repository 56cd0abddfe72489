use serde::Serialize;

/// Organization and repository name pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RepositoryIdentity {
    pub organization: String,
    pub repository: String,
}

impl RepositoryIdentity {
    pub fn new(organization: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            repository: repository.into(),
        }
    }

    /// Parses an `org/repo` slug.
    pub fn parse(slug: &str) -> Result<Self, String> {
        let trimmed = slug.trim();
        match trimmed.split_once('/') {
            Some((organization, repository))
                if !organization.is_empty()
                    && !repository.is_empty()
                    && !repository.contains('/') =>
            {
                Ok(Self::new(organization, repository))
            }
            _ => Err(format!(
                "invalid repository '{trimmed}': expected <organization>/<repository>"
            )),
        }
    }
}

impl std::fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.organization, self.repository)
    }
}

/// Where a comment was posted and by whom. Supplied by the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationContext {
    pub repository: RepositoryIdentity,
    pub is_pull_request: bool,
    pub username: String,
}

impl InvocationContext {
    pub fn pull_request(repository: RepositoryIdentity, username: impl Into<String>) -> Self {
        Self {
            repository,
            is_pull_request: true,
            username: username.into(),
        }
    }

    pub fn issue(repository: RepositoryIdentity, username: impl Into<String>) -> Self {
        Self {
            repository,
            is_pull_request: false,
            username: username.into(),
        }
    }
}

/// The single repository where `add_psc` may be used.
///
/// A bare repository name matches that name in any organization; an
/// `org/repo` slug must match both parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PscRepository {
    Named(String),
    Qualified(RepositoryIdentity),
}

impl PscRepository {
    /// Parses a configuration value; blank values mean "not configured".
    pub fn parse(raw: &str) -> Result<Option<Self>, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.contains('/') {
            return RepositoryIdentity::parse(trimmed).map(|identity| Some(Self::Qualified(identity)));
        }
        Ok(Some(Self::Named(trimmed.to_string())))
    }

    pub fn matches(&self, repository: &RepositoryIdentity) -> bool {
        match self {
            Self::Named(name) => repository.repository == *name,
            Self::Qualified(identity) => identity == repository,
        }
    }
}

impl std::fmt::Display for PscRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Qualified(identity) => write!(f, "{identity}"),
        }
    }
}
