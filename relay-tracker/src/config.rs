//! Tracker configuration
//!
//! Defines the configurable parameters of the tracker: bind address,
//! branch/environment allow-lists, the pipeline's stage sequence,
//! pagination bounds and demo fixture seeding.

/// Upper bound for demo fixture seeding
pub const MAX_SEED_RUNS: usize = 10_000;

/// Tracker configuration
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Address the HTTP server binds to (e.g., "0.0.0.0:8080")
    pub bind_addr: String,

    /// The only branch allowed to deploy to the production environment
    pub default_branch: String,

    /// Branch allow-list; entries ending in `/*` match by prefix
    pub allowed_branches: Vec<String>,

    /// Environment allow-list
    pub environments: Vec<String>,

    /// Environment name restricted to the default branch
    pub production_environment: String,

    /// Ordered stage names every run goes through
    pub stages: Vec<String>,

    /// Upper bound for the `limit` query parameter
    pub max_page_size: u32,

    /// Number of demo runs to seed at startup (0 disables seeding)
    pub seed_runs: usize,

    /// Seed for the demo fixture generator
    pub seed: u64,
}

impl TrackerConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - TRACKER_BIND_ADDR (default: 0.0.0.0:8080)
    /// - TRACKER_DEFAULT_BRANCH (default: main)
    /// - TRACKER_ALLOWED_BRANCHES (comma-separated)
    /// - TRACKER_ENVIRONMENTS (comma-separated)
    /// - TRACKER_PRODUCTION_ENV (default: production)
    /// - TRACKER_STAGES (comma-separated)
    /// - TRACKER_MAX_PAGE_SIZE (default: 100)
    /// - TRACKER_SEED_RUNS (default: 0)
    /// - TRACKER_SEED (default: 42)
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        let max_page_size = parse_var("TRACKER_MAX_PAGE_SIZE")?.unwrap_or(defaults.max_page_size);
        let seed_runs = parse_var("TRACKER_SEED_RUNS")?.unwrap_or(defaults.seed_runs);
        let seed = parse_var("TRACKER_SEED")?.unwrap_or(defaults.seed);

        Ok(Self {
            bind_addr: std::env::var("TRACKER_BIND_ADDR").unwrap_or(defaults.bind_addr),
            default_branch: std::env::var("TRACKER_DEFAULT_BRANCH")
                .unwrap_or(defaults.default_branch),
            allowed_branches: list_var("TRACKER_ALLOWED_BRANCHES")
                .unwrap_or(defaults.allowed_branches),
            environments: list_var("TRACKER_ENVIRONMENTS").unwrap_or(defaults.environments),
            production_environment: std::env::var("TRACKER_PRODUCTION_ENV")
                .unwrap_or(defaults.production_environment),
            stages: list_var("TRACKER_STAGES").unwrap_or(defaults.stages),
            max_page_size,
            seed_runs,
            seed,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if self.stages.is_empty() {
            anyhow::bail!("at least one stage must be configured");
        }

        for (i, stage) in self.stages.iter().enumerate() {
            if self.stages[..i].contains(stage) {
                anyhow::bail!("duplicate stage name '{}'", stage);
            }
        }

        if self.environments.is_empty() {
            anyhow::bail!("at least one environment must be configured");
        }

        if !self.is_known_environment(&self.production_environment) {
            anyhow::bail!(
                "production environment '{}' is not in the environment list",
                self.production_environment
            );
        }

        if !self.is_allowed_branch(&self.default_branch) {
            anyhow::bail!(
                "default branch '{}' is not in the branch allow-list",
                self.default_branch
            );
        }

        if self.max_page_size == 0 {
            anyhow::bail!("max_page_size must be greater than 0");
        }

        if self.seed_runs > MAX_SEED_RUNS {
            anyhow::bail!("seed_runs must be at most {}", MAX_SEED_RUNS);
        }

        Ok(())
    }

    /// Whether `branch` matches an entry of the allow-list
    pub fn is_allowed_branch(&self, branch: &str) -> bool {
        self.allowed_branches
            .iter()
            .any(|pattern| match pattern.strip_suffix('*') {
                Some(prefix) if prefix.ends_with('/') => {
                    branch.len() > prefix.len() && branch.starts_with(prefix)
                }
                _ => pattern == branch,
            })
    }

    pub fn is_known_environment(&self, environment: &str) -> bool {
        self.environments.iter().any(|e| e == environment)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            default_branch: "main".to_string(),
            allowed_branches: to_strings(&["main", "develop", "feature/*", "hotfix/*", "release/*"]),
            environments: to_strings(&["development", "staging", "production"]),
            production_environment: "production".to_string(),
            stages: to_strings(&["checkout", "test", "build", "deploy"]),
            max_page_size: 100,
            seed_runs: 0,
            seed: 42,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn list_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|value| parse_list(&value))
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T: std::str::FromStr>(name: &str) -> anyhow::Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{} has an invalid value: '{}'", name, value)),
        Err(_) => Ok(None),
    }
}
