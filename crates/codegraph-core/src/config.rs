use serde::{Deserialize, Serialize};

/// Logging configuration, layered the way the teacher's `ServerConfig`
/// is: built-in defaults, optionally overridden by a config file, then
/// by environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `trace` | `debug` | `info` | `warn` | `error`, or an `EnvFilter`
    /// directive string such as `codegraph_graph=debug,info`.
    pub level: String,
    pub json: bool,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            ansi: true,
        }
    }
}

/// Ingestion pipeline defaults (§4.F).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    pub max_depth: usize,
    pub exclude_patterns: Vec<String>,
    pub per_file_timeout_secs: u64,
    pub worker_threads: Option<usize>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            exclude_patterns: vec![],
            per_file_timeout_secs: 30,
            worker_threads: None,
        }
    }
}

impl IngestionConfig {
    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(num_cpus::get)
    }
}

/// Retrieval defaults (§4.G, §4.H).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub default_limit: usize,
    pub default_threshold: f32,
    pub rrf_k: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            default_threshold: 0.0,
            rrf_k: 60.0,
        }
    }
}

/// Graph-algorithm defaults (§4.I).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    pub pagerank_damping: f64,
    pub pagerank_max_iterations: usize,
    pub pagerank_tolerance: f64,
    pub betweenness_max_nodes: usize,
    pub betweenness_normalize: bool,
    pub closeness_normalize: bool,
    pub find_paths_max_depth: usize,
    pub find_paths_max_paths: usize,
    pub louvain_resolution: f64,
    pub louvain_max_iterations: usize,
    pub louvain_min_improvement: f64,
    pub label_propagation_max_iterations: usize,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            pagerank_damping: 0.85,
            pagerank_max_iterations: 100,
            pagerank_tolerance: 1e-4,
            betweenness_max_nodes: 1000,
            betweenness_normalize: true,
            closeness_normalize: true,
            find_paths_max_depth: 10,
            find_paths_max_paths: 100,
            louvain_resolution: 1.0,
            louvain_max_iterations: 10,
            louvain_min_improvement: 1e-4,
            label_propagation_max_iterations: 20,
        }
    }
}

/// Top-level application settings, layered: defaults -> `codegraph.toml`
/// (if present) -> `CODEGRAPH_*` environment overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub algorithms: AlgorithmConfig,
}

impl Settings {
    /// Load configuration from (in increasing precedence): built-in
    /// defaults, an optional `codegraph.toml` in `config_dir`, and
    /// `CODEGRAPH_`-prefixed environment variables.
    pub fn load(config_dir: Option<&std::path::Path>) -> anyhow::Result<Self> {
        let defaults = Settings::default();
        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&defaults)?,
        );

        if let Some(dir) = config_dir {
            let path = dir.join("codegraph.toml");
            if path.exists() {
                builder = builder.add_source(config::File::from(path));
            }
        }

        builder = builder.add_source(
            config::Environment::with_prefix("CODEGRAPH")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder.build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// Initialize a `tracing-subscriber` global subscriber from
/// `LoggingConfig`, the way the teacher's binaries bootstrap logging.
pub fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_new(&config.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt().with_env_filter(filter).with_ansi(config.ansi);

    if config.json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}
