//! The `gigo` application: backend wiring, logging, and command dispatch.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use gigo_core::util::files::read_file;
use gigo_core::util::paths::expand_path;
use gigo_core::{Error, Result};
use gigo_references::{Reference, ReferenceKind, ReferenceResolver};
use gigo_retrieval::{
    EmbeddingKind, EmbeddingProvider, MockEmbeddingProvider, OpenAiEmbeddingProvider,
    QdrantSearchClient, RankedList, ResolutionModel, RetrievalConfig, RoutingEmbeddingProvider,
    StrategyFactory, VectorSearchClient,
};
use gigo_service::llm::ClaudeProvider;
use gigo_service::{
    Answer, AnswerSynthesizer, EvidenceService, LlmProvider, OutlineSection, QueryDecomposer,
    QuestionAnswerer,
};

use crate::cli::{AskArgs, CliArgs, Command, QueryArgs, ReferencesArgs};
use crate::config::{GigoConfig, secret};
use crate::config_handlers;

// ============================================================================
// Backends
// ============================================================================

/// External collaborators the commands run against.
#[derive(Clone)]
pub struct Backends {
    /// Vector search service.
    pub client: Arc<dyn VectorSearchClient>,
    /// Query embedding provider.
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Chat-completion provider, if one is configured.
    pub llm: Option<Arc<dyn LlmProvider>>,
}

impl Backends {
    /// Build the backends described by `config`.
    pub fn from_config(config: &GigoConfig) -> Result<Self> {
        Ok(Self {
            client: search_client(config)?,
            embedder: embedder(config)?,
            llm: llm(config)?,
        })
    }
}

fn search_client(config: &GigoConfig) -> Result<Arc<dyn VectorSearchClient>> {
    let mut client = QdrantSearchClient::new(&config.qdrant.url)
        .with_timeout(Duration::from_secs(config.qdrant.timeout_secs))?;
    if let Some(key) = config.qdrant.api_key.as_deref().filter(|k| !k.is_empty()) {
        client = client.with_api_key(key);
    }
    Ok(Arc::new(client))
}

/// Route each embedding kind to the backend that serves it. Kinds left
/// unrouted surface as configuration errors when a strategy needs them.
fn embedder(config: &GigoConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let settings = &config.embeddings;
    let mut routing = RoutingEmbeddingProvider::new();

    if let Some(key) = secret(settings.openai_api_key.as_deref(), "OPENAI_API_KEY") {
        let openai: Arc<dyn EmbeddingProvider> = Arc::new(
            OpenAiEmbeddingProvider::new(key)
                .with_models(
                    ResolutionModel::new(&settings.small_model, settings.small_dimensions),
                    ResolutionModel::new(&settings.large_model, settings.large_dimensions),
                )
                .with_timeout(Duration::from_secs(config.qdrant.timeout_secs))?,
        );
        routing = routing
            .with_route(EmbeddingKind::Small, openai.clone())
            .with_route(EmbeddingKind::Large, openai);
    }

    #[cfg(feature = "fastembed")]
    {
        let local: Arc<dyn EmbeddingProvider> = Arc::new(gigo_retrieval::FastEmbedProvider::new(
            &settings.dense_model,
            settings.sparse_model.as_deref(),
            settings.cache_path.as_deref(),
        )?);
        routing = routing.with_route(EmbeddingKind::Dense, local.clone());
        if settings.sparse_model.is_some() {
            routing = routing.with_route(EmbeddingKind::Sparse, local);
        }
    }

    if let Some(dimension) = settings.mock_dimension {
        log::warn!("Using deterministic mock embeddings ({dimension} dimensions) for unrouted kinds");
        routing = routing.with_fallback(Arc::new(MockEmbeddingProvider::new(dimension)));
    }

    log::debug!("Embedding routes: {:?}", routing.kinds());
    Ok(Arc::new(routing))
}

fn llm(config: &GigoConfig) -> Result<Option<Arc<dyn LlmProvider>>> {
    let settings = &config.llm;
    let Some(key) = secret(settings.api_key.as_deref(), "ANTHROPIC_API_KEY") else {
        return Ok(None);
    };
    let mut provider = ClaudeProvider::new(key, &settings.model)
        .with_timeout(Duration::from_secs(settings.timeout_secs))?;
    if let Some(base_url) = &settings.base_url {
        provider = provider.with_base_url(base_url);
    }
    Ok(Some(Arc::new(provider)))
}

// ============================================================================
// GigoApp
// ============================================================================

/// The CLI application.
pub struct GigoApp {
    config: GigoConfig,
    backends: Backends,
    version: String,
}

impl GigoApp {
    /// Create from CLI args, loading config from file/env.
    pub fn from_args(args: &CliArgs) -> Result<Self> {
        let config = GigoConfig::load(args.config.as_deref())?;
        let backends = Backends::from_config(&config)?;
        Ok(Self::new(config, backends))
    }

    /// Create an application over explicit backends.
    pub fn new(config: GigoConfig, backends: Backends) -> Self {
        Self {
            config,
            backends,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// The loaded configuration.
    pub fn config(&self) -> &GigoConfig {
        &self.config
    }

    /// Run one command.
    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Version => {
                println!("gigo {}", self.version);
                Ok(())
            }
            Command::Search(args) => {
                let output = self.search(&args).await?;
                println!("{output}");
                Ok(())
            }
            Command::References(args) => {
                let output = self.references(&args).await?;
                println!("{output}");
                Ok(())
            }
            Command::Ask(args) => {
                let answer = self.ask(&args).await?;
                if args.query.json {
                    println!("{}", serde_json::to_string_pretty(&answer)?);
                } else {
                    println!("{}\n\n{}", answer.answer, format_references(&answer.references));
                }
                Ok(())
            }
            Command::Config(_) => Err(Error::operation(
                "config commands are handled before backends are built",
            )),
        }
    }

    fn retrieval_config(&self, args: &QueryArgs) -> RetrievalConfig {
        args.retrieval.apply(&self.config.retrieval)
    }

    async fn retrieve(&self, args: &QueryArgs) -> Result<RankedList> {
        let retrieval = self.retrieval_config(args);
        let strategy = StrategyFactory::new(self.backends.embedder.clone(), self.backends.client.clone())
            .from_config(&retrieval)?;
        let results = strategy.retrieve(&retrieval.request(&args.query)).await?;
        log::info!("{} returned {} results", strategy.name(), results.len());
        Ok(results)
    }

    /// `gigo search`: ranked candidates as text or JSON.
    pub async fn search(&self, args: &QueryArgs) -> Result<String> {
        let results = self.retrieve(args).await?;
        if args.json {
            return Ok(serde_json::to_string_pretty(&results)?);
        }
        Ok(format_results(&results))
    }

    /// `gigo references`: resolved references as text or JSON.
    pub async fn references(&self, args: &ReferencesArgs) -> Result<String> {
        let results = self.retrieve(&args.query).await?;
        let scratch = self.scratch_path(args.scratch_path.as_deref());
        let references = ReferenceResolver::new().resolve(results.records(), &scratch).await;
        if args.query.json {
            return Ok(serde_json::to_string_pretty(&references)?);
        }
        Ok(format_references(&references))
    }

    /// `gigo ask`: decompose, retrieve, resolve, and answer.
    pub async fn ask(&self, args: &AskArgs) -> Result<Answer> {
        let llm = self.backends.llm.clone().ok_or_else(|| {
            Error::config("`gigo ask` needs an LLM: set llm.api_key or ANTHROPIC_API_KEY")
        })?;

        let retrieval = self.retrieval_config(&args.query);
        let strategy = StrategyFactory::new(self.backends.embedder.clone(), self.backends.client.clone())
            .from_config(&retrieval)?;
        let mut evidence = EvidenceService::new(
            strategy,
            retrieval.request(""),
            self.scratch_path(args.scratch_path.as_deref()),
        );

        if self.config.llm.decompose && !args.no_decompose {
            let decomposer = QueryDecomposer::new(llm.clone())
                .with_outline(self.outline().await?)
                .with_max_sub_questions(self.config.llm.max_sub_questions);
            evidence = evidence.with_decomposer(decomposer);
        }

        let synthesizer = AnswerSynthesizer::new(llm).with_max_tokens(self.config.llm.max_tokens);
        QuestionAnswerer::new(evidence, synthesizer)
            .answer(&args.query.query)
            .await
    }

    fn scratch_path(&self, explicit: Option<&str>) -> PathBuf {
        explicit.map_or_else(|| self.config.scratch_path(), expand_path)
    }

    async fn outline(&self) -> Result<Vec<OutlineSection>> {
        let Some(path) = self.config.llm.outline_path.as_deref() else {
            return Ok(Vec::new());
        };
        let path = expand_path(path);
        let content = read_file(&path).await?;
        serde_json::from_str(&content)
            .map_err(|e| Error::config(format!("Invalid outline in {}: {e}", path.display())))
    }
}

// ============================================================================
// Entry point helpers
// ============================================================================

/// Initialise tracing-based logging.
///
/// Uses `RUST_LOG` env var if set, otherwise defaults based on verbosity flags.
pub fn init_logging(verbose: bool, quiet: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // Ignore error if a subscriber is already set (e.g. in tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parse-independent entry point used by `main`.
pub async fn run(mut args: CliArgs) -> Result<()> {
    init_logging(args.verbose, args.quiet);

    match args.command.take() {
        None => {
            println!("gigo {}: use --help for usage", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(Command::Config(config_cmd)) => {
            config_handlers::handle_config_command(args.config.as_deref(), config_cmd.command)
        }
        Some(Command::Version) => {
            println!("gigo {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(command) => GigoApp::from_args(&args)?.run(command).await,
    }
}

// ============================================================================
// Output formatting
// ============================================================================

/// One line per candidate: rank, score, page, id.
pub fn format_results(results: &RankedList) -> String {
    if results.is_empty() {
        return "No results.".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(rank, record)| {
            let page = record
                .page_number()
                .map_or_else(|| "-".to_string(), |p| p.to_string());
            format!("{:>3}. {:>8.3}  page {:>4}  {}", rank + 1, record.score, page, record.id)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One line per reference with its title and located files.
pub fn format_references(references: &[Reference]) -> String {
    if references.is_empty() {
        return "No references.".to_string();
    }
    references
        .iter()
        .map(|r| {
            let kind = match r.kind {
                ReferenceKind::Table => "table",
                ReferenceKind::Figure => "figure",
            };
            let mut line = format!(
                "{kind:<6} {:<12} page {}",
                r.identifier().unwrap_or("?"),
                r.page_number.map_or_else(|| "-".to_string(), |p| p.to_string())
            );
            if let Some(title) = &r.title {
                line.push_str(&format!("  \"{title}\""));
            }
            for path in [&r.files.html, &r.files.png].into_iter().flatten() {
                line.push_str(&format!("\n         {}", path.display()));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Tests
// ============================================================================
