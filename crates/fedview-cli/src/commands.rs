//! Command execution.
//!
//! Every command writes one JSON document per line. A resolution failure is
//! written as a classified-error record and then returned as
//! [`CliError::Resolution`] so the process can exit non-zero.

use std::io::Write;
use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use tracing::{debug, info};

use fedview_core::{replace_custom_emojis, ObjectFetcher, PostWithAuthor, DEFAULT_EMOJI_CLASS};
use fedview_fetch::HttpFetcher;
use fedview_resolver::{
    BatchResolver, ClassifiedError, HashtagSearch, HostProbe, HttpProbe, MastodonSearch,
    Resolver, ResolverError, SearchProvider,
};

use crate::args::Command;
use crate::config::FedviewConfig;
use crate::error::{CliError, CliResult};

/// A classified failure as written to the output.
#[derive(Debug, Serialize)]
pub struct ErrorRecord<'a> {
    /// The classified error.
    #[serde(flatten)]
    pub error: &'a ClassifiedError,
    /// Text suitable for an end user.
    pub user_message: String,
}

impl<'a> ErrorRecord<'a> {
    /// Wraps a classified error.
    pub fn new(error: &'a ClassifiedError) -> Self {
        Self {
            error,
            user_message: error.user_message(),
        }
    }
}

/// A resolved post with its content and author name rendered for display.
#[derive(Debug, Serialize)]
struct RenderedPost<'a> {
    #[serde(flatten)]
    resolved: &'a PostWithAuthor,
    content_rendered: String,
    author_name_rendered: String,
}

impl<'a> RenderedPost<'a> {
    fn new(resolved: &'a PostWithAuthor) -> Self {
        let (post, author) = (&resolved.post, &resolved.author);
        Self {
            content_rendered: replace_custom_emojis(
                &post.content_html,
                &post.emojis,
                DEFAULT_EMOJI_CLASS,
            ),
            author_name_rendered: replace_custom_emojis(
                &author.display_name,
                &author.emojis,
                DEFAULT_EMOJI_CLASS,
            ),
            resolved,
        }
    }
}

/// Wired-up resolver components.
#[derive(Debug)]
pub struct App {
    resolver: Arc<Resolver>,
    batch: BatchResolver,
    search: Option<HashtagSearch>,
}

impl App {
    /// Builds the HTTP-backed components described by `config`.
    ///
    /// Hashtag search is only available when an access token is configured.
    pub fn from_config(config: &FedviewConfig) -> CliResult<Self> {
        let fetcher = HttpFetcher::new(config.fetcher_config())?;
        let probe = HttpProbe::new(config.classifier.probe_timeout, config.fetch.user_agent.clone())?;

        let search_config = config.search_config();
        let search: Option<Arc<dyn SearchProvider>> = if search_config.access_token.is_some() {
            Some(Arc::new(MastodonSearch::new(&search_config)?))
        } else {
            debug!("no search access token configured, hashtag search disabled");
            None
        };

        Self::with_components(Arc::new(fetcher), Arc::new(probe), search, config)
    }

    /// Builds an app over caller-supplied components.
    pub fn with_components(
        fetcher: Arc<dyn ObjectFetcher>,
        probe: Arc<dyn HostProbe>,
        search: Option<Arc<dyn SearchProvider>>,
        config: &FedviewConfig,
    ) -> CliResult<Self> {
        config.validate()?;
        let resolver = Arc::new(Resolver::new(fetcher, probe, config.resolver_config())?);
        let batch = BatchResolver::new(Arc::clone(&resolver), config.batch_config())?;
        let search = search.map(|provider| HashtagSearch::new(provider, config.search.limit));

        Ok(Self {
            resolver,
            batch,
            search,
        })
    }

    /// Returns the resolver.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Runs `command`, writing JSON lines to `out`.
    pub async fn run<W: Write>(&self, command: Command, out: &mut W) -> CliResult<()> {
        match command {
            Command::Resolve { identifier } => {
                let identifier = self.resolver.normalize(&identifier);
                match self.resolver.resolve_one(&identifier).await {
                    Ok(resolution) => write_line(out, &resolution),
                    Err(err) => report(out, err),
                }
            }
            Command::Post { identifier } => {
                let identifier = self.resolver.normalize(&identifier);
                match self.resolver.resolve_post(&identifier).await {
                    Ok(resolved) => write_line(out, &RenderedPost::new(&resolved)),
                    Err(err) => report(out, err),
                }
            }
            Command::Profile { identifier } => {
                let identifier = self.resolver.normalize(&identifier);
                match self.resolver.resolve_profile(&identifier).await {
                    Ok(actor) => write_line(out, &actor),
                    Err(err) => report(out, err),
                }
            }
            Command::Recent { identifier, limit } => {
                let identifier = self.resolver.normalize(&identifier);
                match self.resolver.resolve_recent(&identifier, limit).await {
                    Ok(posts) => {
                        for post in &posts {
                            write_line(out, &RenderedPost::new(post))?;
                        }
                        Ok(())
                    }
                    Err(err) => report(out, err),
                }
            }
            Command::Hashtag { tag, chunked } => self.hashtag(&tag, chunked, out).await,
            Command::Normalize { identifier } => {
                write_line(out, &self.resolver.normalize(&identifier))
            }
            Command::Classify { host, message } => {
                let classified = self
                    .resolver
                    .classifier()
                    .classify_message(&message, &host)
                    .await;
                write_line(out, &ErrorRecord::new(&classified))
            }
        }
    }

    async fn hashtag<W: Write>(&self, tag: &str, chunked: bool, out: &mut W) -> CliResult<()> {
        let search = self
            .search
            .as_ref()
            .ok_or_else(|| ResolverError::config("search access token is not configured"))?;

        let ids = search.candidates(tag).await?;
        info!(tag = %tag, candidates = ids.len(), chunked, "resolving hashtag results");

        if chunked {
            let mut reports = self.batch.chunks(ids);
            while let Some(report) = reports.next().await {
                write_line(out, &report)?;
            }
        } else {
            let mut items = self.batch.stream(ids);
            while let Some(item) = items.next().await {
                write_line(out, &item)?;
            }
        }
        Ok(())
    }
}

fn write_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

fn report<W: Write>(out: &mut W, err: ClassifiedError) -> CliResult<()> {
    write_line(out, &ErrorRecord::new(&err))?;
    Err(CliError::Resolution(err))
}
