use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheKey, CacheLookup, FileCache};
use crate::catalog::CategoryLookup;
use crate::fallback::generate_fallback;
use crate::kobold::{GenerationParams, KoboldClient};
use crate::metrics::{BACKEND_GENERATIONS, CACHE_HITS, CACHE_MISSES, FALLBACKS};
use crate::models::{Company, Template};
use crate::prompt::{build_prompt, strip_echo};

// How a request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    CacheHit,
    Generated,
    BackendDown,
    BackendError,
}

#[derive(Debug, Clone)]
pub struct Generated {
    pub text: String,
    pub outcome: Outcome,
}

pub struct ReviewRequestGenerator {
    client: KoboldClient,
    cache: FileCache,
    categories: Arc<dyn CategoryLookup>,
}

impl ReviewRequestGenerator {
    pub fn new(client: KoboldClient, cache: FileCache, categories: Arc<dyn CategoryLookup>) -> Self {
        Self {
            client,
            cache,
            categories,
        }
    }

    pub fn client(&self) -> &KoboldClient {
        &self.client
    }

    pub fn cache(&self) -> &FileCache {
        &self.cache
    }

    /// Draft a review request. Always returns text: backend or cache
    /// failures degrade to template substitution.
    pub async fn generate_review_request(&self, company: &Company, template: &Template, use_cache: bool) -> String {
        self.generate(company, template, use_cache).await.text
    }

    pub async fn generate(&self, company: &Company, template: &Template, use_cache: bool) -> Generated {
        let key = CacheKey::compute(company, template);

        if use_cache {
            match self.cache.lookup(&key).await {
                CacheLookup::Hit(text) => {
                    CACHE_HITS.inc();
                    info!(company = %company.name, "using cached request");
                    return Generated {
                        text,
                        outcome: Outcome::CacheHit,
                    };
                }
                CacheLookup::Miss => {}
                CacheLookup::Expired => debug!(key = %key, "cached request expired"),
                CacheLookup::Error(reason) => warn!(key = %key, %reason, "cache read failed, treating as miss"),
            }
            CACHE_MISSES.inc();
        }

        // One config snapshot for both backend calls
        let config = self.client.resolve_config(None).await;

        let check_started = Instant::now();
        if !self.client.health_check_with(&config).await {
            warn!(
                company = %company.name,
                elapsed = ?check_started.elapsed(),
                "generation backend unavailable, using fallback"
            );
            return self.fallback(company, template, Outcome::BackendDown);
        }

        let prompt = build_prompt(company, template);
        info!(company = %company.name, "generating request through the backend");
        let generation_started = Instant::now();

        let text = match self
            .client
            .generate_text_with(&config, &prompt, &GenerationParams::default())
            .await
        {
            Ok(raw) => strip_echo(&raw, &prompt),
            Err(e) => {
                error!(company = %company.name, error = %e, "error generating review request");
                return self.fallback(company, template, Outcome::BackendError);
            }
        };
        if text.is_empty() {
            error!(company = %company.name, "backend returned only the echoed prompt");
            return self.fallback(company, template, Outcome::BackendError);
        }

        debug!(elapsed = ?generation_started.elapsed(), chars = text.chars().count(), "request generated");
        BACKEND_GENERATIONS.inc();
        if use_cache {
            self.cache.put(&key, &text).await;
        }

        Generated {
            text,
            outcome: Outcome::Generated,
        }
    }

    // Fallback results are never cached
    fn fallback(&self, company: &Company, template: &Template, outcome: Outcome) -> Generated {
        FALLBACKS.inc();
        info!(company = %company.name, ?outcome, "using template fallback");
        Generated {
            text: generate_fallback(company, template, self.categories.as_ref()),
            outcome,
        }
    }
}
