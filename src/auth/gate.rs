//! # Authorization Gate
//!
//! Read access must be granted before any batch starts. The gate checks
//! availability, issues exactly one authorization prompt for the requested
//! scope and reports the answer once.

use tokio::sync::oneshot;

use super::errors::{AuthError, AuthResult};
use crate::catalog::MetricCatalog;
use crate::observability::{Diagnostics, Event};
use crate::store::{DataType, HealthStore};

/// Which data types a prompt covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScope {
    /// Every catalog quantity type plus electrocardiograms
    All,
    /// Every catalog quantity type
    Metrics,
    Electrocardiogram,
}

impl AuthScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScope::All => "all",
            AuthScope::Metrics => "metrics",
            AuthScope::Electrocardiogram => "electrocardiogram",
        }
    }

    /// Data types to request read access for
    pub fn data_types(&self, catalog: &MetricCatalog) -> Vec<DataType> {
        let quantities = || catalog.kinds().into_iter().map(DataType::Quantity);
        match self {
            AuthScope::All => quantities()
                .chain(std::iter::once(DataType::Electrocardiogram))
                .collect(),
            AuthScope::Metrics => quantities().collect(),
            AuthScope::Electrocardiogram => vec![DataType::Electrocardiogram],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuthorizationGate {
    diagnostics: Diagnostics,
}

impl AuthorizationGate {
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }

    /// Prompt for `scope`; `done` fires exactly once with the answer.
    ///
    /// An unavailable store answers immediately without a prompt.
    pub fn request<F>(
        &self,
        store: &dyn HealthStore,
        catalog: &MetricCatalog,
        scope: AuthScope,
        done: F,
    ) where
        F: FnOnce(AuthResult<()>) + Send + 'static,
    {
        if !store.is_available() {
            self.diagnostics.event(
                Event::AuthorizationDenied,
                &[("reason", "unavailable"), ("scope", scope.as_str())],
            );
            done(Err(AuthError::Unavailable));
            return;
        }

        let types = scope.data_types(catalog);
        let count = types.len().to_string();
        self.diagnostics.event(
            Event::AuthorizationRequested,
            &[("scope", scope.as_str()), ("types", count.as_str())],
        );

        let diagnostics = self.diagnostics.clone();
        store.request_authorization(
            &types,
            Box::new(move |answer| {
                let result = match answer {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(AuthError::Denied),
                    Err(e) => Err(AuthError::from(e)),
                };
                match &result {
                    Ok(()) => diagnostics
                        .event(Event::AuthorizationGranted, &[("scope", scope.as_str())]),
                    Err(e) => {
                        let reason = e.to_string();
                        diagnostics.event(
                            Event::AuthorizationDenied,
                            &[("reason", reason.as_str()), ("scope", scope.as_str())],
                        );
                    }
                }
                done(result);
            }),
        );
    }

    /// Awaitable form of [`request`](Self::request)
    pub async fn authorize(
        &self,
        store: &dyn HealthStore,
        catalog: &MetricCatalog,
        scope: AuthScope,
    ) -> AuthResult<()> {
        let (tx, rx) = oneshot::channel();
        self.request(store, catalog, scope, move |result| {
            let _ = tx.send(result);
        });
        rx.await.unwrap_or_else(|_| {
            Err(AuthError::RequestFailed(
                "authorization callback dropped".into(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixture::AuthorizationFixture;
    use crate::store::{Fixture, FixtureStore};

    fn store(authorization: AuthorizationFixture, available: bool) -> FixtureStore {
        FixtureStore::new(Fixture {
            available,
            authorization,
            ..Fixture::default()
        })
    }

    #[test]
    fn test_scope_types() {
        let catalog = MetricCatalog::standard();
        assert_eq!(AuthScope::All.data_types(&catalog).len(), 6);
        assert_eq!(AuthScope::Metrics.data_types(&catalog).len(), 5);
        assert_eq!(
            AuthScope::Electrocardiogram.data_types(&catalog),
            vec![DataType::Electrocardiogram]
        );
    }

    #[tokio::test]
    async fn test_granted() {
        let store = store(AuthorizationFixture::Granted, true);
        let gate = AuthorizationGate::default();
        let result = gate
            .authorize(&store, MetricCatalog::global(), AuthScope::All)
            .await;
        assert_eq!(result, Ok(()));
        assert_eq!(store.counts().authorizations, 1);
    }

    #[tokio::test]
    async fn test_denied() {
        let store = store(AuthorizationFixture::Denied, true);
        let result = AuthorizationGate::default()
            .authorize(&store, MetricCatalog::global(), AuthScope::Electrocardiogram)
            .await;
        assert_eq!(result, Err(AuthError::Denied));
    }

    #[tokio::test]
    async fn test_prompt_failure_keeps_message() {
        let store = store(
            AuthorizationFixture::Error {
                message: "no entitlement".into(),
            },
            true,
        );
        let result = AuthorizationGate::default()
            .authorize(&store, MetricCatalog::global(), AuthScope::All)
            .await;
        assert_eq!(result, Err(AuthError::RequestFailed("no entitlement".into())));
    }

    #[tokio::test]
    async fn test_unavailable_skips_prompt() {
        let store = store(AuthorizationFixture::Granted, false);
        let result = AuthorizationGate::default()
            .authorize(&store, MetricCatalog::global(), AuthScope::Electrocardiogram)
            .await;
        assert_eq!(result, Err(AuthError::Unavailable));
        assert_eq!(store.counts().authorizations, 0);
    }
}
