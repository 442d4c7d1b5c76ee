//! The native 3DS2 authenticator seam and the slot that owns its lifecycle.

use std::sync::Arc;

use common_utils::CustomResult;
use error_stack::report;

use crate::error::ThreeDs2Error;

/// Result of a completed challenge, submitted back as `threeds2.challengeResult`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChallengeResult {
    pub payload: String,
}

/// A native 3DS2 authenticator instance.
///
/// An instance is single use: once released it must not be used again and a fresh one has to be
/// acquired from the [`AuthenticatorProvider`].
#[async_trait::async_trait]
pub trait ThreeDs2Authenticator: Send {
    /// Collect device data for the encoded fingerprint token and return the encoded fingerprint.
    async fn create_fingerprint(
        &mut self,
        encoded_fingerprint_token: &str,
    ) -> CustomResult<String, ThreeDs2Error>;

    /// Present the challenge described by the encoded token and wait for the shopper.
    async fn present_challenge(
        &mut self,
        encoded_challenge_token: &str,
    ) -> CustomResult<ChallengeResult, ThreeDs2Error>;

    fn release(&mut self);

    fn is_released(&self) -> bool;
}

/// Creates authenticator instances. Absent when the integration ships without 3DS2 support.
pub trait AuthenticatorProvider: Send + Sync {
    fn acquire(&self) -> CustomResult<Box<dyn ThreeDs2Authenticator>, ThreeDs2Error>;
}

/// Owns at most one authenticator instance and releases every acquired instance exactly once.
pub struct AuthenticatorSlot {
    provider: Option<Arc<dyn AuthenticatorProvider>>,
    current: Option<Box<dyn ThreeDs2Authenticator>>,
}

impl std::fmt::Debug for AuthenticatorSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatorSlot")
            .field("available", &self.is_available())
            .field("held", &self.is_held())
            .finish()
    }
}

impl AuthenticatorSlot {
    pub fn new(provider: Option<Arc<dyn AuthenticatorProvider>>) -> Self {
        Self {
            provider,
            current: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Whether a live, unreleased instance is held.
    pub fn is_held(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|authenticator| !authenticator.is_released())
    }

    /// Borrow the held instance, acquiring a fresh one first when none is held or the held one
    /// was already released.
    ///
    /// The returned lease releases the instance when dropped unless [`AuthenticatorLease::keep`]
    /// is called, which covers failures and cancellation of the in-flight operation alike.
    pub fn lease(&mut self) -> CustomResult<AuthenticatorLease<'_>, ThreeDs2Error> {
        if !self.is_held() {
            let provider = self
                .provider
                .as_ref()
                .ok_or(report!(ThreeDs2Error::AuthenticatorUnavailable))?;
            tracing::debug!("acquiring 3DS2 authenticator");
            self.current = Some(provider.acquire()?);
        }

        Ok(AuthenticatorLease {
            slot: self,
            keep: false,
        })
    }

    /// Release the held instance, if any. Returns whether an instance was released.
    pub fn release(&mut self) -> bool {
        match self.current.take() {
            Some(mut authenticator) => {
                if !authenticator.is_released() {
                    tracing::debug!("releasing 3DS2 authenticator");
                    authenticator.release();
                }
                true
            }
            None => false,
        }
    }
}

impl Drop for AuthenticatorSlot {
    fn drop(&mut self) {
        self.release();
    }
}

/// Scoped use of the instance held by an [`AuthenticatorSlot`].
pub struct AuthenticatorLease<'a> {
    slot: &'a mut AuthenticatorSlot,
    keep: bool,
}

impl std::fmt::Debug for AuthenticatorLease<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatorLease")
            .field("slot", &self.slot)
            .field("keep", &self.keep)
            .finish()
    }
}

impl AuthenticatorLease<'_> {
    pub async fn create_fingerprint(
        &mut self,
        encoded_fingerprint_token: &str,
    ) -> CustomResult<String, ThreeDs2Error> {
        match self.slot.current.as_deref_mut() {
            Some(authenticator) => {
                authenticator
                    .create_fingerprint(encoded_fingerprint_token)
                    .await
            }
            None => Err(report!(ThreeDs2Error::AuthenticatorReleased)),
        }
    }

    pub async fn present_challenge(
        &mut self,
        encoded_challenge_token: &str,
    ) -> CustomResult<ChallengeResult, ThreeDs2Error> {
        match self.slot.current.as_deref_mut() {
            Some(authenticator) => {
                authenticator
                    .present_challenge(encoded_challenge_token)
                    .await
            }
            None => Err(report!(ThreeDs2Error::AuthenticatorReleased)),
        }
    }

    /// Keep the instance held in the slot for a follow-up operation.
    pub fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for AuthenticatorLease<'_> {
    fn drop(&mut self) {
        if !self.keep {
            self.slot.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    #[derive(Default)]
    struct Counters {
        acquired: AtomicUsize,
        released: AtomicUsize,
    }

    struct CountingAuthenticator {
        counters: Arc<Counters>,
        released: bool,
    }

    #[async_trait::async_trait]
    impl ThreeDs2Authenticator for CountingAuthenticator {
        async fn create_fingerprint(&mut self, token: &str) -> CustomResult<String, ThreeDs2Error> {
            Ok(format!("fp-{token}"))
        }

        async fn present_challenge(
            &mut self,
            _token: &str,
        ) -> CustomResult<ChallengeResult, ThreeDs2Error> {
            Err(report!(ThreeDs2Error::ChallengeCancelled))
        }

        fn release(&mut self) {
            self.released = true;
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }

        fn is_released(&self) -> bool {
            self.released
        }
    }

    struct CountingProvider(Arc<Counters>);

    impl AuthenticatorProvider for CountingProvider {
        fn acquire(&self) -> CustomResult<Box<dyn ThreeDs2Authenticator>, ThreeDs2Error> {
            self.0.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingAuthenticator {
                counters: Arc::clone(&self.0),
                released: false,
            }))
        }
    }

    fn slot() -> (AuthenticatorSlot, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let provider: Arc<dyn AuthenticatorProvider> =
            Arc::new(CountingProvider(Arc::clone(&counters)));
        (AuthenticatorSlot::new(Some(provider)), counters)
    }

    #[tokio::test]
    async fn kept_lease_reuses_the_same_instance() {
        let (mut slot, counters) = slot();

        let mut lease = slot.lease().unwrap();
        assert_eq!(lease.create_fingerprint("t").await.unwrap(), "fp-t");
        lease.keep();
        assert!(slot.is_held());

        let lease = slot.lease().unwrap();
        drop(lease);

        assert_eq!(counters.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
        assert!(!slot.is_held());
    }

    #[tokio::test]
    async fn released_instance_is_reacquired_lazily() {
        let (mut slot, counters) = slot();

        let mut lease = slot.lease().unwrap();
        assert!(lease.present_challenge("c").await.is_err());
        drop(lease);

        let lease = slot.lease().unwrap();
        lease.keep();

        assert_eq!(counters.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_the_slot_releases_the_held_instance_once() {
        let (mut slot, counters) = slot();
        slot.lease().unwrap().keep();

        assert!(slot.release());
        assert!(!slot.release());
        drop(slot);

        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn slot_without_provider_is_unavailable() {
        let mut slot = AuthenticatorSlot::new(None);
        assert!(!slot.is_available());
        let error = slot.lease().unwrap_err();
        assert!(!slot.is_held());
        assert_eq!(
            error.current_context(),
            &ThreeDs2Error::AuthenticatorUnavailable
        );
    }
}
