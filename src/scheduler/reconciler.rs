//! The reconciliation loop draining pending verifications.
//!
//! One serialized pass runs per tick; a pass that overruns the period delays
//! the next tick rather than overlapping it. Each entry is removed from the
//! pending set before any provider call is made, so a crash mid-entry loses
//! that entry instead of replaying its side effects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::discord::rest::DiscordApi;
use crate::model::AuditVerdict;
use crate::service::verify::{EnforceOutcome, VerificationService};
use crate::store::Store;

const RECONCILE_PERIOD: Duration = Duration::from_secs(5);

const VERIFIED_MESSAGE: &str =
    "You have been verified and granted access. Welcome!";
const DENIED_MESSAGE: &str =
    "You could not be verified because you are a member of a blocked server.";

pub struct Reconciler {
    api: Arc<DiscordApi>,
    store: Store,
    period: Duration,
    started: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl Reconciler {
    pub fn new(api: Arc<DiscordApi>, store: Store) -> Arc<Self> {
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            api,
            store,
            period: RECONCILE_PERIOD,
            started: AtomicBool::new(false),
            shutdown,
        })
    }

    /// Spawns the reconciliation task. Idempotent: the gateway can deliver
    /// the ready event more than once across reconnects, and only the first
    /// call spawns anything.
    ///
    /// # Returns
    /// - `true`: The task was spawned by this call
    /// - `false`: A previous call already spawned it
    pub fn start(self: &Arc<Self>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            return false;
        }

        let reconciler = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(reconciler.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!("Reconciliation loop started");

            loop {
                tokio::select! {
                    _ = interval.tick() => reconciler.run_tick().await,
                    _ = shutdown.changed() => {
                        tracing::info!("Reconciliation loop stopped");
                        return;
                    }
                }
            }
        });

        true
    }

    /// Signals the reconciliation task to exit after its current pass.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Runs one reconciliation pass over a snapshot of the pending set.
    pub async fn run_tick(&self) {
        let snapshot = self.store.pending().snapshot().await;
        if snapshot.is_empty() {
            return;
        }
        tracing::debug!(entries = snapshot.len(), "Reconciling pending verifications");

        for entry in snapshot {
            match self.store.pending().remove(entry.user_id).await {
                Ok(Some(entry)) => self.process(entry).await,
                // A newer callback replaced or consumed the snapshot entry.
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(user_id = entry.user_id, "Removing pending entry failed: {}", e);
                    continue;
                }
            }
        }
    }

    async fn process(&self, entry: crate::model::PendingVerification) {
        let user_id = entry.user_id;
        let guild_id = entry.guild_id;
        let service = VerificationService::new(self.api.as_ref(), &self.store);

        match service.evaluate(&entry).await {
            AuditVerdict::Clean => {
                let outcome = service.enforce_clean(user_id, guild_id).await;
                if outcome == EnforceOutcome::Applied {
                    service.notify(user_id, VERIFIED_MESSAGE).await;
                }
            }
            AuditVerdict::Denylisted(blocked_guild) => {
                tracing::info!(user_id, guild_id, blocked_guild, "Member failed the audit");
                let outcome = service.enforce_ban(user_id, guild_id).await;
                if outcome == EnforceOutcome::Applied {
                    service.notify(user_id, DENIED_MESSAGE).await;
                }
            }
            AuditVerdict::ExchangeFailed => {
                tracing::warn!(user_id, guild_id, "Dropping entry after failed token exchange");
            }
            AuditVerdict::FetchFailed => {
                tracing::warn!(user_id, guild_id, "Dropping entry after failed membership fetch");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PendingVerification;
    use crate::test_util::{spawn_fake_discord, test_api, FakeDiscordOptions, RequestLog};

    async fn reconciler_with(options: FakeDiscordOptions, log: RequestLog) -> Arc<Reconciler> {
        let base = spawn_fake_discord(options, log).await;
        Reconciler::new(Arc::new(test_api(&base)), Store::in_memory())
    }

    /// Tests the full clean path for one pending entry.
    ///
    /// Expected: exchange, audit, role grant and a DM, then an empty
    /// pending set
    #[tokio::test]
    async fn clean_entry_is_granted_and_notified() {
        let log = RequestLog::new();
        let options = FakeDiscordOptions {
            user_guilds: vec![333],
            ..Default::default()
        };
        let reconciler = reconciler_with(options, log.clone()).await;
        reconciler.store.role_bindings().set(222, 555).await.unwrap();
        reconciler
            .store
            .pending()
            .upsert(PendingVerification::new(111, 222, "abc".to_string()))
            .await
            .unwrap();

        reconciler.run_tick().await;

        assert_eq!(log.count_matching("POST /oauth2/token"), 1);
        assert_eq!(log.count_matching("GET /users/@me/guilds"), 1);
        assert!(log.contains("PUT /guilds/222/members/111/roles/555"));
        assert!(log.contains("POST /channels/999/messages"));
        assert!(reconciler.store.pending().snapshot().await.is_empty());
    }

    /// Tests that a denylisted membership leads to removal, not a grant.
    ///
    /// Expected: kick and DM recorded, no role grant
    #[tokio::test]
    async fn denylisted_entry_is_kicked() {
        let log = RequestLog::new();
        let options = FakeDiscordOptions {
            user_guilds: vec![444],
            ..Default::default()
        };
        let reconciler = reconciler_with(options, log.clone()).await;
        reconciler.store.role_bindings().set(222, 555).await.unwrap();
        reconciler.store.denylist().add(444).await.unwrap();
        reconciler
            .store
            .pending()
            .upsert(PendingVerification::new(111, 222, "abc".to_string()))
            .await
            .unwrap();

        reconciler.run_tick().await;

        assert!(log.contains("DELETE /guilds/222/members/111"));
        assert!(log.contains("POST /channels/999/messages"));
        assert_eq!(log.count_matching("PUT "), 0);
        assert!(reconciler.store.pending().snapshot().await.is_empty());
    }

    /// Tests that a rate-limited token exchange is retried after the
    /// advertised delay and the entry still completes.
    ///
    /// Expected: two token requests at least one second apart, then a grant
    #[tokio::test]
    async fn rate_limited_exchange_retries_and_completes() {
        let log = RequestLog::new();
        let options = FakeDiscordOptions {
            user_guilds: vec![333],
            rate_limit_token_once: true,
            ..Default::default()
        };
        let reconciler = reconciler_with(options, log.clone()).await;
        reconciler.store.role_bindings().set(222, 555).await.unwrap();
        reconciler
            .store
            .pending()
            .upsert(PendingVerification::new(111, 222, "abc".to_string()))
            .await
            .unwrap();

        let started = std::time::Instant::now();
        reconciler.run_tick().await;

        assert!(started.elapsed() >= Duration::from_secs(1));
        assert_eq!(log.count_matching("POST /oauth2/token"), 2);
        assert!(log.contains("PUT /guilds/222/members/111/roles/555"));
    }

    /// Tests that a failed exchange consumes the entry without any
    /// enforcement.
    ///
    /// Expected: one token request, nothing else, empty pending set
    #[tokio::test]
    async fn failed_exchange_drops_entry_without_side_effects() {
        let log = RequestLog::new();
        let options = FakeDiscordOptions {
            fail_token_exchange: true,
            ..Default::default()
        };
        let reconciler = reconciler_with(options, log.clone()).await;
        reconciler.store.role_bindings().set(222, 555).await.unwrap();
        reconciler
            .store
            .pending()
            .upsert(PendingVerification::new(111, 222, "abc".to_string()))
            .await
            .unwrap();

        reconciler.run_tick().await;

        assert_eq!(log.entries(), vec!["POST /oauth2/token"]);
        assert!(reconciler.store.pending().snapshot().await.is_empty());
    }

    /// Tests that only the first start call spawns the loop.
    ///
    /// Expected: true then false
    #[tokio::test]
    async fn start_is_idempotent() {
        let log = RequestLog::new();
        let reconciler = reconciler_with(FakeDiscordOptions::default(), log).await;

        assert!(reconciler.start());
        assert!(!reconciler.start());
        reconciler.stop();
    }
}
