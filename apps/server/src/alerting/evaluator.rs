//! [apps/server/src/alerting/evaluator.rs]
//! Per-(probe, rule, kind) threshold machine with duration hysteresis.
//! The state table is single-owner in spirit: a plain `std::sync::Mutex`
//! guards it, and no `.await` ever happens while the guard is held — every
//! transition is decided synchronously, then the resulting DB write and
//! notifier call run with the lock released.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use warden_domain_models::{AlertKind, AlertRecord, AlertRule, AlertState, AlertStatus};
use warden_infra_store::{AlertRecordRepository, AlertRuleRepository, ProbeRepository};

use crate::notifier::Notifier;

const RELOAD_TICK: Duration = Duration::from_secs(30);

type StateKey = (Uuid, Uuid, AlertKind);

enum Transition {
    None,
    Fire { fired_at_ms: i64 },
    Resolve { record_id: i64, resolved_at_ms: i64 },
}

pub struct AlertEvaluator {
    rules: Mutex<Vec<AlertRule>>,
    state: Mutex<HashMap<StateKey, AlertState>>,
    last_reload_ms: AtomicI64,
    alert_rules: AlertRuleRepository,
    alert_records: AlertRecordRepository,
    probes: ProbeRepository,
    notifier: Notifier,
}

impl AlertEvaluator {
    pub fn new(
        alert_rules: AlertRuleRepository,
        alert_records: AlertRecordRepository,
        probes: ProbeRepository,
        notifier: Notifier,
    ) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            state: Mutex::new(HashMap::new()),
            last_reload_ms: AtomicI64::new(0),
            alert_rules,
            alert_records,
            probes,
            notifier,
        }
    }

    /// Loads the enabled rule set and reconstructs `AlertState` for every
    /// still-unresolved record, so a restart does not lose in-flight
    /// breaches. Must run once before the evaluator serves traffic.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self, now_ms: i64) -> anyhow::Result<()> {
        self.reload_rules(now_ms).await?;

        let unresolved = self.alert_records.list_unresolved().await?;
        let rules = self.rules.lock().unwrap().clone();
        let mut state = self.state.lock().unwrap();

        for record in &unresolved {
            let Some(rule) = rules.iter().find(|r| r.id == record.rule_id) else {
                warn!(
                    event = "alert_bootstrap_orphan_record",
                    record_id = record.id,
                    "unresolved record references a rule no longer enabled, leaving as-is"
                );
                continue;
            };

            let key = (record.probe_id, record.rule_id, record.kind);
            state.insert(key, AlertState::from_unresolved_record(record, rule.threshold, rule.effective_duration_ms()));
        }

        info!(event = "alert_bootstrap_complete", reconstructed = state.len(), "alert state reconstructed from unresolved records");
        Ok(())
    }

    /// Refreshes the enabled-rule cache and drops in-memory state for any
    /// `(probe, rule, kind)` whose rule was removed or disabled since the
    /// last reload. Firing records left behind are not auto-resolved.
    #[instrument(skip(self))]
    pub async fn reload_rules(&self, now_ms: i64) -> anyhow::Result<()> {
        let fresh = self.alert_rules.list_enabled().await?;
        let live_rule_ids: std::collections::HashSet<Uuid> = fresh.iter().map(|r| r.id).collect();

        {
            let mut rules = self.rules.lock().unwrap();
            *rules = fresh;
        }
        {
            let mut state = self.state.lock().unwrap();
            state.retain(|(_, rule_id, _), _| live_rule_ids.contains(rule_id));
        }

        self.last_reload_ms.store(now_ms, Ordering::SeqCst);
        Ok(())
    }

    /// Runs the 30 s reload tick until `shutdown` fires.
    pub async fn run_reload_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(RELOAD_TICK);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(error) = self.reload_rules(crate::util::now_ms()).await {
                        warn!(event = "alert_rule_reload_failed", error = %error, "failed to reload alert rules");
                    }
                }
                _ = shutdown.changed() => {
                    info!(event = "alert_evaluator_shutdown", "reload loop stopping");
                    return;
                }
            }
        }
    }

    /// Feeds one `(probe, kind, value)` observation to every enabled rule
    /// that matches `kind` and applies to `probe_id`.
    #[instrument(skip(self))]
    pub async fn evaluate(&self, probe_id: Uuid, kind: AlertKind, value: f64, now_ms: i64) {
        let matching: Vec<AlertRule> = {
            let rules = self.rules.lock().unwrap();
            rules.iter().filter(|r| r.kind == kind && r.is_active_for(probe_id)).cloned().collect()
        };

        for rule in matching {
            self.evaluate_rule(&rule, probe_id, value, now_ms).await;
        }
    }

    async fn evaluate_rule(&self, rule: &AlertRule, probe_id: Uuid, value: f64, now_ms: i64) {
        let transition = {
            let mut state = self.state.lock().unwrap();
            decide_transition(&mut state, rule, probe_id, value, now_ms)
        };

        match transition {
            Transition::None => {}
            Transition::Fire { fired_at_ms } => self.handle_fire(rule, probe_id, value, fired_at_ms).await,
            Transition::Resolve { record_id, resolved_at_ms } => {
                self.handle_resolve(rule, probe_id, record_id, value, resolved_at_ms).await
            }
        }
    }

    async fn handle_fire(&self, rule: &AlertRule, probe_id: Uuid, value: f64, fired_at_ms: i64) {
        let message = describe_breach(rule, value);

        let record_id = match self
            .alert_records
            .insert_firing(probe_id, rule.id, &rule.name, rule.kind, &message, rule.threshold, value, rule.level, fired_at_ms)
            .await
        {
            Ok(id) => id,
            Err(error) => {
                warn!(event = "alert_record_insert_failed", probe_id = %probe_id, rule_id = %rule.id, error = %error, "failed to persist firing record");
                return;
            }
        };

        {
            let mut state = self.state.lock().unwrap();
            if let Some(s) = state.get_mut(&(probe_id, rule.id, rule.kind)) {
                s.last_record_id = Some(record_id);
            }
        }

        let record = AlertRecord {
            id: record_id,
            probe_id,
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            kind: rule.kind,
            message,
            threshold: rule.threshold,
            actual_value: value,
            level: rule.level,
            status: AlertStatus::Firing,
            fired_at_ms,
            resolved_at_ms: None,
        };

        self.notify(probe_id, &record, rule).await;
    }

    async fn handle_resolve(&self, rule: &AlertRule, probe_id: Uuid, record_id: i64, value: f64, resolved_at_ms: i64) {
        if let Err(error) = self.alert_records.resolve(record_id, resolved_at_ms).await {
            warn!(event = "alert_record_resolve_failed", record_id, error = %error, "failed to persist resolved record");
            return;
        }

        let record = AlertRecord {
            id: record_id,
            probe_id,
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            kind: rule.kind,
            message: describe_breach(rule, value),
            threshold: rule.threshold,
            actual_value: value,
            level: rule.level,
            status: AlertStatus::Resolved,
            fired_at_ms: resolved_at_ms,
            resolved_at_ms: Some(resolved_at_ms),
        };

        self.notify(probe_id, &record, rule).await;
    }

    async fn notify(&self, probe_id: Uuid, record: &AlertRecord, rule: &AlertRule) {
        match self.probes.get(probe_id).await {
            Ok(Some(probe)) => self.notifier.notify(&probe, record, rule.notification).await,
            Ok(None) => warn!(event = "alert_notify_probe_missing", probe_id = %probe_id, "probe row missing at notify time"),
            Err(error) => warn!(event = "alert_notify_probe_lookup_failed", probe_id = %probe_id, error = %error, "failed to load probe for notification"),
        }
    }
}

/// Synchronous transition decision per the threshold+duration hysteresis
/// table. Never suspends: callers must not hold the state lock across an
/// `.await`.
fn decide_transition(state: &mut HashMap<StateKey, AlertState>, rule: &AlertRule, probe_id: Uuid, value: f64, now_ms: i64) -> Transition {
    let key = (probe_id, rule.id, rule.kind);
    let threshold = rule.threshold;
    let duration_ms = rule.effective_duration_ms();
    let breached = value >= threshold;

    match state.get_mut(&key) {
        None => {
            if breached {
                state.insert(key, AlertState::new_breach(probe_id, rule.id, rule.kind, value, threshold, duration_ms, now_ms));
            }
            Transition::None
        }
        Some(s) => {
            s.value = value;
            if breached {
                if s.is_firing {
                    Transition::None
                } else if s.has_sustained(now_ms) {
                    s.is_firing = true;
                    Transition::Fire { fired_at_ms: now_ms }
                } else {
                    Transition::None
                }
            } else if s.is_firing {
                let record_id = s.last_record_id;
                state.remove(&key);
                match record_id {
                    Some(id) => Transition::Resolve { record_id: id, resolved_at_ms: now_ms },
                    None => Transition::None,
                }
            } else {
                state.remove(&key);
                Transition::None
            }
        }
    }
}

fn kind_label(kind: AlertKind) -> &'static str {
    match kind {
        AlertKind::Cpu => "cpu",
        AlertKind::Memory => "memory",
        AlertKind::Disk => "disk",
        AlertKind::NetworkDown => "network_down",
    }
}

fn describe_breach(rule: &AlertRule, value: f64) -> String {
    format!("{} {} >= {} (actual {})", rule.name, kind_label(rule.kind), rule.threshold, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use warden_domain_models::{AlertLevel, AlertScope, NotificationTargets};

    fn test_rule(kind: AlertKind, threshold: f64, duration_s: i64) -> AlertRule {
        AlertRule {
            id: Uuid::new_v4(),
            name: "test-rule".to_string(),
            scope: AlertScope::All,
            kind,
            threshold,
            duration_s,
            network_duration_s: None,
            level: AlertLevel::Warning,
            enabled: true,
            notification: NotificationTargets::default(),
        }
    }

    #[test]
    fn breach_below_duration_does_not_fire() {
        let rule = test_rule(AlertKind::Cpu, 80.0, 60);
        let probe_id = Uuid::new_v4();
        let mut state = HashMap::new();

        assert!(matches!(decide_transition(&mut state, &rule, probe_id, 82.0, 0), Transition::None));
        assert!(matches!(decide_transition(&mut state, &rule, probe_id, 81.0, 30_000), Transition::None));
        assert!(state.contains_key(&(probe_id, rule.id, rule.kind)));
    }

    #[test]
    fn sustained_breach_fires_exactly_once() {
        let rule = test_rule(AlertKind::Cpu, 80.0, 60);
        let probe_id = Uuid::new_v4();
        let mut state = HashMap::new();

        decide_transition(&mut state, &rule, probe_id, 82.0, 0);
        let fired = decide_transition(&mut state, &rule, probe_id, 85.0, 60_000);
        assert!(matches!(fired, Transition::Fire { fired_at_ms: 60_000 }));

        let still_firing = decide_transition(&mut state, &rule, probe_id, 90.0, 61_000);
        assert!(matches!(still_firing, Transition::None));
    }

    #[test]
    fn drop_below_duration_clears_without_firing() {
        let rule = test_rule(AlertKind::Cpu, 80.0, 60);
        let probe_id = Uuid::new_v4();
        let mut state = HashMap::new();

        decide_transition(&mut state, &rule, probe_id, 82.0, 0);
        let cleared = decide_transition(&mut state, &rule, probe_id, 75.0, 30_000);
        assert!(matches!(cleared, Transition::None));
        assert!(!state.contains_key(&(probe_id, rule.id, rule.kind)));
    }

    #[test]
    fn resolve_only_fires_after_firing() {
        let rule = test_rule(AlertKind::Cpu, 80.0, 60);
        let probe_id = Uuid::new_v4();
        let mut state = HashMap::new();

        decide_transition(&mut state, &rule, probe_id, 82.0, 0);
        decide_transition(&mut state, &rule, probe_id, 85.0, 60_000);
        {
            let s = state.get_mut(&(probe_id, rule.id, rule.kind)).unwrap();
            s.last_record_id = Some(42);
        }

        let resolved = decide_transition(&mut state, &rule, probe_id, 79.0, 120_000);
        assert!(matches!(resolved, Transition::Resolve { record_id: 42, resolved_at_ms: 120_000 }));
        assert!(!state.contains_key(&(probe_id, rule.id, rule.kind)));
    }

    #[test]
    fn value_exactly_at_threshold_counts_as_breach() {
        let rule = test_rule(AlertKind::Cpu, 80.0, 0);
        let probe_id = Uuid::new_v4();
        let mut state = HashMap::new();

        let fired = decide_transition(&mut state, &rule, probe_id, 80.0, 0);
        assert!(matches!(fired, Transition::Fire { .. }));
    }

    #[test]
    fn removed_rule_ids_are_dropped_from_a_rehydrated_state_set() {
        let rule = test_rule(AlertKind::Cpu, 80.0, 60);
        let probe_id = Uuid::new_v4();
        let mut state = HashMap::new();
        decide_transition(&mut state, &rule, probe_id, 82.0, 0);

        let live: HashSet<Uuid> = HashSet::new();
        state.retain(|(_, rule_id, _), _| live.contains(rule_id));
        assert!(state.is_empty());
    }
}
