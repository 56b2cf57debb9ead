//! Loop detection for the business relay path.
//!
//! The relay can hand the bot its own just-sent reply back as a new inbound
//! event; reprocessing it would start an unbounded reply cycle. `LoopDetector`
//! classifies inbound text with three checks in fixed order: signature match
//! (cheapest, content-based), rapid-fire timing, and fingerprint duplicate
//! detection. The first match wins.
//!
//! All state is in-process and intentionally lost on restart: echoes cannot
//! originate from a prior process incarnation, and the signature check still
//! covers the cold-start gap.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};

use relayguard_types::config::{DetectorConfig, SignaturePatterns};
use relayguard_types::routing::{IgnoreReason, LoopVerdict};

use crate::signature::SignatureMatcher;

/// One observed message in a chat's bounded history.
#[derive(Debug, Clone)]
struct FingerprintEntry {
    seen_at: DateTime<Utc>,
    fingerprint: String,
}

/// Bounded per-chat fingerprint sequences mirrored into one live set.
///
/// Invariant: a fingerprint is in `live` if and only if it is in some chat's
/// deque. Every mutation (insert, capacity eviction, expiry sweep) updates
/// both sides in the same critical section, so the mirror cannot drift.
#[derive(Debug, Default)]
struct FingerprintStore {
    per_chat: HashMap<i64, VecDeque<FingerprintEntry>>,
    live: HashSet<String>,
}

impl FingerprintStore {
    /// Append a fingerprint to a chat's history, evicting the oldest entry
    /// when the chat is at capacity.
    fn insert(&mut self, chat_id: i64, fingerprint: String, seen_at: DateTime<Utc>, capacity: usize) {
        let history = self.per_chat.entry(chat_id).or_default();
        if history.len() >= capacity {
            if let Some(evicted) = history.pop_front() {
                self.live.remove(&evicted.fingerprint);
            }
        }
        history.push_back(FingerprintEntry {
            seen_at,
            fingerprint: fingerprint.clone(),
        });
        self.live.insert(fingerprint);
    }

    /// Drop every entry older than `cutoff` from the front of each chat's
    /// deque, mirroring removals into the live set. Empty chats are removed.
    fn sweep(&mut self, cutoff: DateTime<Utc>) {
        let Self { per_chat, live } = self;
        per_chat.retain(|_, history| {
            while history.front().is_some_and(|entry| entry.seen_at < cutoff) {
                if let Some(expired) = history.pop_front() {
                    live.remove(&expired.fingerprint);
                }
            }
            !history.is_empty()
        });
    }

    fn tracked_messages(&self) -> usize {
        self.per_chat.values().map(VecDeque::len).sum()
    }
}

/// Snapshot of detector state for the ops surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorStats {
    pub tracked_chats: usize,
    pub tracked_messages: usize,
    pub live_fingerprints: usize,
    pub min_message_interval_secs: f64,
    pub duplicate_window_secs: i64,
}

/// Classifier of inbound relay traffic against recent history, timing, and
/// known bot phrasing.
///
/// Per-chat last-seen times live in a `DashMap` (no cross-chat dependency);
/// all fingerprint mutations funnel through a single mutex so the
/// deque/live-set mirror holds under concurrent webhook handlers. The clock
/// is injected (`now` parameters) to keep window behavior testable.
pub struct LoopDetector {
    min_interval: Duration,
    duplicate_window: Duration,
    max_tracked: usize,
    signatures: SignatureMatcher,
    last_seen: DashMap<i64, DateTime<Utc>>,
    fingerprints: Mutex<FingerprintStore>,
}

impl LoopDetector {
    pub fn new(config: &DetectorConfig, patterns: &SignaturePatterns) -> Self {
        Self {
            min_interval: Duration::microseconds((config.min_message_interval_secs * 1e6) as i64),
            duplicate_window: Duration::seconds(config.duplicate_window_secs),
            max_tracked: config.max_tracked_messages.max(1),
            signatures: SignatureMatcher::new(patterns),
            last_seen: DashMap::new(),
            fingerprints: Mutex::new(FingerprintStore::default()),
        }
    }

    /// Classify one inbound message.
    ///
    /// Checks run in fixed order -- signature, rapid-fire, duplicate --
    /// because the signature check is cheapest and most certain, while the
    /// later checks mutate state and must run at most once per message.
    /// Messages off the business relay bypass everything: only the relay can
    /// echo the bot's own traffic back.
    pub fn classify(
        &self,
        text: &str,
        chat_id: i64,
        _sender_id: i64,
        from_business_channel: bool,
        now: DateTime<Utc>,
    ) -> LoopVerdict {
        if !from_business_channel {
            return LoopVerdict::Proceed;
        }

        if self.signatures.matches(text) {
            tracing::warn!(chat_id, "loop prevented: text matches a bot signature");
            return LoopVerdict::Ignore(IgnoreReason::BotSignature);
        }

        if self.is_rapid(chat_id, now) {
            tracing::warn!(chat_id, "loop prevented: message inside the minimum interval");
            return LoopVerdict::Ignore(IgnoreReason::RapidMessage);
        }

        if self.observe(text, chat_id, now) {
            tracing::warn!(chat_id, "loop prevented: duplicate of a recent message");
            return LoopVerdict::Ignore(IgnoreReason::DuplicateMessage);
        }

        LoopVerdict::Proceed
    }

    /// Register a reply the bot just sent, so a relayed echo of it is caught
    /// by the duplicate check. Skips the signature and rapid checks.
    pub fn record_outgoing(&self, text: &str, chat_id: i64, now: DateTime<Utc>) {
        let fingerprint = fingerprint(text, chat_id);
        let mut store = self.fingerprints.lock().expect("fingerprint store lock poisoned");
        // Re-inserting a live fingerprint would leave two deque entries
        // mirrored by one set entry; keep the mirror exact instead.
        if store.live.contains(&fingerprint) {
            return;
        }
        store.insert(chat_id, fingerprint, now, self.max_tracked);
        tracing::debug!(chat_id, "outgoing reply fingerprinted");
    }

    pub fn stats(&self) -> DetectorStats {
        let store = self.fingerprints.lock().expect("fingerprint store lock poisoned");
        DetectorStats {
            tracked_chats: store.per_chat.len(),
            tracked_messages: store.tracked_messages(),
            live_fingerprints: store.live.len(),
            min_message_interval_secs: self.min_interval.num_microseconds().unwrap_or(0) as f64 / 1e6,
            duplicate_window_secs: self.duplicate_window.num_seconds(),
        }
    }

    /// Rapid-fire check. The last-seen time is advanced to `now` whether or
    /// not the check fires, so elapsed tracking self-corrects on every call.
    fn is_rapid(&self, chat_id: i64, now: DateTime<Utc>) -> bool {
        match self.last_seen.insert(chat_id, now) {
            Some(previous) => now.signed_duration_since(previous) < self.min_interval,
            None => false,
        }
    }

    /// Duplicate check plus insertion. Returns true when the fingerprint was
    /// already live; otherwise records it and runs the passive expiry sweep.
    fn observe(&self, text: &str, chat_id: i64, now: DateTime<Utc>) -> bool {
        let fingerprint = fingerprint(text, chat_id);
        let mut store = self.fingerprints.lock().expect("fingerprint store lock poisoned");
        if store.live.contains(&fingerprint) {
            return true;
        }
        store.insert(chat_id, fingerprint, now, self.max_tracked);
        store.sweep(now - self.duplicate_window);
        false
    }
}

impl std::fmt::Debug for LoopDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.fingerprints.lock().expect("fingerprint store lock poisoned");
        f.debug_struct("LoopDetector")
            .field("min_interval", &self.min_interval)
            .field("duplicate_window", &self.duplicate_window)
            .field("max_tracked", &self.max_tracked)
            .field("tracked_chats", &store.per_chat.len())
            .field("live_fingerprints", &store.live.len())
            .finish()
    }
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new(&DetectorConfig::default(), &SignaturePatterns::default())
    }
}

/// Deterministic fingerprint of a message scoped to its chat.
///
/// Normalization folds case and collapses whitespace so trivially
/// reformatted echoes still match.
fn fingerprint(text: &str, chat_id: i64) -> String {
    let normalized = text
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut hasher = Sha256::new();
    hasher.update(format!("{chat_id}:{normalized}").as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn detector() -> LoopDetector {
        LoopDetector::default()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn secs(n: i64) -> Duration {
        Duration::seconds(n)
    }

    #[test]
    fn non_business_traffic_bypasses_everything() {
        let d = detector();
        // Even a bot-signature text passes when not on the relay path.
        let verdict = d.classify("Textile Pro", 1, 10, false, t0());
        assert_eq!(verdict, LoopVerdict::Proceed);
    }

    #[test]
    fn signature_match_wins_regardless_of_history() {
        let d = detector();
        let verdict = d.classify("Textile Pro — передала информацию менеджеру", 1, 10, true, t0());
        assert_eq!(verdict, LoopVerdict::Ignore(IgnoreReason::BotSignature));
        // Still matches on an immediate resend: signature outranks rapid.
        let verdict = d.classify("Textile Pro — передала информацию менеджеру", 1, 10, true, t0());
        assert_eq!(verdict, LoopVerdict::Ignore(IgnoreReason::BotSignature));
    }

    #[test]
    fn first_message_in_a_chat_is_never_rapid() {
        let d = detector();
        assert_eq!(d.classify("hello", 1, 10, true, t0()), LoopVerdict::Proceed);
    }

    #[test]
    fn second_message_inside_interval_is_rapid() {
        let d = detector();
        d.classify("first", 1, 10, true, t0());
        let verdict = d.classify("second", 1, 10, true, t0() + Duration::milliseconds(500));
        assert_eq!(verdict, LoopVerdict::Ignore(IgnoreReason::RapidMessage));
    }

    #[test]
    fn rapid_check_still_advances_last_seen() {
        let d = detector();
        d.classify("first", 1, 10, true, t0());
        // Fires at +0.5s; last-seen must move to +0.5s regardless.
        d.classify("second", 1, 10, true, t0() + Duration::milliseconds(500));
        // +2.2s is only 1.7s after the rapid message, so it is rapid too.
        let verdict = d.classify("third", 1, 10, true, t0() + Duration::milliseconds(2200));
        assert_eq!(verdict, LoopVerdict::Ignore(IgnoreReason::RapidMessage));
    }

    #[test]
    fn chats_do_not_share_rapid_state() {
        let d = detector();
        d.classify("hello", 1, 10, true, t0());
        let verdict = d.classify("hello there", 2, 10, true, t0() + Duration::milliseconds(100));
        assert_eq!(verdict, LoopVerdict::Proceed);
    }

    #[test]
    fn duplicate_text_in_same_chat_is_ignored() {
        let d = detector();
        assert_eq!(d.classify("order 500m cotton", 1, 10, true, t0()), LoopVerdict::Proceed);
        let verdict = d.classify("order 500m cotton", 1, 10, true, t0() + secs(10));
        assert_eq!(verdict, LoopVerdict::Ignore(IgnoreReason::DuplicateMessage));
    }

    #[test]
    fn duplicate_detection_is_scoped_per_chat() {
        let d = detector();
        assert_eq!(d.classify("order 500m cotton", 1, 10, true, t0()), LoopVerdict::Proceed);
        // Same text, different chat: independent.
        let verdict = d.classify("order 500m cotton", 2, 10, true, t0() + secs(10));
        assert_eq!(verdict, LoopVerdict::Proceed);
    }

    #[test]
    fn normalization_catches_reformatted_echoes() {
        let d = detector();
        assert_eq!(d.classify("Order 500m  Cotton", 1, 10, true, t0()), LoopVerdict::Proceed);
        let verdict = d.classify("  order   500M COTTON ", 1, 10, true, t0() + secs(10));
        assert_eq!(verdict, LoopVerdict::Ignore(IgnoreReason::DuplicateMessage));
    }

    #[test]
    fn recorded_outgoing_reply_is_caught_as_duplicate() {
        let d = detector();
        d.record_outgoing("Ваш заказ принят", 1, t0());
        let verdict = d.classify("Ваш заказ принят", 1, 10, true, t0() + secs(5));
        assert_eq!(verdict, LoopVerdict::Ignore(IgnoreReason::DuplicateMessage));
    }

    #[test]
    fn fingerprints_expire_after_the_window() {
        let d = detector();
        assert_eq!(d.classify("order 500m cotton", 1, 10, true, t0()), LoopVerdict::Proceed);
        // Past the 300s window; the sweep runs on the insert path of the new
        // message, and the old fingerprint no longer counts.
        let verdict = d.classify("order 500m cotton", 1, 10, true, t0() + secs(301));
        assert_eq!(verdict, LoopVerdict::Proceed);
    }

    #[test]
    fn expiry_sweep_covers_other_chats() {
        let d = detector();
        d.classify("stale", 1, 10, true, t0());
        // A message in another chat past the window sweeps chat 1 too.
        d.classify("fresh", 2, 10, true, t0() + secs(400));
        let stats = d.stats();
        assert_eq!(stats.tracked_chats, 1);
        assert_eq!(stats.live_fingerprints, 1);
    }

    #[test]
    fn capacity_eviction_drops_oldest_fingerprint() {
        let d = LoopDetector::new(
            &DetectorConfig {
                min_message_interval_secs: 0.0,
                duplicate_window_secs: 10_000,
                max_tracked_messages: 2,
            },
            &SignaturePatterns::default(),
        );
        d.classify("one", 1, 10, true, t0());
        d.classify("two", 1, 10, true, t0() + secs(10));
        d.classify("three", 1, 10, true, t0() + secs(20));
        // "one" was evicted by capacity, so it is no longer a duplicate.
        assert_eq!(d.classify("one", 1, 10, true, t0() + secs(30)), LoopVerdict::Proceed);
        let stats = d.stats();
        assert_eq!(stats.tracked_messages, stats.live_fingerprints);
    }

    #[test]
    fn record_outgoing_is_idempotent_for_live_fingerprints() {
        let d = detector();
        d.record_outgoing("same reply", 1, t0());
        d.record_outgoing("same reply", 1, t0() + secs(1));
        let stats = d.stats();
        assert_eq!(stats.tracked_messages, 1);
        assert_eq!(stats.live_fingerprints, 1);
    }

    #[test]
    fn stats_echo_configured_thresholds() {
        let stats = detector().stats();
        assert_eq!(stats.min_message_interval_secs, 2.0);
        assert_eq!(stats.duplicate_window_secs, 300);
        assert_eq!(stats.tracked_chats, 0);
    }

    #[test]
    fn fingerprint_is_deterministic_and_chat_scoped() {
        assert_eq!(fingerprint("Hello  World", 1), fingerprint("hello world", 1));
        assert_ne!(fingerprint("hello world", 1), fingerprint("hello world", 2));
    }
}
