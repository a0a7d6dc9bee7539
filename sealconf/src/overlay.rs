//! The decrypted configuration overlay.
//!
//! Owns the snapshot of decrypted values and keeps it in step with the
//! upstream source: every change notification triggers a full decode pass
//! on the notifier's thread, the rebuilt snapshot replaces the old one
//! wholesale, downstream observers are notified, and the upstream token is
//! re-armed before the handler returns. Upstream tokens are single-fire;
//! skipping the re-arm would make every later change go undetected.

use crate::envelope::EnvelopeCodec;
use crate::error::SealResult;
use crate::resolver::{CertificateResolver, StoreCertificateResolver};
use crate::source::{ChangeCallback, ConfigSource};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// Mapping from lowercased key to decrypted value, produced by one decode
/// pass. Holds only keys whose decoded value differs from the upstream
/// original; every other key is served from upstream unchanged.
type Snapshot = HashMap<String, String>;

/// Stateful overlay over an upstream configuration source.
///
/// Readers and the reload path share the snapshot through a readers-writer
/// lock. A decode pass holds the write lock for its whole duration, so
/// concurrent readers block until the pass completes and can never observe
/// a half-built snapshot.
pub struct OverlayProvider {
    source: Arc<dyn ConfigSource>,
    codec: EnvelopeCodec,
    snapshot: RwLock<Snapshot>,
    subscribed: AtomicBool,
    observers: Mutex<Vec<ChangeCallback>>,
    // Handed to the upstream watcher so reloads reach this provider
    // without keeping it alive forever.
    me: Weak<Self>,
}

impl OverlayProvider {
    pub fn new(
        source: Arc<dyn ConfigSource>,
        resolver: Arc<dyn CertificateResolver>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            source,
            codec: EnvelopeCodec::new(resolver),
            snapshot: RwLock::new(Snapshot::new()),
            subscribed: AtomicBool::new(false),
            observers: Mutex::new(Vec::new()),
            me: me.clone(),
        })
    }

    /// Overlay backed by the store-searching resolver, for deployments with
    /// provisioned machine or user certificate stores.
    pub fn with_default_resolver(source: Arc<dyn ConfigSource>) -> Arc<Self> {
        Self::new(source, Arc::new(StoreCertificateResolver::new()))
    }

    /// Runs the initial decode pass and subscribes to upstream changes.
    ///
    /// Call once after construction. Decode errors propagate to the caller;
    /// the upstream subscription is only established once, even if `load`
    /// is retried after a failure.
    pub fn load(&self) -> SealResult<()> {
        {
            let mut snapshot = self.snapshot.write();
            *snapshot = self.build_snapshot()?;
        }
        if !self.subscribed.swap(true, Ordering::SeqCst) {
            self.arm_upstream();
        }
        Ok(())
    }

    /// Value for `key`: the decrypted overlay wins, everything else falls
    /// through to the upstream source unchanged.
    pub fn try_get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.snapshot.read().get(&key.to_lowercase()) {
            return Some(value.clone());
        }
        self.source.get(key)
    }

    /// Writes through to both the overlay and the upstream source eagerly.
    /// Writes are never decoded; only upstream-origin values are.
    pub fn set(&self, key: &str, value: &str) {
        self.snapshot
            .write()
            .insert(key.to_lowercase(), value.to_string());
        self.source.set(key, value);
    }

    /// Registers a single-fire observer delivered after the next completed
    /// reload, mirroring the upstream token model.
    pub fn on_change(&self, callback: ChangeCallback) {
        self.observers.lock().push(callback);
    }

    /// One full decode pass over the upstream entries.
    fn build_snapshot(&self) -> SealResult<Snapshot> {
        let mut snapshot = Snapshot::new();
        for (key, value) in self.source.entries() {
            // Section keys carry no value to decode.
            let Some(value) = value else { continue };
            let decoded = self.codec.decode_or_passthrough(&value)?;
            if decoded != value {
                snapshot.insert(key.to_lowercase(), decoded);
            }
        }
        Ok(snapshot)
    }

    fn arm_upstream(&self) {
        let weak = self.me.clone();
        self.source.on_change(Box::new(move || {
            if let Some(provider) = weak.upgrade() {
                provider.reload();
            }
        }));
    }

    /// Decode pass triggered by an upstream change.
    ///
    /// On failure the previous snapshot is kept and the error logged rather
    /// than surfaced through the notifier thread. Observers are notified
    /// and the upstream token re-armed in either case.
    fn reload(&self) {
        {
            let mut snapshot = self.snapshot.write();
            match self.build_snapshot() {
                Ok(rebuilt) => *snapshot = rebuilt,
                Err(e) => error!("decode pass failed, keeping previous snapshot: {e}"),
            }
        }
        self.notify_observers();
        self.arm_upstream();
    }

    fn notify_observers(&self) {
        let pending: Vec<ChangeCallback> = std::mem::take(&mut *self.observers.lock());
        debug!("reload complete, notifying {} observer(s)", pending.len());
        for callback in pending {
            callback();
        }
    }
}
