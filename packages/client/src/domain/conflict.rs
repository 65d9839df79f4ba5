//! Conflict detector.
//!
//! A proximity heuristic over the pending-change buffer: two edits of the
//! same field by different users less than `window_ms` apart are reported as
//! a conflict. The buffer is pruned on every pass.

use std::collections::{BTreeMap, HashSet};

use super::field_edit::FieldEdit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictDetector {
    window_ms: i64,
    retention_ms: i64,
}

impl ConflictDetector {
    pub fn new(window_ms: i64, retention_ms: i64) -> Self {
        Self {
            window_ms,
            retention_ms,
        }
    }

    /// 1 回の検出パス: 衝突を検出してから、古いエントリを取り除く
    ///
    /// 返り値が空でなければ、呼び出し側は 1 回だけ通知する。
    pub fn run(&self, pending: &mut Vec<FieldEdit>, now: i64) -> Vec<FieldEdit> {
        let conflicts = self.detect(pending);
        self.prune(pending, now);
        conflicts
    }

    /// 衝突しているエントリを Change ID で重複排除し、タイムスタンプ順で返す
    pub fn detect(&self, pending: &[FieldEdit]) -> Vec<FieldEdit> {
        let mut groups: BTreeMap<&str, Vec<&FieldEdit>> = BTreeMap::new();
        for edit in pending {
            groups.entry(edit.field_path.as_str()).or_default().push(edit);
        }

        let mut seen = HashSet::new();
        let mut conflicts = Vec::new();
        for group in groups.values_mut().filter(|g| g.len() > 1) {
            group.sort_by_key(|e| e.timestamp);
            for pair in group.windows(2) {
                let (earlier, later) = (pair[0], pair[1]);
                if later.timestamp.saturating_sub(earlier.timestamp) < self.window_ms
                    && earlier.user_id != later.user_id
                {
                    for edit in [earlier, later] {
                        if seen.insert(edit.change_id.clone()) {
                            conflicts.push(edit.clone());
                        }
                    }
                }
            }
        }
        conflicts.sort_by_key(|e| e.timestamp);
        conflicts
    }

    /// `now` から retention を超えて離れたエントリを取り除く
    ///
    /// 未来のタイムスタンプも同じ幅で扱う。そうしないと時計のずれた送信者の
    /// エントリがバッファに残り続ける。
    pub fn prune(&self, pending: &mut Vec<FieldEdit>, now: i64) {
        pending.retain(|e| {
            now.saturating_sub(e.timestamp) <= self.retention_ms
                && e.timestamp.saturating_sub(now) <= self.retention_ms
        });
    }
}
