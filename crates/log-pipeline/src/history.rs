//! 알림 히스토리 -- 표시용 bounded 버퍼
//!
//! [`AlertHistory`]는 최근 알림을 인메모리에 보관합니다.
//! 용량을 넘으면 가장 오래된 알림부터 제거합니다.
//! 표시 전용이므로 탐지기 상태와는 무관합니다.

use std::collections::VecDeque;

use logshield_core::types::Alert;

/// 기본 히스토리 용량
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// 최근 알림 버퍼
#[derive(Debug)]
pub struct AlertHistory {
    alerts: VecDeque<Alert>,
    capacity: usize,
    /// 용량 초과로 제거된 알림 수 (통계용)
    evicted_count: u64,
}

impl AlertHistory {
    /// 새 히스토리를 생성합니다.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            alerts: VecDeque::with_capacity(capacity.min(10_000)),
            capacity,
            evicted_count: 0,
        }
    }

    /// 알림을 추가합니다. 가장 오래된 알림이 밀려나면 `true`를 반환합니다.
    pub fn push(&mut self, alert: Alert) -> bool {
        let evicted = if self.alerts.len() >= self.capacity {
            self.alerts.pop_front();
            self.evicted_count += 1;
            tracing::debug!(
                evicted = self.evicted_count,
                capacity = self.capacity,
                "alert history full, dropped oldest alert"
            );
            true
        } else {
            false
        };

        self.alerts.push_back(alert);
        evicted
    }

    /// 오래된 순서대로 복사본을 반환합니다.
    pub fn snapshot(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }

    /// 모든 알림을 제거합니다.
    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn evicted_count(&self) -> u64 {
        self.evicted_count
    }
}

impl Default for AlertHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
