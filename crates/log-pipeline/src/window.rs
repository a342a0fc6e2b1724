//! 슬라이딩 윈도우 상태 -- 키별 시간 윈도우 카운터
//!
//! [`SlidingWindow`]는 그룹화 키(예: IP)별로 최근 발생 시각을 보관하고,
//! 새 관측이 들어올 때마다 윈도우 밖으로 밀려난 시각을 앞쪽에서 제거합니다.
//! 모든 탐지 규칙이 이 엔진 하나를 공유합니다.
//!
//! # 불변식
//! 키별 시각은 항상 정렬된 상태로 보관됩니다. 시각이 단조 증가하는 입력에 대해,
//! `observe(key, T)` 직후 해당 키의 모든 시각 `t`는 `T - window <= t <= T`를
//! 만족합니다. 순서가 뒤바뀐 입력은 그 시각 기준으로만 제거하므로 덜 제거될
//! 수 있습니다.
//!
//! # 메모리 상한
//! 새 키가 `max_keys`에 닿으면 먼저 만료된 키를 정리하고, 그래도 여유가
//! 없으면 가장 오래 관측되지 않은 키들을 `max_keys`의 1/10만큼 한 번에
//! 제거합니다. 전체 순회는 그만큼의 새 키마다 한 번만 일어납니다.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// 기본 최대 추적 키 수
pub const DEFAULT_MAX_KEYS: usize = 100_000;

/// 한도 도달 시 한 번에 비울 키 비율의 역수 (1/10)
const EVICTION_DIVISOR: usize = 10;

/// 한 번의 관측 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// 윈도우 내 발생 횟수
    pub count: usize,
    /// 윈도우 내 가장 앞선 시각
    pub first: DateTime<Utc>,
    /// 윈도우 내 가장 뒤의 시각
    pub last: DateTime<Utc>,
}

/// 키별 슬라이딩 윈도우
///
/// 단일 소유자(탐지기)만 변경하므로 내부에 락이 없습니다.
#[derive(Debug)]
pub struct SlidingWindow<K> {
    window: TimeDelta,
    max_keys: usize,
    entries: HashMap<K, VecDeque<DateTime<Utc>>>,
    /// 지금까지 관측된 가장 늦은 시각 (만료 키 정리 기준)
    latest_seen: Option<DateTime<Utc>>,
}

impl<K> SlidingWindow<K>
where
    K: Eq + Hash + Clone,
{
    /// 주어진 윈도우 길이로 새 상태를 생성합니다.
    pub fn new(window: Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            max_keys: DEFAULT_MAX_KEYS,
            entries: HashMap::new(),
            latest_seen: None,
        }
    }

    /// 최대 추적 키 수를 설정합니다.
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.max_keys = max_keys.max(1);
        self
    }

    /// 윈도우 길이
    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// 관측을 기록하고 윈도우 내 집계를 반환합니다.
    ///
    /// `timestamp - window`보다 엄격히 이전인 시각만 제거되므로,
    /// 정확히 경계에 걸친 시각은 윈도우 안에 남습니다.
    pub fn observe(&mut self, key: K, timestamp: DateTime<Utc>) -> Observation {
        self.latest_seen = Some(match self.latest_seen {
            Some(latest) if latest > timestamp => latest,
            _ => timestamp,
        });

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_keys {
            self.enforce_key_limit();
        }

        let times = self.entries.entry(key).or_default();
        if times.back().is_none_or(|&back| back <= timestamp) {
            times.push_back(timestamp);
        } else {
            let idx = times.partition_point(|&t| t <= timestamp);
            times.insert(idx, timestamp);
        }

        if let Some(cutoff) = timestamp.checked_sub_signed(self.window) {
            while times.front().is_some_and(|&front| front < cutoff) {
                times.pop_front();
            }
        }

        Observation {
            count: times.len(),
            first: times.front().copied().unwrap_or(timestamp),
            last: times.back().copied().unwrap_or(timestamp),
        }
    }

    /// 키의 상태를 제거합니다. 다음 관측은 1부터 다시 셉니다.
    pub fn reset(&mut self, key: &K) {
        self.entries.remove(key);
    }

    /// 키의 현재 보관 중인 발생 횟수
    pub fn occurrences(&self, key: &K) -> usize {
        self.entries.get(key).map_or(0, VecDeque::len)
    }

    /// 상태를 보유한 키 수
    pub fn tracked_keys(&self) -> usize {
        self.entries.len()
    }

    /// 모든 상태를 제거합니다.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.latest_seen = None;
    }

    fn enforce_key_limit(&mut self) {
        let batch = (self.max_keys / EVICTION_DIVISOR).max(1);
        let target = self.max_keys - batch;

        // 1단계: 가장 최근 관측조차 윈도우 밖인 키 정리
        if let Some(cutoff) = self
            .latest_seen
            .and_then(|latest| latest.checked_sub_signed(self.window))
        {
            self.entries
                .retain(|_, times| times.back().is_some_and(|&last| last >= cutoff));
        }

        if self.entries.len() <= target {
            return;
        }

        // 2단계: 가장 오래 관측되지 않은 키부터 target까지 제거
        let excess = self.entries.len() - target;
        let mut by_recency: Vec<(Option<DateTime<Utc>>, K)> = self
            .entries
            .iter()
            .map(|(key, times)| (times.back().copied(), key.clone()))
            .collect();
        by_recency.select_nth_unstable_by_key(excess - 1, |(last, _)| *last);

        for (_, key) in by_recency.into_iter().take(excess) {
            self.entries.remove(&key);
        }

        tracing::warn!(
            evicted = excess,
            tracked = self.entries.len(),
            max = self.max_keys,
            "sliding window key limit reached, evicted least recently seen keys"
        );
    }
}
