//! 탐지 규칙 -- 슬라이딩 윈도우 기반 임계값 규칙
//!
//! 규칙은 컴파일 타임에 고정된 [`RulePolicy`] 세 가지입니다.
//! 각 규칙은 설정으로 비활성화하거나 윈도우/임계값을 조정할 수 있습니다.
//!
//! | 규칙 | rule_id | 심각도 | 윈도우 | 임계값 |
//! |---|---|---|---|---|
//! | 로그인 브루트포스 | `BRUTE_FORCE_LOGIN` | high | 20s | 5 |
//! | SSH 브루트포스 | `SSH_BRUTE_FORCE` | high | 30s | 6 |
//! | 웹 경로 열거 | `WEB_ENUMERATION` | medium | 30s | 4 |

pub mod detector;
pub mod types;

pub use detector::{ThresholdDetector, build_detectors};
pub use types::RulePolicy;
