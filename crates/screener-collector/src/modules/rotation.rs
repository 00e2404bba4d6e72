//! Rotation Selector.
//!
//! 우선순위 목록에서 이번 실행이 처리할 배치를 원형 버퍼 방식으로 잘라냅니다.
//! 한 번의 실행은 전체의 일부만 처리하지만, 커서가 매번 `batch_size`만큼
//! 전진하므로 충분히 반복하면 모든 심볼이 한 번 이상 선택됩니다.

/// 배치 선택.
///
/// - `len <= batch_size`: 전체 목록, 커서 유지
/// - 그 외: `cursor % len`부터 `batch_size`개 (끝에서 처음으로 순환),
///   새 커서는 `(start + batch_size) % len`
pub fn select<T: Clone>(list: &[T], batch_size: usize, cursor: usize) -> (Vec<T>, usize) {
    let len = list.len();
    if len <= batch_size {
        return (list.to_vec(), cursor);
    }

    let start = cursor % len;
    let batch = list
        .iter()
        .cycle()
        .skip(start)
        .take(batch_size)
        .cloned()
        .collect();

    (batch, (start + batch_size) % len)
}
