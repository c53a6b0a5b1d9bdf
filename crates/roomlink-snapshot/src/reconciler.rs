use crate::document::ReadingDocument;
use roomlink_types::{SensorKind, SensorState};
use tracing::trace;

/// 由按创建时间倒序排列的文档窗口推导当前传感器状态
///
/// 每种类型只取第一次出现（即最新）的文档，之后更旧的同类型文档全部忽略。
/// 窗口内没有出现的类型保持为空。
pub fn reconcile<'a, I>(documents: I) -> SensorState
where
    I: IntoIterator<Item = &'a ReadingDocument>,
{
    let mut state = SensorState::new();
    let mut seen = 0;

    for doc in documents {
        let Some(kind) = doc.sensor_kind() else {
            trace!(kind = %doc.kind, "Skipping document of unknown type");
            continue;
        };

        if state.get(kind).is_none() {
            state.set(kind, doc.value);
            seen += 1;
            if seen == SensorKind::ALL.len() {
                break;
            }
        }
    }

    state
}
