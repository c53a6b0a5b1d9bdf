use crate::document::ReadingDocument;
use roomlink_types::{ChartPoint, SensorKind};
use std::collections::BTreeMap;

/// 从倒序文档窗口中取某一类型最近的 `max_points` 条，按从旧到新返回
pub fn history_from_documents<'a, I>(documents: I, kind: SensorKind, max_points: usize) -> Vec<ChartPoint>
where
    I: IntoIterator<Item = &'a ReadingDocument>,
{
    let mut points: Vec<ChartPoint> = documents
        .into_iter()
        .filter(|doc| doc.sensor_kind() == Some(kind))
        .filter_map(|doc| {
            doc.created_at.to_datetime().map(|timestamp| ChartPoint {
                timestamp,
                value: doc.value,
            })
        })
        .take(max_points)
        .collect();
    points.reverse();
    points
}

/// 所有出现过的类型各自的历史曲线
pub fn history_by_kind(
    documents: &[ReadingDocument],
    max_points: usize,
) -> BTreeMap<SensorKind, Vec<ChartPoint>> {
    SensorKind::ALL
        .iter()
        .map(|kind| (*kind, history_from_documents(documents, *kind, max_points)))
        .filter(|(_, points)| !points.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocTimestamp;

    fn doc(kind: &str, value: f64, seconds: i64) -> ReadingDocument {
        ReadingDocument::new(kind, value, DocTimestamp { seconds, nanoseconds: 0 })
    }

    #[test]
    fn test_history_takes_newest_and_reverses() {
        let docs = vec![
            doc("temp", 24.0, 6),
            doc("humid", 50.0, 5),
            doc("temp", 23.0, 4),
            doc("temp", 22.0, 3),
            doc("temp", 21.0, 2),
        ];

        let points = history_from_documents(&docs, SensorKind::Temperature, 3);
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![22.0, 23.0, 24.0]);
        assert_eq!(points[0].timestamp.timestamp(), 3);
    }

    #[test]
    fn test_history_by_kind_skips_missing_types() {
        let docs = vec![doc("sound", 40.0, 2), doc("eco2", 400.0, 1)];
        let charts = history_by_kind(&docs, 20);

        assert_eq!(charts.len(), 2);
        assert_eq!(charts[&SensorKind::Sound].len(), 1);
        assert!(!charts.contains_key(&SensorKind::Temperature));
    }
}
