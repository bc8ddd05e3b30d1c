use super::reader::PositionReader;
use super::UNKNOWN_POSITION;

/// Commit-safety queries the replication layer runs against the index before
/// advancing a commit point or truncating a participant's log.
#[derive(Debug, Clone, Copy)]
pub struct IndexProgress<'a> {
    reader: PositionReader<'a>,
}

impl<'a> IndexProgress<'a> {
    pub fn new(reader: PositionReader<'a>) -> Self {
        Self { reader }
    }

    /// True once `session_id` has been indexed at or beyond `position`.
    pub fn covers(&self, session_id: i32, position: i64) -> bool {
        let indexed = self.reader.indexed_position(session_id);
        indexed != UNKNOWN_POSITION && indexed >= position
    }

    /// Lowest indexed position across `sessions`. `None` when the set is empty or any
    /// participant has not been indexed yet.
    pub fn truncation_point(&self, sessions: impl IntoIterator<Item = i32>) -> Option<i64> {
        let mut lowest: Option<i64> = None;
        for session_id in sessions {
            let indexed = self.reader.indexed_position(session_id);
            if indexed == UNKNOWN_POSITION {
                return None;
            }
            lowest = Some(lowest.map_or(indexed, |current| current.min(indexed)));
        }
        lowest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::positions::{PositionWriter, SECTOR_SIZE};
    use crate::persistence::region::AlignedBuffer;

    #[test]
    fn covers_requires_known_and_reached_position() {
        let region = AlignedBuffer::zeroed(SECTOR_SIZE);
        let mut writer = PositionWriter::open(region.buffer().unwrap()).unwrap();
        writer.indexed_up_to(1, 100).unwrap();
        let progress = IndexProgress::new(writer.reader());
        assert!(progress.covers(1, 100));
        assert!(progress.covers(1, 0));
        assert!(!progress.covers(1, 101));
        assert!(!progress.covers(2, 0));
    }

    #[test]
    fn truncation_point_is_lowest_known_position() {
        let region = AlignedBuffer::zeroed(SECTOR_SIZE);
        let mut writer = PositionWriter::open(region.buffer().unwrap()).unwrap();
        writer.indexed_up_to(1, 100).unwrap();
        writer.indexed_up_to(2, 40).unwrap();
        let progress = IndexProgress::new(writer.reader());
        assert_eq!(progress.truncation_point([1, 2]), Some(40));
        assert_eq!(progress.truncation_point([1, 2, 3]), None);
        assert_eq!(progress.truncation_point(Vec::new()), None);
    }
}
