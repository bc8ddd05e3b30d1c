use super::reader::PositionReader;
use log::info;
use std::collections::HashMap;

/// In-memory session to position table rebuilt from the index at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionTable {
    positions: HashMap<i32, i64>,
}

impl PositionTable {
    /// Replays every record of `reader` in one pass.
    pub fn recover(reader: &PositionReader<'_>) -> Self {
        let mut positions = HashMap::new();
        reader.for_each(|session_id, position| {
            positions.insert(session_id, position);
        });
        info!("event=position_index_recovered sessions={}", positions.len());
        Self { positions }
    }

    pub fn get(&self, session_id: i32) -> Option<i64> {
        self.positions.get(&session_id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, i64)> + '_ {
        self.positions
            .iter()
            .map(|(session_id, position)| (*session_id, *position))
    }
}
