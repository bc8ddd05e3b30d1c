use fixgate::{
    IndexProgress, MappedRegionFile, PositionIndexConfig, PositionReader, PositionTable,
    PositionWriter, SECTOR_SIZE, UNKNOWN_POSITION,
};
use std::fs;
use tempfile::tempdir;

#[test]
fn positions_survive_remap_after_checksum_update() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("state").join("positions.idx");
    {
        let region = MappedRegionFile::create_new(&path, 2 * SECTOR_SIZE).unwrap();
        let mut writer = PositionWriter::open(region.buffer().unwrap()).unwrap();
        writer.indexed_up_to(11, 1_000).unwrap();
        writer.indexed_up_to(12, 2_000).unwrap();
        writer.update_checksums();
        region.flush().unwrap();
    }

    let region = MappedRegionFile::open_existing(&path).unwrap();
    let reader = PositionReader::open(region.buffer().unwrap()).unwrap();
    let table = PositionTable::recover(&reader);
    assert_eq!(table.get(11), Some(1_000));
    assert_eq!(table.get(12), Some(2_000));
}

#[test]
fn remapped_file_with_stale_sector_fails_to_open() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("positions.idx");
    {
        let region = MappedRegionFile::create_new(&path, SECTOR_SIZE).unwrap();
        let mut writer = PositionWriter::open(region.buffer().unwrap()).unwrap();
        writer.indexed_up_to(11, 1_000).unwrap();
        region.flush().unwrap();
    }

    let region = MappedRegionFile::open_existing(&path).unwrap();
    let err = PositionWriter::open(region.buffer().unwrap()).unwrap_err();
    assert!(err.is_corruption());
}

#[test]
fn config_provisions_fresh_region_on_start() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("positions.json");
    fs::write(
        &config_path,
        br#"{ "path": "state/positions.idx", "sectors": 2 }"#,
    )
    .unwrap();
    let config = PositionIndexConfig::load(&config_path).unwrap();

    {
        let region = config.provision().unwrap();
        let mut writer = PositionWriter::open(region.buffer().unwrap()).unwrap();
        writer.indexed_up_to(3, 30).unwrap();
        writer.update_checksums();
        region.flush().unwrap();
    }

    // recreate_on_start defaults to true, so the next start begins empty.
    let region = config.provision().unwrap();
    assert_eq!(region.len(), 2 * SECTOR_SIZE);
    let writer = PositionWriter::open(region.buffer().unwrap()).unwrap();
    assert_eq!(writer.reader().indexed_position(3), UNKNOWN_POSITION);
}

#[test]
fn config_can_keep_existing_region() {
    let temp = tempdir().unwrap();
    let mut config = PositionIndexConfig::new(temp.path().join("positions.idx"));
    config.sectors = 1;
    {
        let region = config.provision().unwrap();
        let mut writer = PositionWriter::open(region.buffer().unwrap()).unwrap();
        writer.indexed_up_to(3, 30).unwrap();
        writer.update_checksums();
        region.flush().unwrap();
    }

    config.recreate_on_start = false;
    let region = config.provision().unwrap();
    let reader = PositionReader::open(region.buffer().unwrap()).unwrap();
    let progress = IndexProgress::new(reader);
    assert!(progress.covers(3, 30));
    assert_eq!(progress.truncation_point([3]), Some(30));
}
