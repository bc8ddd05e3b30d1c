use fixgate::{
    FixGateError, MappedRegionFile, PositionIndexConfig, PositionReader, SerializationError,
    StorageError,
};
use serde::Serialize;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Serialize)]
struct PositionReport {
    path: PathBuf,
    sectors: usize,
    sessions: Vec<SessionPosition>,
}

#[derive(Debug, Serialize)]
struct SessionPosition {
    session_id: i32,
    position: i64,
}

fn main() -> ExitCode {
    let Some(config_path) = env::args_os().nth(1) else {
        eprintln!("usage: inspect_positions <config.json>");
        return ExitCode::from(2);
    };
    match run(PathBuf::from(config_path)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("inspect_positions: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: PathBuf) -> Result<(), FixGateError> {
    let config = PositionIndexConfig::load(&config_path)?;
    // Never re-create here: the point is to look at what is on disk.
    let region = MappedRegionFile::open_existing(&config.path)?;
    let reader = PositionReader::open(region.buffer()?)?;

    let mut sessions = Vec::new();
    reader.for_each(|session_id, position| {
        sessions.push(SessionPosition {
            session_id,
            position,
        })
    });
    let report = PositionReport {
        path: config.path.clone(),
        sectors: region.len() / fixgate::SECTOR_SIZE,
        sessions,
    };

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &report).map_err(SerializationError::from)?;
    writeln!(stdout).map_err(StorageError::from)?;
    Ok(())
}
